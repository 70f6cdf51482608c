use std::collections::HashMap;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub db: Option<DbConfig>,
    pub jwt: JwtConfig,
    pub squad: SquadConfig,
    pub search: SearchConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

/// Roster rules. Capacity and the role set are data, never constants in the
/// membership logic.
#[derive(Clone, Debug)]
pub struct SquadConfig {
    pub default_max_size: usize,
    pub max_size_by_game: HashMap<String, usize>,
    pub roles: Vec<String>,
    pub name_max_len: usize,
}

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub min_query_len: usize,
    pub limit: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let db = env::var("DATABASE_URL")
            .or_else(|_| env::var("POSTGRES_URL"))
            .ok()
            .filter(|s| !s.is_empty())
            .map(|url| DbConfig {
                url,
                pool_min: env_or_parse("DB_POOL_MIN", 1),
                pool_max: env_or_parse("DB_POOL_MAX", 10),
            });

        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: split_list(&env_or(
                "CORS_ORIGINS",
                "http://localhost:3000,http://localhost:8080",
            )),
            db,
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
            },
            squad: SquadConfig {
                default_max_size: env_or_parse("SQUAD_DEFAULT_MAX_SIZE", 5),
                max_size_by_game: parse_game_sizes(&env_or(
                    "SQUAD_MAX_SIZE_BY_GAME",
                    "Free Fire=4,BGMI=4,Valorant=5",
                )),
                roles: split_list(&env_or("SQUAD_ROLES", "PRIMARY,SECONDARY,SNIPER,NADER,IGL")),
                name_max_len: env_or_parse("SQUAD_NAME_MAX_LEN", 32),
            },
            search: SearchConfig {
                min_query_len: env_or_parse("SEARCH_MIN_QUERY_LEN", 2),
                limit: env_or_parse("SEARCH_LIMIT", 20),
            },
        }
    }
}

impl Default for SquadConfig {
    fn default() -> Self {
        Self {
            default_max_size: 5,
            max_size_by_game: HashMap::new(),
            roles: ["PRIMARY", "SECONDARY", "SNIPER", "NADER", "IGL"]
                .into_iter()
                .map(String::from)
                .collect(),
            name_max_len: 32,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            limit: 20,
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `Game A=4,Game B=5`. Malformed entries are skipped with a warning.
fn parse_game_sizes(s: &str) -> HashMap<String, usize> {
    let mut sizes = HashMap::new();
    for entry in split_list(s) {
        let parsed = entry
            .rsplit_once('=')
            .and_then(|(game, size)| Some((game.trim(), size.trim().parse::<usize>().ok()?)))
            .filter(|(game, size)| !game.is_empty() && *size > 0);
        match parsed {
            Some((game, size)) => {
                sizes.insert(game.to_lowercase(), size);
            }
            None => tracing::warn!("Ignoring malformed squad size entry: {entry}"),
        }
    }
    sizes
}
