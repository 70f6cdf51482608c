use crate::config::SquadConfig;
use crate::error::{MembershipError, MembershipResult};

/// Validation and capacity lookups backed by configuration.
#[derive(Debug, Clone)]
pub struct SquadRules {
    config: SquadConfig,
}

impl SquadRules {
    pub fn new(mut config: SquadConfig) -> Self {
        if config.roles.is_empty() {
            tracing::warn!("No squad roles configured, falling back to defaults");
            config.roles = SquadConfig::default().roles;
        }
        if config.default_max_size == 0 {
            config.default_max_size = SquadConfig::default().default_max_size;
        }
        config.max_size_by_game = config
            .max_size_by_game
            .into_iter()
            .map(|(game, size)| (game.trim().to_lowercase(), size))
            .collect();
        Self { config }
    }

    pub fn max_size_for(&self, game: &str) -> usize {
        self.config
            .max_size_by_game
            .get(&game.trim().to_lowercase())
            .copied()
            .unwrap_or(self.config.default_max_size)
    }

    /// Role a player takes when none was requested.
    pub fn default_role(&self) -> &str {
        &self.config.roles[0]
    }

    /// Matches case-insensitively and returns the configured spelling.
    pub fn role(&self, requested: Option<&str>) -> MembershipResult<String> {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(self.default_role().to_string());
        };
        self.config
            .roles
            .iter()
            .find(|r| r.eq_ignore_ascii_case(requested))
            .cloned()
            .ok_or_else(|| MembershipError::InvalidRole(requested.to_string()))
    }

    pub fn squad_name(&self, name: &str) -> MembershipResult<String> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > self.config.name_max_len {
            return Err(MembershipError::InvalidName);
        }
        Ok(name.to_string())
    }

    pub fn game(&self, game: &str) -> MembershipResult<String> {
        let game = game.trim();
        if game.is_empty() {
            return Err(MembershipError::InvalidGame);
        }
        Ok(game.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SquadRules {
        let mut config = SquadConfig::default();
        config.max_size_by_game.insert("bgmi".into(), 4);
        SquadRules::new(config)
    }

    #[test]
    fn capacity_is_per_game_with_default_fallback() {
        let rules = rules();
        assert_eq!(rules.max_size_for("BGMI"), 4);
        assert_eq!(rules.max_size_for("Valorant"), 5);
    }

    #[test]
    fn roles_resolve_to_configured_spelling() {
        let rules = rules();
        assert_eq!(rules.role(Some("sniper")).unwrap(), "SNIPER");
        assert_eq!(rules.role(None).unwrap(), "PRIMARY");
        assert_eq!(
            rules.role(Some("MEDIC")),
            Err(MembershipError::InvalidRole("MEDIC".into()))
        );
    }

    #[test]
    fn squad_names_are_trimmed_and_bounded() {
        let rules = rules();
        assert_eq!(rules.squad_name("  Team Nemesis ").unwrap(), "Team Nemesis");
        assert_eq!(rules.squad_name("   "), Err(MembershipError::InvalidName));
        assert_eq!(
            rules.squad_name(&"x".repeat(33)),
            Err(MembershipError::InvalidName)
        );
    }

    #[test]
    fn empty_role_set_falls_back_to_defaults() {
        let rules = SquadRules::new(SquadConfig {
            roles: Vec::new(),
            ..SquadConfig::default()
        });
        assert_eq!(rules.default_role(), "PRIMARY");
    }

    #[test]
    fn capacity_keys_are_matched_case_insensitively() {
        let mut config = SquadConfig::default();
        config.max_size_by_game.insert(" BGMI ".into(), 3);
        config.max_size_by_game.insert("Free Fire".into(), 2);
        let rules = SquadRules::new(config);
        assert_eq!(rules.max_size_for("bgmi"), 3);
        assert_eq!(rules.max_size_for("BGMI"), 3);
        assert_eq!(rules.max_size_for("free fire"), 2);
    }
}
