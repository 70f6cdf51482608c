use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::player::PlayerProfile;

/// Read access to player profiles owned by the profile service.
///
/// With a database configured this reads the shared `players` table;
/// otherwise profiles are learned from authenticated principals.
#[derive(Clone)]
pub enum PlayerDirectory {
    Postgres(sqlx::PgPool),
    InMemory(Arc<RwLock<HashMap<Uuid, PlayerProfile>>>),
}

impl PlayerDirectory {
    pub fn in_memory() -> Self {
        PlayerDirectory::InMemory(Arc::new(RwLock::new(HashMap::new())))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<PlayerProfile>> {
        match self {
            PlayerDirectory::Postgres(db) => {
                let row: Option<PlayerProfile> =
                    sqlx::query_as("SELECT id, display_name FROM players WHERE id = $1")
                        .bind(id)
                        .fetch_optional(db)
                        .await?;
                Ok(row)
            }
            PlayerDirectory::InMemory(players) => Ok(players.read().await.get(&id).cloned()),
        }
    }

    /// Case-insensitive display name match, excluding `exclude`.
    pub async fn search(
        &self,
        fragment: &str,
        exclude: Uuid,
        limit: usize,
    ) -> AppResult<Vec<PlayerProfile>> {
        match self {
            PlayerDirectory::Postgres(db) => {
                let pattern = format!("%{}%", escape_like(fragment));
                let rows: Vec<PlayerProfile> = sqlx::query_as(
                    "SELECT id, display_name FROM players WHERE id != $1 AND display_name ILIKE $2 ORDER BY display_name LIMIT $3",
                )
                .bind(exclude)
                .bind(&pattern)
                .bind(limit as i64)
                .fetch_all(db)
                .await?;
                Ok(rows)
            }
            PlayerDirectory::InMemory(players) => {
                let needle = fragment.to_lowercase();
                let players = players.read().await;
                let mut hits: Vec<PlayerProfile> = players
                    .values()
                    .filter(|p| p.id != exclude && p.display_name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                hits.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                hits.truncate(limit);
                Ok(hits)
            }
        }
    }

    /// Records a principal seen at authentication. The Postgres table is owned
    /// by the profile service, so this only affects the in-memory directory.
    pub async fn remember(&self, profile: PlayerProfile) {
        if let PlayerDirectory::InMemory(players) = self {
            let mut players = players.write().await;
            let entry = players
                .entry(profile.id)
                .or_insert_with(|| profile.clone());
            if !profile.display_name.is_empty() {
                entry.display_name = profile.display_name;
            }
        }
    }

    pub async fn health_check(&self) -> bool {
        match self {
            PlayerDirectory::Postgres(db) => sqlx::query_scalar::<_, i32>("SELECT 1")
                .fetch_one(db)
                .await
                .is_ok(),
            PlayerDirectory::InMemory(_) => true,
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> PlayerProfile {
        PlayerProfile {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn in_memory_search_is_case_insensitive_and_excludes_self() {
        let directory = PlayerDirectory::in_memory();
        let me = profile("ShadowAce");
        let other = profile("shadowfax");
        directory.remember(me.clone()).await;
        directory.remember(other.clone()).await;
        directory.remember(profile("Blaze")).await;

        let hits = directory.search("SHADOW", me.id, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, other.id);
    }

    #[tokio::test]
    async fn remember_keeps_name_when_claim_has_none() {
        let directory = PlayerDirectory::in_memory();
        let p = profile("Nova");
        directory.remember(p.clone()).await;
        directory
            .remember(PlayerProfile {
                id: p.id,
                display_name: String::new(),
            })
            .await;
        let stored = directory.get(p.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Nova");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_x"), "100\\%\\_x");
    }
}
