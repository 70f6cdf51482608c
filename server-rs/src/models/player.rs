use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::squad::Squad;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerProfile {
    #[serde(rename = "playerId")]
    pub id: Uuid,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    All,
    Squad,
    Player,
}

impl SearchKind {
    pub fn includes_squads(self) -> bool {
        self != SearchKind::Player
    }

    pub fn includes_players(self) -> bool {
        self != SearchKind::Squad
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: SearchKind,
    pub game: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerHit {
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "squadId")]
    pub squad_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub squads: Vec<Squad>,
    pub players: Vec<PlayerHit>,
}
