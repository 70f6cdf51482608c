use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SquadStatus {
    Active,
    Disbanded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Squad {
    pub id: Uuid,
    pub name: String,
    pub game: String,
    #[serde(rename = "maxSize")]
    pub max_size: usize,
    pub status: SquadStatus,
    /// Denormalized pointer to the member whose `is_leader` is set.
    /// `None` only once the squad is disbanded.
    #[serde(rename = "leaderId")]
    pub leader_id: Option<Uuid>,
    pub members: Vec<Membership>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "disbandedAt")]
    pub disbanded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    pub role: String,
    #[serde(rename = "isLeader")]
    pub is_leader: bool,
    #[serde(rename = "joinedAt")]
    pub joined_at: DateTime<Utc>,
}

impl Squad {
    pub fn is_active(&self) -> bool {
        self.status == SquadStatus::Active
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_size
    }

    pub fn member(&self, player_id: Uuid) -> Option<&Membership> {
        self.members.iter().find(|m| m.player_id == player_id)
    }

    pub fn is_member(&self, player_id: Uuid) -> bool {
        self.member(player_id).is_some()
    }

    pub fn is_leader(&self, player_id: Uuid) -> bool {
        self.leader_id == Some(player_id)
    }

    /// True when `leader_id` and the per-member flags agree: exactly one
    /// flagged leader for an active non-empty squad, none otherwise.
    pub fn leadership_consistent(&self) -> bool {
        let flagged: Vec<Uuid> = self
            .members
            .iter()
            .filter(|m| m.is_leader)
            .map(|m| m.player_id)
            .collect();
        if self.is_active() && !self.members.is_empty() {
            flagged.len() == 1 && self.leader_id == Some(flagged[0])
        } else {
            flagged.is_empty() && self.leader_id.is_none()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSquadRequest {
    #[serde(rename = "squadName")]
    pub squad_name: String,
    pub game: String,
    #[serde(rename = "playstyleRole")]
    pub playstyle_role: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSquadRequest {
    #[serde(rename = "squadName")]
    pub squad_name: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferLeadershipRequest {
    #[serde(rename = "newIglId")]
    pub new_igl_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct KickRequest {
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
}

/// Optional `?squadId=` override for leader actions; defaults to the
/// caller's current squad.
#[derive(Debug, Default, Deserialize)]
pub struct SquadScope {
    #[serde(rename = "squadId")]
    pub squad_id: Option<Uuid>,
}
