use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalKind {
    /// Squad → player, issued by the leader.
    Invite,
    /// Player → squad.
    JoinRequest,
    /// Member → own squad.
    LeaveRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl ProposalStatus {
    pub fn is_pending(self) -> bool {
        self == ProposalStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub kind: ProposalKind,
    #[serde(rename = "squadId")]
    pub squad_id: Uuid,
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    #[serde(rename = "issuerId")]
    pub issuer_id: Uuid,
    /// Role the player takes on joining. Unset for leave requests.
    pub role: Option<String>,
    pub status: ProposalStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "resolvedAt")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Proposal {
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingCounts {
    pub invites: usize,
    #[serde(rename = "joinRequests")]
    pub join_requests: usize,
    #[serde(rename = "leaveRequests")]
    pub leave_requests: usize,
}

impl PendingCounts {
    pub fn slot(&mut self, kind: ProposalKind) -> &mut usize {
        match kind {
            ProposalKind::Invite => &mut self.invites,
            ProposalKind::JoinRequest => &mut self.join_requests,
            ProposalKind::LeaveRequest => &mut self.leave_requests,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.invites == 0 && self.join_requests == 0 && self.leave_requests == 0
    }
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequestBody {
    #[serde(rename = "squadId")]
    pub squad_id: Uuid,
    pub role: Option<String>,
}
