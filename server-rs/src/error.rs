use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Coarse error category a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// State moved under the caller; retrying with fresh state may succeed.
    PreconditionFailed,
    /// The actor may never perform this action. Not retryable.
    AuthorizationFailed,
    NotFound,
    InvalidInput,
}

/// Every way a membership operation can be refused. A refused operation
/// commits nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("Player already belongs to an active squad")]
    AlreadyInSquad,
    #[error("Squad is full")]
    SquadFull,
    #[error("Player is not a member of this squad")]
    NotAMember,
    #[error("A pending request already exists")]
    DuplicatePending,
    #[error("Request is no longer pending")]
    NotPending,
    #[error("Squad is not active")]
    SquadNotActive,
    #[error("Leader must transfer leadership first")]
    LeaderMustTransferFirst,
    #[error("Player is already a member of this squad")]
    TargetAlreadyMember,
    #[error("Target player is not a member of this squad")]
    TargetNotMember,

    #[error("Only the squad leader can do this")]
    NotLeader,
    #[error("Only the original issuer can cancel this request")]
    NotIssuer,
    #[error("Not authorized to resolve this request")]
    NotAuthorized,
    #[error("Leader cannot kick themselves")]
    CannotKickSelf,

    #[error("Squad not found")]
    SquadNotFound,
    #[error("Request not found")]
    ProposalNotFound,
    #[error("Player not found")]
    PlayerNotFound,

    #[error("Invalid squad name")]
    InvalidName,
    #[error("Invalid game")]
    InvalidGame,
    #[error("Unknown role: {0}")]
    InvalidRole(String),
    #[error("Search query is too short")]
    InvalidQuery,
}

impl MembershipError {
    pub fn kind(&self) -> ErrorKind {
        use MembershipError::*;
        match self {
            AlreadyInSquad | SquadFull | NotAMember | DuplicatePending | NotPending
            | SquadNotActive | LeaderMustTransferFirst | TargetAlreadyMember
            | TargetNotMember => ErrorKind::PreconditionFailed,
            NotLeader | NotIssuer | NotAuthorized | CannotKickSelf => {
                ErrorKind::AuthorizationFailed
            }
            SquadNotFound | ProposalNotFound | PlayerNotFound => ErrorKind::NotFound,
            InvalidName | InvalidGame | InvalidRole(_) | InvalidQuery => ErrorKind::InvalidInput,
        }
    }

    pub fn code(&self) -> &'static str {
        use MembershipError::*;
        match self {
            AlreadyInSquad => "ALREADY_IN_SQUAD",
            SquadFull => "SQUAD_FULL",
            NotAMember => "NOT_A_MEMBER",
            DuplicatePending => "DUPLICATE_PENDING",
            NotPending => "NOT_PENDING",
            SquadNotActive => "SQUAD_NOT_ACTIVE",
            LeaderMustTransferFirst => "LEADER_MUST_TRANSFER_FIRST",
            TargetAlreadyMember => "TARGET_ALREADY_MEMBER",
            TargetNotMember => "TARGET_NOT_MEMBER",
            NotLeader => "NOT_LEADER",
            NotIssuer => "NOT_ISSUER",
            NotAuthorized => "NOT_AUTHORIZED",
            CannotKickSelf => "CANNOT_KICK_SELF",
            SquadNotFound => "SQUAD_NOT_FOUND",
            ProposalNotFound => "PROPOSAL_NOT_FOUND",
            PlayerNotFound => "PLAYER_NOT_FOUND",
            InvalidName => "INVALID_NAME",
            InvalidGame => "INVALID_GAME",
            InvalidRole(_) => "INVALID_ROLE",
            InvalidQuery => "INVALID_QUERY",
        }
    }
}

pub type MembershipResult<T> = Result<T, MembershipError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Membership(e) => {
                let status = match e.kind() {
                    ErrorKind::PreconditionFailed => StatusCode::CONFLICT,
                    ErrorKind::AuthorizationFailed => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                };
                (
                    status,
                    json!({ "error": e.to_string(), "code": e.code(), "kind": e.kind() }),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, json!({ "error": "Invalid token" })),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
