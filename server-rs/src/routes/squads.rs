use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AuthPlayer;
use crate::models::*;
use crate::services::search as search_service;
use crate::AppState;

/// Squad a member action targets: `?squadId=` if given, else the caller's own.
async fn scoped(state: &AppState, scope: &SquadScope, actor: Uuid) -> AppResult<Uuid> {
    let squad_id = state
        .coordinator
        .read(|r| r.scope(scope.squad_id, actor))
        .await?;
    Ok(squad_id)
}

/// Same as `scoped`, but a caller without a squad is refused as a non-leader.
async fn leader_scoped(state: &AppState, scope: &SquadScope, actor: Uuid) -> AppResult<Uuid> {
    let squad_id = state
        .coordinator
        .read(|r| r.leader_scope(scope.squad_id, actor))
        .await?;
    Ok(squad_id)
}

async fn resolve(
    state: &AppState,
    kind: ProposalKind,
    id: Uuid,
    actor: Uuid,
    decision: Decision,
) -> AppResult<Json<Value>> {
    let res = state
        .coordinator
        .resolve(kind, id, actor, decision)
        .await?;
    Ok(Json(json!({
        "proposal": res.proposal,
        "squad": res.squad,
        "cancelled": res.cancelled,
    })))
}

async fn cancel(
    state: &AppState,
    kind: ProposalKind,
    id: Uuid,
    actor: Uuid,
) -> AppResult<Json<Value>> {
    let proposal = state.coordinator.cancel(kind, id, actor).await?;
    Ok(Json(json!({ "proposal": proposal })))
}

// ----- squads -----

pub async fn create_squad(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Json(body): Json<CreateSquadRequest>,
) -> AppResult<Json<Value>> {
    let change = state
        .coordinator
        .create_squad(player.id, &body.squad_name, &body.game, &body.playstyle_role)
        .await?;
    Ok(Json(json!({ "squad": change.squad, "cancelled": change.cancelled })))
}

pub async fn my_squad(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
) -> AppResult<Json<Value>> {
    let (squad, counts) = state
        .coordinator
        .read(|r| {
            let squad = r.squad_of(player.id);
            let counts = squad
                .as_ref()
                .filter(|s| s.is_leader(player.id))
                .and_then(|s| r.pending_counts(s.id, player.id).ok());
            (squad, counts)
        })
        .await;
    Ok(Json(json!({ "squad": squad, "pendingCounts": counts })))
}

pub async fn get_squad(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let squad = state.coordinator.read(|r| r.squad(id)).await?;
    Ok(Json(json!({ "squad": squad })))
}

pub async fn rename_squad(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
    Json(body): Json<RenameSquadRequest>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let squad = state
        .coordinator
        .rename_squad(squad_id, player.id, &body.squad_name)
        .await?;
    Ok(Json(json!({ "squad": squad })))
}

pub async fn transfer_leadership(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
    Json(body): Json<TransferLeadershipRequest>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let squad = state
        .coordinator
        .transfer_leadership(squad_id, player.id, body.new_igl_id)
        .await?;
    Ok(Json(json!({ "squad": squad })))
}

pub async fn kick(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
    Json(body): Json<KickRequest>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let change = state
        .coordinator
        .kick(squad_id, player.id, body.player_id)
        .await?;
    Ok(Json(json!({ "squad": change.squad, "cancelled": change.cancelled })))
}

pub async fn disband(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let change = state.coordinator.disband(squad_id, player.id).await?;
    Ok(Json(json!({ "squad": change.squad, "cancelled": change.cancelled })))
}

pub async fn pending_counts(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let counts = state
        .coordinator
        .read(|r| r.pending_counts(squad_id, player.id))
        .await?;
    Ok(Json(json!({ "pendingCounts": counts })))
}

// ----- invites -----

pub async fn send_invite(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
    Json(body): Json<InviteRequest>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let invite = state
        .coordinator
        .create_invite(squad_id, player.id, body.player_id, body.role.as_deref())
        .await?;
    Ok(Json(json!({ "invite": invite })))
}

pub async fn invites_sent(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let invites = state
        .coordinator
        .read(|r| r.squad_proposals(squad_id, player.id, ProposalKind::Invite, false))
        .await?;
    Ok(Json(json!({ "invites": invites })))
}

pub async fn my_invites(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
) -> AppResult<Json<Value>> {
    let invites = state
        .coordinator
        .read(|r| r.player_proposals(player.id, ProposalKind::Invite))
        .await;
    Ok(Json(json!({ "invites": invites })))
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::Invite, id, player.id, Decision::Accept).await
}

pub async fn reject_invite(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::Invite, id, player.id, Decision::Reject).await
}

pub async fn cancel_invite(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    cancel(&state, ProposalKind::Invite, id, player.id).await
}

// ----- join requests -----

pub async fn send_join_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Json(body): Json<JoinRequestBody>,
) -> AppResult<Json<Value>> {
    let request = state
        .coordinator
        .create_join_request(body.squad_id, player.id, body.role.as_deref())
        .await?;
    Ok(Json(json!({ "joinRequest": request })))
}

pub async fn my_join_requests(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
) -> AppResult<Json<Value>> {
    let requests = state
        .coordinator
        .read(|r| r.player_proposals(player.id, ProposalKind::JoinRequest))
        .await;
    Ok(Json(json!({ "joinRequests": requests })))
}

pub async fn squad_join_requests(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let requests = state
        .coordinator
        .read(|r| r.squad_proposals(squad_id, player.id, ProposalKind::JoinRequest, true))
        .await?;
    Ok(Json(json!({ "joinRequests": requests })))
}

pub async fn accept_join_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::JoinRequest, id, player.id, Decision::Accept).await
}

pub async fn reject_join_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::JoinRequest, id, player.id, Decision::Reject).await
}

pub async fn cancel_join_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    cancel(&state, ProposalKind::JoinRequest, id, player.id).await
}

// ----- leave requests -----

pub async fn send_leave_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = scoped(&state, &scope, player.id).await?;
    let request = state
        .coordinator
        .create_leave_request(squad_id, player.id)
        .await?;
    Ok(Json(json!({ "leaveRequest": request })))
}

pub async fn squad_leave_requests(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(scope): Query<SquadScope>,
) -> AppResult<Json<Value>> {
    let squad_id = leader_scoped(&state, &scope, player.id).await?;
    let requests = state
        .coordinator
        .read(|r| r.squad_proposals(squad_id, player.id, ProposalKind::LeaveRequest, true))
        .await?;
    Ok(Json(json!({ "leaveRequests": requests })))
}

pub async fn approve_leave_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::LeaveRequest, id, player.id, Decision::Accept).await
}

pub async fn reject_leave_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    resolve(&state, ProposalKind::LeaveRequest, id, player.id, Decision::Reject).await
}

pub async fn cancel_leave_request(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    cancel(&state, ProposalKind::LeaveRequest, id, player.id).await
}

// ----- search -----

pub async fn search(
    State(state): State<AppState>,
    Extension(player): Extension<AuthPlayer>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Value>> {
    let results = search_service::search(
        &state.coordinator,
        &state.directory,
        &state.config.search,
        &q,
        player.id,
    )
    .await?;
    Ok(Json(json!(results)))
}
