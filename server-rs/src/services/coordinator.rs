use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppResult, MembershipError, MembershipResult};
use crate::models::proposal::{Decision, Proposal, ProposalKind};
use crate::models::squad::Squad;
use crate::services::directory::PlayerDirectory;
use crate::services::membership::{Resolution, Roster, SquadChange};
use crate::services::rules::SquadRules;

/// Serializes every membership transition behind one lock.
///
/// Validation and commit for a transition happen under the same write guard,
/// so two racing accepts for the last slot can never both succeed. Directory
/// lookups run before the guard is taken.
#[derive(Clone)]
pub struct MembershipCoordinator {
    roster: Arc<RwLock<Roster>>,
    directory: PlayerDirectory,
}

impl MembershipCoordinator {
    pub fn new(rules: SquadRules, directory: PlayerDirectory) -> Self {
        Self {
            roster: Arc::new(RwLock::new(Roster::new(rules))),
            directory,
        }
    }

    /// Runs `f` against a consistent view of the roster.
    pub async fn read<R>(&self, f: impl FnOnce(&Roster) -> R) -> R {
        let roster = self.roster.read().await;
        f(&roster)
    }

    pub async fn create_squad(
        &self,
        leader_id: Uuid,
        name: &str,
        game: &str,
        role: &str,
    ) -> MembershipResult<SquadChange> {
        let mut roster = self.roster.write().await;
        let change = roster.create_squad(leader_id, name, game, role, Utc::now())?;

        tracing::info!(
            squad_id = %change.squad.id,
            leader_id = %leader_id,
            game = %change.squad.game,
            max_size = change.squad.max_size,
            superseded = change.cancelled.len(),
            "Squad created"
        );
        Ok(change)
    }

    pub async fn rename_squad(
        &self,
        squad_id: Uuid,
        leader_id: Uuid,
        name: &str,
    ) -> MembershipResult<Squad> {
        let squad = self
            .roster
            .write()
            .await
            .rename_squad(squad_id, leader_id, name)?;
        tracing::info!(squad_id = %squad_id, name = %squad.name, "Squad renamed");
        Ok(squad)
    }

    pub async fn transfer_leadership(
        &self,
        squad_id: Uuid,
        leader_id: Uuid,
        new_leader_id: Uuid,
    ) -> MembershipResult<Squad> {
        let squad = self
            .roster
            .write()
            .await
            .transfer_leadership(squad_id, leader_id, new_leader_id)?;
        tracing::info!(
            squad_id = %squad_id,
            from = %leader_id,
            to = %new_leader_id,
            "Leadership transferred"
        );
        Ok(squad)
    }

    pub async fn kick(
        &self,
        squad_id: Uuid,
        leader_id: Uuid,
        target_id: Uuid,
    ) -> MembershipResult<SquadChange> {
        let change = self
            .roster
            .write()
            .await
            .kick(squad_id, leader_id, target_id, Utc::now())?;
        tracing::info!(
            squad_id = %squad_id,
            player_id = %target_id,
            cancelled = change.cancelled.len(),
            "Member kicked"
        );
        Ok(change)
    }

    pub async fn disband(&self, squad_id: Uuid, leader_id: Uuid) -> MembershipResult<SquadChange> {
        let change = self
            .roster
            .write()
            .await
            .disband(squad_id, leader_id, Utc::now())?;
        tracing::info!(
            squad_id = %squad_id,
            cancelled = change.cancelled.len(),
            "Squad disbanded"
        );
        Ok(change)
    }

    /// Fails with `PlayerNotFound` when the directory does not know the target.
    pub async fn create_invite(
        &self,
        squad_id: Uuid,
        issuer_id: Uuid,
        player_id: Uuid,
        role: Option<&str>,
    ) -> AppResult<Proposal> {
        // Authority first, so non-leaders learn nothing about the directory.
        self.read(|r| r.registry().led_by(squad_id, issuer_id).map(|_| ()))
            .await?;
        if self.directory.get(player_id).await?.is_none() {
            return Err(MembershipError::PlayerNotFound.into());
        }

        let invite = self.roster.write().await.create_invite(
            squad_id,
            issuer_id,
            player_id,
            role,
            Utc::now(),
        )?;
        tracing::info!(
            proposal_id = %invite.id,
            squad_id = %squad_id,
            player_id = %player_id,
            "Invite sent"
        );
        Ok(invite)
    }

    pub async fn create_join_request(
        &self,
        squad_id: Uuid,
        player_id: Uuid,
        role: Option<&str>,
    ) -> MembershipResult<Proposal> {
        let request = self.roster.write().await.create_join_request(
            squad_id,
            player_id,
            role,
            Utc::now(),
        )?;
        tracing::info!(
            proposal_id = %request.id,
            squad_id = %squad_id,
            player_id = %player_id,
            "Join request filed"
        );
        Ok(request)
    }

    pub async fn create_leave_request(
        &self,
        squad_id: Uuid,
        player_id: Uuid,
    ) -> MembershipResult<Proposal> {
        let request = self
            .roster
            .write()
            .await
            .create_leave_request(squad_id, player_id, Utc::now())?;
        tracing::info!(
            proposal_id = %request.id,
            squad_id = %squad_id,
            player_id = %player_id,
            "Leave request filed"
        );
        Ok(request)
    }

    pub async fn cancel(
        &self,
        kind: ProposalKind,
        proposal_id: Uuid,
        actor_id: Uuid,
    ) -> MembershipResult<Proposal> {
        let proposal = self
            .roster
            .write()
            .await
            .cancel(kind, proposal_id, actor_id, Utc::now())?;
        tracing::info!(proposal_id = %proposal_id, kind = ?kind, "Proposal cancelled");
        Ok(proposal)
    }

    pub async fn resolve(
        &self,
        kind: ProposalKind,
        proposal_id: Uuid,
        actor_id: Uuid,
        decision: Decision,
    ) -> MembershipResult<Resolution> {
        let resolution = self
            .roster
            .write()
            .await
            .resolve(kind, proposal_id, actor_id, decision, Utc::now())?;
        tracing::info!(
            proposal_id = %proposal_id,
            kind = ?kind,
            decision = ?decision,
            squad_id = %resolution.squad.id,
            squad_status = ?resolution.squad.status,
            cancelled = resolution.cancelled.len(),
            "Proposal resolved"
        );
        Ok(resolution)
    }
}
