use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{MembershipError, MembershipResult};
use crate::models::proposal::{Decision, PendingCounts, Proposal, ProposalKind, ProposalStatus};
use crate::models::squad::Squad;
use crate::services::ledger::ProposalLedger;
use crate::services::registry::SquadRegistry;
use crate::services::rules::SquadRules;

/// Squad post-state plus any proposals closed as a side effect.
#[derive(Debug, Clone, Serialize)]
pub struct SquadChange {
    pub squad: Squad,
    pub cancelled: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub proposal: Proposal,
    pub squad: Squad,
    pub cancelled: Vec<Uuid>,
}

/// The membership state machine: squads, proposals and the cascades that
/// keep them consistent.
///
/// Every transition validates its whole precondition set against the current
/// state before mutating anything, so a returned error means nothing changed.
/// Callers provide serialization; see `MembershipCoordinator`.
#[derive(Debug)]
pub struct Roster {
    rules: SquadRules,
    registry: SquadRegistry,
    ledger: ProposalLedger,
}

impl Roster {
    pub fn new(rules: SquadRules) -> Self {
        Self {
            rules,
            registry: SquadRegistry::default(),
            ledger: ProposalLedger::default(),
        }
    }

    pub fn registry(&self) -> &SquadRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ProposalLedger {
        &self.ledger
    }

    // ----- squads -----

    pub fn create_squad(
        &mut self,
        leader_id: Uuid,
        name: &str,
        game: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> MembershipResult<SquadChange> {
        let name = self.rules.squad_name(name)?;
        let game = self.rules.game(game)?;
        let role = self.rules.role(Some(role))?;
        let max_size = self.rules.max_size_for(&game);

        let squad = self
            .registry
            .create_squad(leader_id, name, game, role, max_size, now)?;
        let cancelled = self.ledger.cancel_competing(leader_id, now);
        Ok(SquadChange { squad, cancelled })
    }

    pub fn rename_squad(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        name: &str,
    ) -> MembershipResult<Squad> {
        self.registry.led_by(squad_id, leader_id)?;
        let name = self.rules.squad_name(name)?;
        self.registry.rename(squad_id, leader_id, name)
    }

    /// Handing leadership to oneself leaves the squad untouched.
    pub fn transfer_leadership(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        new_leader_id: Uuid,
    ) -> MembershipResult<Squad> {
        if leader_id == new_leader_id {
            return self.registry.led_by(squad_id, leader_id).cloned();
        }
        self.registry
            .transfer_leadership(squad_id, leader_id, new_leader_id)
    }

    pub fn kick(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        target_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<SquadChange> {
        let squad = self.registry.kick(squad_id, leader_id, target_id, now)?;
        let cancelled = self.ledger.cancel_pending_where(
            |p| {
                p.kind == ProposalKind::LeaveRequest
                    && p.squad_id == squad_id
                    && p.player_id == target_id
            },
            now,
        );
        Ok(SquadChange { squad, cancelled })
    }

    pub fn disband(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<SquadChange> {
        let squad = self.registry.disband(squad_id, leader_id, now)?;
        let cancelled = self.ledger.cancel_for_squad(squad_id, now);
        Ok(SquadChange { squad, cancelled })
    }

    // ----- proposals -----

    /// Issues an invite. Capacity is checked here and again on acceptance.
    /// The caller is responsible for confirming `player_id` exists.
    pub fn create_invite(
        &mut self,
        squad_id: Uuid,
        issuer_id: Uuid,
        player_id: Uuid,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        let squad = self.registry.led_by(squad_id, issuer_id)?;
        let role = self.rules.role(role)?;
        if squad.is_member(player_id) {
            return Err(MembershipError::TargetAlreadyMember);
        }
        self.ledger
            .check_no_pending(ProposalKind::Invite, squad_id, player_id)?;
        if squad.is_full() {
            return Err(MembershipError::SquadFull);
        }
        self.ledger.open(
            ProposalKind::Invite,
            squad_id,
            player_id,
            issuer_id,
            Some(role),
            now,
        )
    }

    pub fn create_join_request(
        &mut self,
        squad_id: Uuid,
        player_id: Uuid,
        role: Option<&str>,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        let squad = self.registry.active(squad_id)?;
        let role = self.rules.role(role)?;
        if self.registry.active_squad_id_of(player_id).is_some() {
            return Err(MembershipError::AlreadyInSquad);
        }
        self.ledger
            .check_no_pending(ProposalKind::JoinRequest, squad_id, player_id)?;
        if squad.is_full() {
            return Err(MembershipError::SquadFull);
        }
        self.ledger.open(
            ProposalKind::JoinRequest,
            squad_id,
            player_id,
            player_id,
            Some(role),
            now,
        )
    }

    /// A leader may only file once they are the sole member; approving that
    /// request disbands the squad.
    pub fn create_leave_request(
        &mut self,
        squad_id: Uuid,
        player_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        self.registry.check_remove_member(squad_id, player_id)?;
        self.ledger.open(
            ProposalKind::LeaveRequest,
            squad_id,
            player_id,
            player_id,
            None,
            now,
        )
    }

    /// Invites belong to the squad and are withdrawn by its current leader;
    /// join and leave requests by the player who filed them.
    pub fn cancel(
        &mut self,
        kind: ProposalKind,
        proposal_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        let proposal = self.ledger.get_kind(proposal_id, kind)?;
        let squad = self.registry.active(proposal.squad_id)?;
        let authorized = match kind {
            ProposalKind::Invite => squad.is_leader(actor_id),
            ProposalKind::JoinRequest | ProposalKind::LeaveRequest => {
                proposal.issuer_id == actor_id
            }
        };
        if !authorized {
            return Err(MembershipError::NotIssuer);
        }
        self.ledger
            .close(proposal_id, ProposalStatus::Cancelled, now)
    }

    pub fn resolve(
        &mut self,
        kind: ProposalKind,
        proposal_id: Uuid,
        actor_id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> MembershipResult<Resolution> {
        let proposal = self.ledger.get_kind(proposal_id, kind)?.clone();
        let squad_id = proposal.squad_id;
        let squad = self.registry.active(squad_id)?;

        let authorized = match kind {
            ProposalKind::Invite => proposal.player_id == actor_id,
            ProposalKind::JoinRequest | ProposalKind::LeaveRequest => squad.is_leader(actor_id),
        };
        if !authorized {
            return Err(MembershipError::NotAuthorized);
        }
        if !proposal.is_pending() {
            return Err(MembershipError::NotPending);
        }

        if decision == Decision::Reject {
            let proposal = self
                .ledger
                .close(proposal_id, ProposalStatus::Rejected, now)?;
            let squad = self.registry.get(squad_id)?.clone();
            return Ok(Resolution {
                proposal,
                squad,
                cancelled: Vec::new(),
            });
        }

        let player_id = proposal.player_id;
        match kind {
            ProposalKind::Invite | ProposalKind::JoinRequest => {
                self.registry.check_add_member(squad_id, player_id)?;
                let role = match proposal.role {
                    Some(role) => role,
                    None => self.rules.default_role().to_string(),
                };

                let squad = self.registry.add_member(squad_id, player_id, role, now)?;
                let proposal = self
                    .ledger
                    .close(proposal_id, ProposalStatus::Accepted, now)?;
                let cancelled = self.ledger.cancel_competing(player_id, now);
                Ok(Resolution {
                    proposal,
                    squad,
                    cancelled,
                })
            }
            ProposalKind::LeaveRequest => {
                self.registry.check_remove_member(squad_id, player_id)?;

                let squad = self.registry.remove_member(squad_id, player_id, now)?;
                let proposal = self
                    .ledger
                    .close(proposal_id, ProposalStatus::Accepted, now)?;
                let cancelled = if squad.is_active() {
                    Vec::new()
                } else {
                    self.ledger.cancel_for_squad(squad_id, now)
                };
                Ok(Resolution {
                    proposal,
                    squad,
                    cancelled,
                })
            }
        }
    }

    // ----- reads -----

    pub fn squad(&self, squad_id: Uuid) -> MembershipResult<Squad> {
        self.registry.get(squad_id).cloned()
    }

    pub fn squad_of(&self, player_id: Uuid) -> Option<Squad> {
        self.registry.active_squad_of(player_id).cloned()
    }

    /// Squad a member action applies to: the explicit id, else the actor's
    /// current squad.
    pub fn scope(&self, explicit: Option<Uuid>, actor_id: Uuid) -> MembershipResult<Uuid> {
        explicit
            .or_else(|| self.registry.active_squad_id_of(actor_id))
            .ok_or(MembershipError::NotAMember)
    }

    /// Like `scope`, for actions only a leader may take. A squadless actor
    /// leads nothing.
    pub fn leader_scope(&self, explicit: Option<Uuid>, actor_id: Uuid) -> MembershipResult<Uuid> {
        explicit
            .or_else(|| self.registry.active_squad_id_of(actor_id))
            .ok_or(MembershipError::NotLeader)
    }

    pub fn pending_counts(&self, squad_id: Uuid, leader_id: Uuid) -> MembershipResult<PendingCounts> {
        self.registry.led_by(squad_id, leader_id)?;
        Ok(self.ledger.count_pending_by_kind(squad_id))
    }

    /// Leader view of a squad's proposals of one kind, newest first.
    pub fn squad_proposals(
        &self,
        squad_id: Uuid,
        leader_id: Uuid,
        kind: ProposalKind,
        pending_only: bool,
    ) -> MembershipResult<Vec<Proposal>> {
        self.registry.led_by(squad_id, leader_id)?;
        Ok(self.ledger.list(|p| {
            p.kind == kind && p.squad_id == squad_id && (!pending_only || p.is_pending())
        }))
    }

    /// Proposals of one kind concerning a player, newest first.
    pub fn player_proposals(&self, player_id: Uuid, kind: ProposalKind) -> Vec<Proposal> {
        self.ledger
            .list(|p| p.kind == kind && p.player_id == player_id)
    }
}

#[cfg(test)]
impl Roster {
    /// Panics with a description of the first violated invariant.
    pub fn assert_invariants(&self) {
        use std::collections::HashMap;

        let mut seen: HashMap<Uuid, Uuid> = HashMap::new();
        for squad in self.registry.squads() {
            assert!(
                squad.members.len() <= squad.max_size,
                "squad {} over capacity",
                squad.id
            );
            assert!(
                squad.leadership_consistent(),
                "squad {} leadership inconsistent",
                squad.id
            );
            if !squad.is_active() {
                assert!(squad.members.is_empty(), "disbanded squad {} has members", squad.id);
                continue;
            }
            assert!(!squad.members.is_empty(), "active squad {} is empty", squad.id);
            for m in &squad.members {
                if let Some(other) = seen.insert(m.player_id, squad.id) {
                    panic!("player {} in squads {} and {}", m.player_id, other, squad.id);
                }
                assert_eq!(self.registry.active_squad_id_of(m.player_id), Some(squad.id));
            }
        }

        for p in self.ledger.list(|p| p.is_pending()) {
            let squad = self.registry.get(p.squad_id).expect("proposal squad exists");
            assert!(squad.is_active(), "pending proposal {} on dead squad", p.id);
            if p.kind == ProposalKind::JoinRequest {
                assert!(
                    self.registry.active_squad_id_of(p.player_id).is_none(),
                    "member {} has pending join request",
                    p.player_id
                );
            }
            assert_eq!(
                self.ledger.find_pending(p.kind, p.squad_id, p.player_id).map(|x| x.id),
                Some(p.id)
            );
        }

        for squad in self.registry.squads() {
            let counts = self.ledger.count_pending_by_kind(squad.id);
            let pending = self.ledger.list(|p| p.squad_id == squad.id && p.is_pending());
            let count = |k| pending.iter().filter(|p| p.kind == k).count();
            assert_eq!(counts.invites, count(ProposalKind::Invite));
            assert_eq!(counts.join_requests, count(ProposalKind::JoinRequest));
            assert_eq!(counts.leave_requests, count(ProposalKind::LeaveRequest));
        }
    }
}
