use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{MembershipError, MembershipResult};
use crate::models::proposal::{PendingCounts, Proposal, ProposalKind, ProposalStatus};

type PendingKey = (ProposalKind, Uuid, Uuid);

/// Owns invites, join requests and leave requests.
///
/// `pending` indexes open proposals by (kind, squad, player) and is what makes
/// duplicate-pending detection and cascades cheap; `counts` is the per-squad
/// projection served to leaders. Both are updated only in `open` and `close`.
///
/// Closed proposals stay in `proposals` as history, so a player can still see
/// what happened to an invite and a repeated accept reports `NotPending`
/// rather than `ProposalNotFound`. Nothing is pruned while the process runs.
#[derive(Debug, Default)]
pub struct ProposalLedger {
    proposals: HashMap<Uuid, Proposal>,
    pending: HashMap<PendingKey, Uuid>,
    counts: HashMap<Uuid, PendingCounts>,
}

impl ProposalLedger {
    pub fn get(&self, id: Uuid) -> MembershipResult<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or(MembershipError::ProposalNotFound)
    }

    /// Looks up a proposal, treating one of another kind as unknown.
    pub fn get_kind(&self, id: Uuid, kind: ProposalKind) -> MembershipResult<&Proposal> {
        self.get(id)
            .ok()
            .filter(|p| p.kind == kind)
            .ok_or(MembershipError::ProposalNotFound)
    }

    pub fn find_pending(
        &self,
        kind: ProposalKind,
        squad_id: Uuid,
        player_id: Uuid,
    ) -> Option<&Proposal> {
        self.pending
            .get(&(kind, squad_id, player_id))
            .and_then(|id| self.proposals.get(id))
    }

    pub fn check_no_pending(
        &self,
        kind: ProposalKind,
        squad_id: Uuid,
        player_id: Uuid,
    ) -> MembershipResult<()> {
        if self.pending.contains_key(&(kind, squad_id, player_id)) {
            return Err(MembershipError::DuplicatePending);
        }
        Ok(())
    }

    pub fn open(
        &mut self,
        kind: ProposalKind,
        squad_id: Uuid,
        player_id: Uuid,
        issuer_id: Uuid,
        role: Option<String>,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        self.check_no_pending(kind, squad_id, player_id)?;

        let proposal = Proposal {
            id: Uuid::new_v4(),
            kind,
            squad_id,
            player_id,
            issuer_id,
            role,
            status: ProposalStatus::Pending,
            created_at: now,
            resolved_at: None,
        };

        self.pending.insert((kind, squad_id, player_id), proposal.id);
        *self.counts.entry(squad_id).or_default().slot(kind) += 1;
        self.proposals.insert(proposal.id, proposal.clone());
        Ok(proposal)
    }

    /// Moves a pending proposal to a terminal status. Terminal statuses are
    /// never overwritten.
    pub fn close(
        &mut self,
        id: Uuid,
        status: ProposalStatus,
        now: DateTime<Utc>,
    ) -> MembershipResult<Proposal> {
        debug_assert!(!status.is_pending());
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(MembershipError::ProposalNotFound)?;
        if !proposal.is_pending() {
            return Err(MembershipError::NotPending);
        }

        proposal.status = status;
        proposal.resolved_at = Some(now);
        let proposal = proposal.clone();

        self.pending
            .remove(&(proposal.kind, proposal.squad_id, proposal.player_id));
        if let Some(counts) = self.counts.get_mut(&proposal.squad_id) {
            let slot = counts.slot(proposal.kind);
            *slot = slot.saturating_sub(1);
            if counts.is_empty() {
                self.counts.remove(&proposal.squad_id);
            }
        }
        Ok(proposal)
    }

    /// Cancels every pending proposal matching `pred` and returns their ids.
    pub fn cancel_pending_where(
        &mut self,
        pred: impl Fn(&Proposal) -> bool,
        now: DateTime<Utc>,
    ) -> Vec<Uuid> {
        let ids: Vec<Uuid> = self
            .pending
            .values()
            .filter_map(|id| self.proposals.get(id))
            .filter(|p| pred(*p))
            .map(|p| p.id)
            .collect();

        for id in &ids {
            let closed = self.close(*id, ProposalStatus::Cancelled, now);
            debug_assert!(closed.is_ok());
        }
        ids
    }

    /// Supersedes a player's outstanding invites and join requests once they
    /// have joined a squad by any route.
    pub fn cancel_competing(&mut self, player_id: Uuid, now: DateTime<Utc>) -> Vec<Uuid> {
        self.cancel_pending_where(
            |p| {
                p.player_id == player_id
                    && matches!(p.kind, ProposalKind::Invite | ProposalKind::JoinRequest)
            },
            now,
        )
    }

    pub fn cancel_for_squad(&mut self, squad_id: Uuid, now: DateTime<Utc>) -> Vec<Uuid> {
        self.cancel_pending_where(|p| p.squad_id == squad_id, now)
    }

    pub fn count_pending_by_kind(&self, squad_id: Uuid) -> PendingCounts {
        self.counts.get(&squad_id).copied().unwrap_or_default()
    }

    /// Proposals matching `pred`, newest first.
    pub fn list(&self, pred: impl Fn(&Proposal) -> bool) -> Vec<Proposal> {
        let mut out: Vec<Proposal> = self
            .proposals
            .values()
            .filter(|p| pred(*p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        out
    }
}
