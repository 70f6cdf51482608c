use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{MembershipError, MembershipResult};
use crate::models::squad::{Membership, Squad, SquadStatus};

/// Owns every squad and the player → active squad pointer.
///
/// Each mutating method validates everything it needs before touching state,
/// so an `Err` always leaves the registry unchanged. The `check_*` methods
/// expose the same validation to the coordinator, which must confirm a whole
/// transition is legal before committing any part of it.
///
/// Disbanded squads are kept as history: `get` still answers for them and
/// every later action reports `SquadNotActive`. Only `active_by_player`
/// shrinks when players leave.
#[derive(Debug, Default)]
pub struct SquadRegistry {
    squads: HashMap<Uuid, Squad>,
    active_by_player: HashMap<Uuid, Uuid>,
}

impl SquadRegistry {
    pub fn get(&self, squad_id: Uuid) -> MembershipResult<&Squad> {
        self.squads
            .get(&squad_id)
            .ok_or(MembershipError::SquadNotFound)
    }

    pub fn active(&self, squad_id: Uuid) -> MembershipResult<&Squad> {
        let squad = self.get(squad_id)?;
        if !squad.is_active() {
            return Err(MembershipError::SquadNotActive);
        }
        Ok(squad)
    }

    /// Active squad that `leader_id` currently leads.
    pub fn led_by(&self, squad_id: Uuid, leader_id: Uuid) -> MembershipResult<&Squad> {
        let squad = self.active(squad_id)?;
        if !squad.is_leader(leader_id) {
            return Err(MembershipError::NotLeader);
        }
        Ok(squad)
    }

    pub fn active_squad_id_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.active_by_player.get(&player_id).copied()
    }

    pub fn active_squad_of(&self, player_id: Uuid) -> Option<&Squad> {
        self.active_squad_id_of(player_id)
            .and_then(|id| self.squads.get(&id))
    }

    pub fn squads(&self) -> impl Iterator<Item = &Squad> {
        self.squads.values()
    }

    pub fn create_squad(
        &mut self,
        leader_id: Uuid,
        name: String,
        game: String,
        role: String,
        max_size: usize,
        now: DateTime<Utc>,
    ) -> MembershipResult<Squad> {
        if self.active_by_player.contains_key(&leader_id) {
            return Err(MembershipError::AlreadyInSquad);
        }

        let squad = Squad {
            id: Uuid::new_v4(),
            name,
            game,
            max_size: max_size.max(1),
            status: SquadStatus::Active,
            leader_id: Some(leader_id),
            members: vec![Membership {
                player_id: leader_id,
                role,
                is_leader: true,
                joined_at: now,
            }],
            created_at: now,
            disbanded_at: None,
        };

        self.active_by_player.insert(leader_id, squad.id);
        self.squads.insert(squad.id, squad.clone());
        Ok(squad)
    }

    pub fn check_add_member(&self, squad_id: Uuid, player_id: Uuid) -> MembershipResult<()> {
        let squad = self.active(squad_id)?;
        if self.active_by_player.contains_key(&player_id) {
            return Err(MembershipError::AlreadyInSquad);
        }
        if squad.is_full() {
            return Err(MembershipError::SquadFull);
        }
        Ok(())
    }

    pub fn add_member(
        &mut self,
        squad_id: Uuid,
        player_id: Uuid,
        role: String,
        now: DateTime<Utc>,
    ) -> MembershipResult<Squad> {
        self.check_add_member(squad_id, player_id)?;

        let squad = self.squad_mut(squad_id)?;
        squad.members.push(Membership {
            player_id,
            role,
            is_leader: false,
            joined_at: now,
        });
        let squad = squad.clone();
        self.active_by_player.insert(player_id, squad_id);
        Ok(squad)
    }

    pub fn check_remove_member(&self, squad_id: Uuid, player_id: Uuid) -> MembershipResult<()> {
        let squad = self.active(squad_id)?;
        if !squad.is_member(player_id) {
            return Err(MembershipError::NotAMember);
        }
        if squad.is_leader(player_id) && squad.members.len() > 1 {
            return Err(MembershipError::LeaderMustTransferFirst);
        }
        Ok(())
    }

    /// Removes a member. A squad that loses its last member is disbanded.
    pub fn remove_member(
        &mut self,
        squad_id: Uuid,
        player_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<Squad> {
        self.check_remove_member(squad_id, player_id)?;

        let squad = self.squad_mut(squad_id)?;
        squad.members.retain(|m| m.player_id != player_id);
        if squad.members.is_empty() {
            mark_disbanded(squad, now);
        }
        let squad = squad.clone();
        self.active_by_player.remove(&player_id);
        Ok(squad)
    }

    pub fn transfer_leadership(
        &mut self,
        squad_id: Uuid,
        current_leader_id: Uuid,
        new_leader_id: Uuid,
    ) -> MembershipResult<Squad> {
        let squad = self.led_by(squad_id, current_leader_id)?;
        if !squad.is_member(new_leader_id) {
            return Err(MembershipError::TargetNotMember);
        }

        let squad = self.squad_mut(squad_id)?;
        for member in squad.members.iter_mut() {
            member.is_leader = member.player_id == new_leader_id;
        }
        squad.leader_id = Some(new_leader_id);
        Ok(squad.clone())
    }

    pub fn check_kick(
        &self,
        squad_id: Uuid,
        leader_id: Uuid,
        target_id: Uuid,
    ) -> MembershipResult<()> {
        let squad = self.led_by(squad_id, leader_id)?;
        if target_id == leader_id {
            return Err(MembershipError::CannotKickSelf);
        }
        if !squad.is_member(target_id) {
            return Err(MembershipError::TargetNotMember);
        }
        Ok(())
    }

    pub fn kick(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        target_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<Squad> {
        self.check_kick(squad_id, leader_id, target_id)?;
        self.remove_member(squad_id, target_id, now)
    }

    /// Empties the squad and marks it disbanded. Pending proposals are the
    /// ledger's concern.
    pub fn disband(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        now: DateTime<Utc>,
    ) -> MembershipResult<Squad> {
        self.led_by(squad_id, leader_id)?;

        let squad = self.squad_mut(squad_id)?;
        let former: Vec<Uuid> = squad.members.drain(..).map(|m| m.player_id).collect();
        mark_disbanded(squad, now);
        let squad = squad.clone();
        for player_id in former {
            self.active_by_player.remove(&player_id);
        }
        Ok(squad)
    }

    pub fn rename(
        &mut self,
        squad_id: Uuid,
        leader_id: Uuid,
        name: String,
    ) -> MembershipResult<Squad> {
        self.led_by(squad_id, leader_id)?;

        let squad = self.squad_mut(squad_id)?;
        squad.name = name;
        Ok(squad.clone())
    }

    fn squad_mut(&mut self, squad_id: Uuid) -> MembershipResult<&mut Squad> {
        self.squads
            .get_mut(&squad_id)
            .ok_or(MembershipError::SquadNotFound)
    }
}

fn mark_disbanded(squad: &mut Squad, now: DateTime<Utc>) {
    squad.status = SquadStatus::Disbanded;
    squad.leader_id = None;
    squad.disbanded_at = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squad_with(registry: &mut SquadRegistry, size: usize, members: usize) -> (Uuid, Vec<Uuid>) {
        let now = Utc::now();
        let leader = Uuid::new_v4();
        let squad = registry
            .create_squad(leader, "Nemesis".into(), "BGMI".into(), "PRIMARY".into(), size, now)
            .unwrap();
        let mut players = vec![leader];
        for _ in 1..members {
            let p = Uuid::new_v4();
            registry.add_member(squad.id, p, "SNIPER".into(), now).unwrap();
            players.push(p);
        }
        (squad.id, players)
    }

    #[test]
    fn create_makes_creator_sole_leader() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 1);
        let squad = registry.get(id).unwrap();
        assert_eq!(squad.members.len(), 1);
        assert!(squad.is_leader(players[0]));
        assert!(squad.leadership_consistent());
        assert_eq!(registry.active_squad_id_of(players[0]), Some(id));
    }

    #[test]
    fn player_cannot_create_second_squad() {
        let mut registry = SquadRegistry::default();
        let (_, players) = squad_with(&mut registry, 4, 2);
        let err = registry
            .create_squad(players[1], "Other".into(), "BGMI".into(), "PRIMARY".into(), 4, Utc::now())
            .unwrap_err();
        assert_eq!(err, MembershipError::AlreadyInSquad);
    }

    #[test]
    fn add_member_respects_capacity_and_uniqueness() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 2, 2);
        let now = Utc::now();
        assert_eq!(
            registry.add_member(id, Uuid::new_v4(), "NADER".into(), now).unwrap_err(),
            MembershipError::SquadFull
        );
        assert_eq!(
            registry.add_member(id, players[1], "NADER".into(), now).unwrap_err(),
            MembershipError::AlreadyInSquad
        );
        assert_eq!(registry.get(id).unwrap().members.len(), 2);
    }

    #[test]
    fn leader_cannot_leave_while_others_remain() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 3);
        assert_eq!(
            registry.remove_member(id, players[0], Utc::now()).unwrap_err(),
            MembershipError::LeaderMustTransferFirst
        );
        assert_eq!(registry.get(id).unwrap().members.len(), 3);
    }

    #[test]
    fn removing_last_member_disbands() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 1);
        let squad = registry.remove_member(id, players[0], Utc::now()).unwrap();
        assert_eq!(squad.status, SquadStatus::Disbanded);
        assert!(squad.leader_id.is_none());
        assert!(registry.active_squad_of(players[0]).is_none());
        assert_eq!(
            registry.add_member(id, Uuid::new_v4(), "PRIMARY".into(), Utc::now()).unwrap_err(),
            MembershipError::SquadNotActive
        );
    }

    #[test]
    fn transfer_moves_exactly_one_flag() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 3);
        let squad = registry.transfer_leadership(id, players[0], players[2]).unwrap();
        assert_eq!(squad.leader_id, Some(players[2]));
        assert_eq!(squad.members.iter().filter(|m| m.is_leader).count(), 1);
        assert!(squad.leadership_consistent());

        assert_eq!(
            registry.transfer_leadership(id, players[0], players[1]).unwrap_err(),
            MembershipError::NotLeader
        );
        assert_eq!(
            registry.transfer_leadership(id, players[2], Uuid::new_v4()).unwrap_err(),
            MembershipError::TargetNotMember
        );
    }

    #[test]
    fn kick_rules() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 3);
        let now = Utc::now();
        assert_eq!(
            registry.kick(id, players[1], players[2], now).unwrap_err(),
            MembershipError::NotLeader
        );
        assert_eq!(
            registry.kick(id, players[0], players[0], now).unwrap_err(),
            MembershipError::CannotKickSelf
        );
        assert_eq!(
            registry.kick(id, players[0], Uuid::new_v4(), now).unwrap_err(),
            MembershipError::TargetNotMember
        );
        let squad = registry.kick(id, players[0], players[1], now).unwrap();
        assert_eq!(squad.members.len(), 2);
        assert!(registry.active_squad_of(players[1]).is_none());
    }

    #[test]
    fn disband_frees_every_member() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 3);
        assert_eq!(
            registry.disband(id, players[1], Utc::now()).unwrap_err(),
            MembershipError::NotLeader
        );
        let squad = registry.disband(id, players[0], Utc::now()).unwrap();
        assert!(squad.members.is_empty());
        assert!(squad.leadership_consistent());
        for p in players {
            assert!(registry.active_squad_id_of(p).is_none());
        }
    }

    #[test]
    fn disbanded_squad_stays_readable() {
        let mut registry = SquadRegistry::default();
        let (id, players) = squad_with(&mut registry, 4, 2);
        registry.disband(id, players[0], Utc::now()).unwrap();

        let squad = registry.get(id).unwrap();
        assert_eq!(squad.status, SquadStatus::Disbanded);
        assert!(squad.disbanded_at.is_some());
        assert_eq!(
            registry.active(id).unwrap_err(),
            MembershipError::SquadNotActive
        );
        assert_eq!(registry.squads().count(), 1);
    }
}
