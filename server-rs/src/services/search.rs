use uuid::Uuid;

use crate::config::SearchConfig;
use crate::error::{AppResult, MembershipError};
use crate::models::player::{PlayerHit, SearchQuery, SearchResults};
use crate::models::squad::Squad;
use crate::services::coordinator::MembershipCoordinator;
use crate::services::directory::PlayerDirectory;

/// Name-fragment lookup over active squads and the player directory.
///
/// The requester never sees themselves, their own squad or their squad mates.
/// The game filter applies to squads only.
pub async fn search(
    coordinator: &MembershipCoordinator,
    directory: &PlayerDirectory,
    config: &SearchConfig,
    query: &SearchQuery,
    requester_id: Uuid,
) -> AppResult<SearchResults> {
    let fragment = query.q.as_deref().unwrap_or("").trim();
    if fragment.chars().count() < config.min_query_len.max(1) {
        return Err(MembershipError::InvalidQuery.into());
    }
    let needle = fragment.to_lowercase();
    let game = query
        .game
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty());

    let own_squad = coordinator.read(|r| r.squad_of(requester_id)).await;
    let own_squad_id = own_squad.as_ref().map(|s| s.id);
    let mates: Vec<Uuid> = own_squad
        .iter()
        .flat_map(|s| s.members.iter().map(|m| m.player_id))
        .collect();

    let mut results = SearchResults::default();

    if query.kind.includes_squads() {
        results.squads = coordinator
            .read(|r| {
                let mut squads: Vec<Squad> = r
                    .registry()
                    .squads()
                    .filter(|s| s.is_active() && Some(s.id) != own_squad_id)
                    .filter(|s| s.name.to_lowercase().contains(&needle))
                    .filter(|s| game.map_or(true, |g| s.game.eq_ignore_ascii_case(g)))
                    .cloned()
                    .collect();
                squads.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
                squads.truncate(config.limit);
                squads
            })
            .await;
    }

    if query.kind.includes_players() {
        // Over-fetch by the mate count so filtering them out cannot starve the page.
        let profiles = directory
            .search(fragment, requester_id, config.limit + mates.len())
            .await?;
        results.players = coordinator
            .read(|r| {
                profiles
                    .into_iter()
                    .filter(|p| !mates.contains(&p.id))
                    .take(config.limit)
                    .map(|p| PlayerHit {
                        squad_id: r.registry().active_squad_id_of(p.id),
                        player_id: p.id,
                        display_name: p.display_name,
                    })
                    .collect()
            })
            .await;
    }

    tracing::debug!(
        requester_id = %requester_id,
        squads = results.squads.len(),
        players = results.players.len(),
        "Search served"
    );
    Ok(results)
}
