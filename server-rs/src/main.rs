use axum::{
    http::HeaderValue,
    middleware as axum_mw,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

#[cfg(test)]
mod api_tests;

use config::Config;
use services::coordinator::MembershipCoordinator;
use services::directory::PlayerDirectory;
use services::rules::SquadRules;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: MembershipCoordinator,
    pub directory: PlayerDirectory,
}

impl AppState {
    pub fn new(config: Config, directory: PlayerDirectory) -> Self {
        let rules = SquadRules::new(config.squad.clone());
        Self {
            coordinator: MembershipCoordinator::new(rules, directory.clone()),
            directory,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

fn build_router(state: AppState) -> Router {
    use routes::squads;

    let cors = cors_layer(&state.config.cors_origins);

    let squad_routes = Router::new()
        .route("/", post(squads::create_squad))
        .route("/me", get(squads::my_squad))
        .route("/rename", patch(squads::rename_squad))
        .route("/transfer-igl", post(squads::transfer_leadership))
        .route("/kick", post(squads::kick))
        .route("/disband", post(squads::disband))
        .route("/pending-counts", get(squads::pending_counts))
        .route("/search", get(squads::search))
        // Invites
        .route("/invite", post(squads::send_invite))
        .route("/invites/sent", get(squads::invites_sent))
        .route("/invites/me", get(squads::my_invites))
        .route("/invite/:id/accept", post(squads::accept_invite))
        .route("/invite/:id/reject", post(squads::reject_invite))
        .route("/invite/:id/cancel", post(squads::cancel_invite))
        // Join requests
        .route("/join-request", post(squads::send_join_request))
        .route("/join-requests", get(squads::squad_join_requests))
        .route("/join-requests/me", get(squads::my_join_requests))
        .route("/join-request/:id/accept", post(squads::accept_join_request))
        .route("/join-request/:id/reject", post(squads::reject_join_request))
        .route("/join-request/:id/cancel", post(squads::cancel_join_request))
        // Leave requests
        .route("/leave-request", post(squads::send_leave_request))
        .route("/leave-requests", get(squads::squad_leave_requests))
        .route(
            "/leave-request/:id/approve",
            post(squads::approve_leave_request),
        )
        .route(
            "/leave-request/:id/reject",
            post(squads::reject_leave_request),
        )
        .route(
            "/leave-request/:id/cancel",
            post(squads::cancel_leave_request),
        )
        .route("/:squadId", get(squads::get_squad))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    let api = Router::new().nest("/squads", squad_routes);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let directory = match &config.db {
        Some(db_config) => PlayerDirectory::Postgres(db::create_pool(db_config).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, player directory is in-memory");
            PlayerDirectory::in_memory()
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, directory);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Squad membership API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
