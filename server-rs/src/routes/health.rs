use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::services::directory::PlayerDirectory;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let directory_ok = state.directory.health_check().await;
    let backend = match state.directory {
        PlayerDirectory::Postgres(_) => "postgres",
        PlayerDirectory::InMemory(_) => "memory",
    };
    let squads = state
        .coordinator
        .read(|r| r.registry().squads().filter(|s| s.is_active()).count())
        .await;

    let status = if directory_ok { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "directory": { "backend": backend, "ok": directory_ok },
        "activeSquads": squads,
        "timestamp": chrono::Utc::now(),
    }))
}
