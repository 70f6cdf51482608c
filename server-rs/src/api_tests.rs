use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::{Config, JwtConfig, SearchConfig, SquadConfig};
use crate::middleware::auth::test_token;
use crate::services::directory::PlayerDirectory;
use crate::{build_router, AppState};

const SECRET: &str = "test-secret";

fn app() -> Router {
    let mut squad = SquadConfig::default();
    squad.max_size_by_game.insert("bgmi".into(), 4);
    let config = Config {
        port: 0,
        cors_origins: vec!["*".into()],
        db: None,
        jwt: JwtConfig {
            secret: SECRET.into(),
        },
        squad,
        search: SearchConfig::default(),
    };
    build_router(AppState::new(config, PlayerDirectory::in_memory()))
}

struct Player {
    id: Uuid,
    token: String,
}

fn player(name: &str) -> Player {
    let id = Uuid::new_v4();
    Player {
        id,
        token: test_token(id, name, "access", SECRET),
    }
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    who: Option<&Player>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(p) = who {
        req = req.header("authorization", format!("Bearer {}", p.token));
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_squad(app: &Router, leader: &Player, name: &str) -> Value {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/squads",
        Some(leader),
        Some(json!({ "squadName": name, "game": "BGMI", "playstyleRole": "IGL" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["squad"].clone()
}

#[tokio::test]
async fn requests_without_an_access_token_are_rejected() {
    let app = app();
    let (status, _) = call(&app, "GET", "/api/v1/squads/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let id = Uuid::new_v4();
    let refresh = Player {
        id,
        token: test_token(id, "Nova", "refresh", SECRET),
    };
    let (status, _) = call(&app, "GET", "/api/v1/squads/me", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = Player {
        id,
        token: test_token(id, "Nova", "access", "wrong-secret"),
    };
    let (status, body) = call(&app, "GET", "/api/v1/squads/me", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn invite_accept_flow_over_http() {
    let app = app();
    let leader = player("Leader");
    let recruit = player("Recruit");

    let squad = create_squad(&app, &leader, "Team Nemesis").await;
    assert_eq!(squad["maxSize"], 4);
    assert_eq!(squad["leaderId"], json!(leader.id));

    // First authenticated call makes the recruit known to the directory.
    let (_, me) = call(&app, "GET", "/api/v1/squads/me", Some(&recruit), None).await;
    assert!(me["squad"].is_null());

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/squads/invite",
        Some(&leader),
        Some(json!({ "playerId": recruit.id, "role": "sniper" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let invite_id = body["invite"]["id"].as_str().unwrap().to_string();

    let (_, mine) = call(&app, "GET", "/api/v1/squads/invites/me", Some(&recruit), None).await;
    assert_eq!(mine["invites"][0]["status"], "PENDING");

    let (_, counts) = call(&app, "GET", "/api/v1/squads/me", Some(&leader), None).await;
    assert_eq!(counts["pendingCounts"]["invites"], 1);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/v1/squads/invite/{invite_id}/accept"),
        Some(&recruit),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["proposal"]["status"], "ACCEPTED");
    assert_eq!(body["squad"]["members"].as_array().unwrap().len(), 2);

    let (_, me) = call(&app, "GET", "/api/v1/squads/me", Some(&recruit), None).await;
    assert_eq!(me["squad"]["id"], squad["id"]);
    assert!(me["pendingCounts"].is_null());
}

#[tokio::test]
async fn domain_errors_map_to_status_code_and_kind() {
    let app = app();
    let leader = player("Leader");
    let member = player("Member");
    create_squad(&app, &leader, "Nemesis").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/squads/invite",
        Some(&leader),
        Some(json!({ "playerId": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PLAYER_NOT_FOUND");
    assert_eq!(body["kind"], "NotFound");

    let (_, squad) = call(&app, "GET", "/api/v1/squads/me", Some(&leader), None).await;
    let squad_id = squad["squad"]["id"].as_str().unwrap().to_string();
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/squads/join-request",
        Some(&member),
        Some(json!({ "squadId": squad_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/squads/join-request",
        Some(&member),
        Some(json!({ "squadId": squad_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_PENDING");
    assert_eq!(body["kind"], "PreconditionFailed");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/v1/squads/disband?squadId={squad_id}"),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_LEADER");

    let (status, body) = call(
        &app,
        "PATCH",
        "/api/v1/squads/rename",
        Some(&leader),
        Some(json!({ "squadName": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_NAME");

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/v1/squads/{}", Uuid::new_v4()),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SQUAD_NOT_FOUND");
}

#[tokio::test]
async fn disband_over_http_cancels_pending_requests() {
    let app = app();
    let leader = player("Leader");
    let applicant = player("Applicant");
    let squad = create_squad(&app, &leader, "Nemesis").await;

    let (_, body) = call(
        &app,
        "POST",
        "/api/v1/squads/join-request",
        Some(&applicant),
        Some(json!({ "squadId": squad["id"] })),
    )
    .await;
    let request_id = body["joinRequest"]["id"].clone();

    let (status, body) = call(&app, "POST", "/api/v1/squads/disband", Some(&leader), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["squad"]["status"], "DISBANDED");
    assert_eq!(body["cancelled"], json!([request_id]));

    let (_, mine) = call(&app, "GET", "/api/v1/squads/join-requests/me", Some(&applicant), None).await;
    assert_eq!(mine["joinRequests"][0]["status"], "CANCELLED");

    let (status, body) = call(&app, "POST", "/api/v1/squads/leave-request", Some(&leader), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_A_MEMBER");
}

#[tokio::test]
async fn leader_actions_without_a_squad_are_forbidden() {
    let app = app();
    let loner = player("Loner");

    for uri in ["/api/v1/squads/disband", "/api/v1/squads/kick", "/api/v1/squads/invite"] {
        let body = json!({ "playerId": Uuid::new_v4() });
        let (status, body) = call(&app, "POST", uri, Some(&loner), Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}: {body}");
        assert_eq!(body["code"], "NOT_LEADER");
    }

    let (status, body) = call(&app, "GET", "/api/v1/squads/join-requests", Some(&loner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_LEADER");

    let (status, body) = call(&app, "POST", "/api/v1/squads/leave-request", Some(&loner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_A_MEMBER");
}

#[tokio::test]
async fn search_validates_query_length() {
    let app = app();
    let me = player("Searcher");
    let (status, body) = call(&app, "GET", "/api/v1/squads/search?q=a", Some(&me), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");

    let leader = player("Leader");
    create_squad(&app, &leader, "Phoenix").await;
    let (status, body) = call(
        &app,
        "GET",
        "/api/v1/squads/search?q=phoe&type=squad",
        Some(&me),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["squads"].as_array().unwrap().len(), 1);
    assert!(body["players"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_in_memory_directory() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["directory"]["backend"], "memory");
}
