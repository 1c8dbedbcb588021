use crate::state::FakeBackend;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::PoisonError;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh: String,
}

pub fn token_routes() -> Router<FakeBackend> {
    Router::new()
        .route("/token/", post(obtain_pair))
        .route("/token/refresh/", post(refresh))
}

/// POST /api/token/
async fn obtain_pair(State(backend): State<FakeBackend>, Json(body): Json<Credentials>) -> Response {
    let valid = backend
        .shared
        .users
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&body.username)
        .is_some_and(|p| *p == body.password);

    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response();
    }

    let (access, refresh) = backend.issue_session(&body.username);
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

/// POST /api/token/refresh/
async fn refresh(State(backend): State<FakeBackend>, Json(body): Json<RefreshBody>) -> Response {
    let controls = backend.controls();
    controls.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = controls.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if controls.fail_refresh.load(Ordering::SeqCst) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response();
    }

    match backend.verify(&body.refresh, "refresh") {
        Some(claims) => Json(json!({ "access": backend.issue_access(&claims.sub) })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response(),
    }
}
