//! JWT issuing and checking, shaped like a SimpleJWT backend.

use crate::state::FakeBackend;
use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;

const SIGNING_KEY: &[u8] = b"fake-backend-signing-key";

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub sub: String,
    pub exp: usize,
    pub token_type: String,
    /// Access tokens minted before the current epoch are treated as expired.
    pub epoch: u64,
    /// Makes every minted token distinct.
    pub jti: u64,
}

impl FakeBackend {
    fn mint(&self, username: &str, token_type: &str, lifetime: Duration) -> String {
        let controls = self.controls();
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + lifetime).timestamp() as usize,
            token_type: token_type.to_string(),
            epoch: controls.token_epoch.load(Ordering::SeqCst),
            jti: controls.token_serial.fetch_add(1, Ordering::SeqCst),
        };
        // HS256 over an in-memory struct cannot fail.
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SIGNING_KEY))
            .unwrap_or_default()
    }

    pub(crate) fn issue_access(&self, username: &str) -> String {
        self.mint(username, "access", Duration::minutes(5))
    }

    /// Mints an `(access, refresh)` pair without going through `/token/`.
    pub fn issue_session(&self, username: &str) -> (String, String) {
        (
            self.issue_access(username),
            self.mint(username, "refresh", Duration::days(1)),
        )
    }

    pub(crate) fn verify(&self, token: &str, token_type: &str) -> Option<Claims> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(SIGNING_KEY),
            &Validation::new(Algorithm::HS256),
        )
        .ok()?
        .claims;

        if claims.token_type != token_type {
            return None;
        }
        if token_type == "access" {
            let controls = self.controls();
            if controls.reject_every_token.load(Ordering::SeqCst)
                || claims.epoch != controls.token_epoch.load(Ordering::SeqCst)
            {
                return None;
            }
        }
        Some(claims)
    }

    pub(crate) fn token_rejection(&self) -> Response {
        let status = if self.controls().expired_as_forbidden.load(Ordering::SeqCst) {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::UNAUTHORIZED
        };
        (
            status,
            Json(json!({
                "detail": "Given token not valid for any token type",
                "code": "token_not_valid",
            })),
        )
            .into_response()
    }
}

/// Rejects requests without a valid access token.
pub(crate) async fn require_access(
    State(backend): State<FakeBackend>,
    req: Request,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let Some(token) = header.strip_prefix("Bearer ") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Authentication credentials were not provided." })),
        )
            .into_response();
    };

    if backend.verify(token, "access").is_none() {
        return backend.token_rejection();
    }
    next.run(req).await
}
