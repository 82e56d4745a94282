// src/routes/auth.rs

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, AuthSession};
use crate::AppState;
use super::internal_error;

#[derive(Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
}

/// POST /api/v1/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(b): Json<SignInBody>,
) -> Result<Json<AuthSession>, (StatusCode, String)> {
    match state.auth.sign_in(&b.email, &b.password).await {
        Ok(session) => Ok(Json(session)),
        Err(AuthError::Rejected { message }) => Err((StatusCode::UNAUTHORIZED, message)),
        Err(other) => Err(internal_error(other)),
    }
}

#[derive(Serialize)]
pub struct SessionResp {
    pub active: bool,
}

/// GET /api/v1/auth/session
///
/// The boolean session-presence signal the UI polls for.
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionResp> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let active = match token {
        Some(token) => state.auth.verify_session(token).await,
        None => false,
    };
    Json(SessionResp { active })
}
