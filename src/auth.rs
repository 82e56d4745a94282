// src/auth.rs
//
// Thin client for the hosted auth provider. The service never manages
// credentials itself: sign-in is proxied to the provider's password grant
// and the only thing the data routes consume is a boolean "is there an
// active session" check on the bearer token.

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the credentials; `message` is its own wording,
    /// surfaced to the user as-is.
    #[error("{message}")]
    Rejected { message: String },
    #[error("auth provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("AUTH_URL")
            .context("AUTH_URL must point at the hosted auth provider")?;
        let anon_key = std::env::var("AUTH_ANON_KEY")
            .context("AUTH_ANON_KEY must be set for the hosted auth provider")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let url = format!("{}/token?grant_type=password", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }

        let status = resp.status();
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        let message = ["error_description", "msg", "message", "error"]
            .iter()
            .find_map(|k| body.get(k).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("sign-in rejected ({status})"));
        Err(AuthError::Rejected { message })
    }

    /// Session presence check: does the provider recognize this token?
    pub async fn verify_session(&self, token: &str) -> bool {
        let url = format!("{}/user", self.base_url);
        match self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::debug!(error = %err, "session check failed");
                false
            }
        }
    }
}

/// Gate for the data routes. Health and sign-in stay open.
pub async fn require_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if state.auth.verify_session(token).await => Ok(next.run(req).await),
        _ => Err((StatusCode::UNAUTHORIZED, "no active session".to_string())),
    }
}
