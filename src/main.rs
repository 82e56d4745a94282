// src/main.rs

use std::env;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod auth;
mod db;
mod fields;
mod models;
mod roster;
mod routes;
mod sessions;
mod stats;
mod store;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub auth: auth::AuthClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let pool = db::connect().await?;
    let auth_client = auth::AuthClient::from_env()?;
    let state = AppState {
        pool,
        auth: auth_client,
    };

    // Very permissive CORS for the browser UI (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Data routes require an active session with the auth provider.
    let protected = Router::new()
        .route("/api/v1/roster", get(routes::roster::get_roster))
        .route("/api/v1/dashboard", get(routes::dashboard::get_dashboard))
        .route("/api/v1/raw/:table", get(routes::raw::get_raw))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/v1/auth/sign-in", post(routes::auth::sign_in))
        .route("/api/v1/auth/session", get(routes::auth::session))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    println!("🚀 API listening on http://127.0.0.1:{port}");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
