use axum::http::StatusCode;

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod raw;
pub mod roster;

// Common error mapper. Genuine faults surface with the raw stringified
// error so the UI's error panel can show it verbatim.
pub fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error: {e}"))
}
