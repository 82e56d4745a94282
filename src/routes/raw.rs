// src/routes/raw.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::store::{PgRowSource, RowSource, TableQuery};
use crate::AppState;
use super::internal_error;

#[derive(Deserialize)]
pub struct RawQ {
    pub limit: Option<i64>,
}

/// GET /api/v1/raw/:table
///
/// Schema-debugging inspector: a single bounded page of raw rows, exactly
/// as the store returns them.
pub async fn get_raw(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(q): Query<RawQ>,
) -> Result<Json<Vec<Value>>, (StatusCode, String)> {
    let query = match table.as_str() {
        "employees" => TableQuery::table("employees", "public.employees"),
        "sessions" => TableQuery::table("sessions", "public.sessions"),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown table '{table}', expected employees or sessions"),
            ))
        }
    };

    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let source = PgRowSource::new(state.pool.clone());
    let rows = source
        .fetch_page(&query, 0, limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(rows))
}
