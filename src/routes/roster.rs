// src/routes/roster.rs

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::models::Employee;
use crate::roster;
use crate::store::PgRowSource;
use crate::AppState;
use super::internal_error;

#[derive(Deserialize)]
pub struct RosterQ {
    pub search: Option<String>,
    pub program: Option<String>,
}

#[derive(Serialize)]
pub struct RosterResp {
    pub employees: Vec<Employee>,
    /// Distinct program labels for the filter dropdown, derived from the
    /// full roster rather than the filtered slice.
    pub programs: Vec<String>,
}

/// GET /api/v1/roster
///
/// Fresh fetch per request; filtering is a pure projection over the
/// normalized list.
pub async fn get_roster(
    State(state): State<AppState>,
    Query(q): Query<RosterQ>,
) -> Result<Json<RosterResp>, (StatusCode, String)> {
    let source = PgRowSource::new(state.pool.clone());
    let employees = roster::load_roster(&source).await.map_err(internal_error)?;

    let mut programs: Vec<String> = employees
        .iter()
        .filter_map(|e| e.program.clone())
        .collect();
    programs.sort();
    programs.dedup();

    let employees = roster::filter_employees(&employees, q.search.as_deref(), q.program.as_deref());
    Ok(Json(RosterResp { employees, programs }))
}
