// src/routes/dashboard.rs

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{EmployeeStats, Summary, TrendPoint};
use crate::store::PgRowSource;
use crate::{roster, sessions, stats, AppState};
use super::internal_error;

#[derive(Deserialize)]
pub struct DashboardQ {
    pub search: Option<String>,
    pub program: Option<String>,
}

#[derive(Serialize)]
pub struct DashboardResp {
    pub stats: Vec<EmployeeStats>,
    /// Tiles, computed over the filtered view.
    pub summary: Summary,
    pub trend: Vec<TrendPoint>,
    pub programs: Vec<String>,
}

/// GET /api/v1/dashboard
///
/// Both record sets are fetched concurrently, the aggregate is built once,
/// and the request's filters are applied as a projection on top.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(q): Query<DashboardQ>,
) -> Result<Json<DashboardResp>, (StatusCode, String)> {
    let source = PgRowSource::new(state.pool.clone());
    let (employees, session_list) = tokio::try_join!(
        roster::load_roster(&source),
        sessions::load_sessions(&source)
    )
    .map_err(internal_error)?;

    let now = Utc::now();
    let aggregated = stats::aggregate(&session_list, &employees, now);
    let programs = stats::program_options(&aggregated);

    let filtered = stats::filter_stats(&aggregated, q.search.as_deref(), q.program.as_deref());
    let summary = stats::summary(&filtered);
    let trend = stats::monthly_trend(&session_list, now);

    Ok(Json(DashboardResp {
        stats: filtered,
        summary,
        trend,
        programs,
    }))
}
