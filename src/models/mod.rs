// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ───────────────────────────────────────
// Roster
// ───────────────────────────────────────

/// One person in the roster. Every attribute except the id is optional
/// because the remote schema is not fixed; the field-alias layer decides
/// which source column each attribute came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: Option<String>,
    pub program: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub avatar_url: Option<String>,
}

// ───────────────────────────────────────
// Sessions
// ───────────────────────────────────────

/// Uniform nested employee shape on a session row. When the remote row has
/// no joined sub-record this is synthesized from flat columns at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEmployee {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub program: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Rows without a parseable date never classify as completed-by-date.
    pub session_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub program: Option<String>,
    pub account: Option<String>,
    pub employee: Option<SessionEmployee>,
    /// Flat name column kept alongside the nested shape for fallback
    /// resolution in the aggregator.
    pub employee_name: Option<String>,
}

// ───────────────────────────────────────
// Derived aggregates (rebuilt per fetch, never persisted)
// ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeStats {
    pub id: String,
    pub name: String,
    pub program: Option<String>,
    pub avatar_url: Option<String>,
    pub completed: i64,
    pub no_show: i64,
    pub scheduled: i64,
    pub total: i64,
    pub last_session: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub employees: usize,
    pub sessions: i64,
    /// One decimal place, "0.0" when there are no employees.
    pub avg_sessions: String,
    /// Percent of completed over total sessions, 0 when there are none.
    pub utilization: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendPoint {
    pub month: String, // "YYYY-MM"
    pub completed: i64,
}
