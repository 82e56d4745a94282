// src/sessions.rs
//
// Session retrieval policy: the enriched shape joins the roster table so
// every row carries its employee as a nested object. Schemas without that
// table (or without the foreign key) reject the join, so any failure drops
// to the flat shape and the nested record is synthesized locally instead.

use serde_json::Value;

use crate::fields;
use crate::models::{SessionEmployee, SessionRecord};
use crate::store::{fetch_all_rows, RowSource, StoreError, TableQuery};

fn joined_query() -> TableQuery {
    TableQuery {
        label: "sessions(joined)",
        from: "public.sessions s LEFT JOIN public.employees e ON e.id = s.employee_id".to_string(),
        select: "s.*, to_jsonb(e) AS employee".to_string(),
        not_null: None,
        order_desc: Some("s.session_date".to_string()),
    }
}

fn flat_query() -> TableQuery {
    TableQuery {
        label: "sessions",
        from: "public.sessions".to_string(),
        select: "*".to_string(),
        not_null: None,
        order_desc: Some("created_at".to_string()),
    }
}

/// Loads all sessions. The joined attempt is speculative and silent; the
/// flat fallback is loud and its failure is the user-visible error state.
pub async fn load_sessions<S: RowSource + ?Sized>(
    source: &S,
) -> Result<Vec<SessionRecord>, StoreError> {
    match fetch_all_rows(source, &joined_query(), true).await {
        Ok(rows) => return Ok(rows.iter().map(normalize_session).collect()),
        Err(err) => {
            tracing::debug!(error = %err, "joined session shape unavailable, using flat shape");
        }
    }

    let rows = fetch_all_rows(source, &flat_query(), false).await?;
    Ok(rows.iter().map(normalize_session).collect())
}

/// Normalizes one raw session row: alias resolution for the scalar fields
/// plus the uniform-nested-employee invariant.
pub fn normalize_session(row: &Value) -> SessionRecord {
    let employee = fields::pick(row, fields::EMPLOYEE_REF_FIELDS)
        .and_then(parse_employee_ref)
        .or_else(|| synthesize_employee(row));

    SessionRecord {
        id: fields::first_string(row, &["id", "session_id"]).unwrap_or_default(),
        created_at: fields::first_datetime(row, &["created_at", "inserted_at"]),
        session_date: fields::first_date(row, fields::SESSION_DATE_FIELDS),
        status: fields::first_string(row, &["status"]),
        program: fields::first_string(row, fields::PROGRAM_FIELDS),
        account: fields::first_string(row, fields::ACCOUNT_FIELDS),
        employee,
        employee_name: fields::first_string(row, fields::SESSION_EMPLOYEE_NAME_FIELDS),
    }
}

/// Reads a joined sub-record. Some join shapes deliver an array of one; a
/// null or empty reference counts as absent so synthesis can run.
fn parse_employee_ref(value: &Value) -> Option<SessionEmployee> {
    let obj = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    if !obj.is_object() {
        return None;
    }
    let employee = SessionEmployee {
        id: fields::first_string(obj, &["id", "employee_id"]),
        first_name: fields::first_string(obj, &["first_name"]),
        last_name: fields::first_string(obj, &["last_name"]),
        full_name: fields::first_string(obj, fields::NAME_FIELDS),
        program: fields::first_string(obj, fields::PROGRAM_FIELDS),
        avatar_url: fields::first_string(obj, fields::AVATAR_FIELDS),
    };
    let empty = employee.id.is_none()
        && employee.first_name.is_none()
        && employee.last_name.is_none()
        && employee.full_name.is_none();
    if empty {
        None
    } else {
        Some(employee)
    }
}

/// Builds the nested record from flat columns, splitting the name on the
/// first whitespace boundary.
fn synthesize_employee(row: &Value) -> Option<SessionEmployee> {
    let name = fields::first_string(row, fields::SESSION_EMPLOYEE_NAME_FIELDS);
    let id = fields::first_string(row, &["employee_id"]);
    if name.is_none() && id.is_none() {
        return None;
    }

    let (first_name, last_name) = match &name {
        Some(full) => {
            let mut parts = full.splitn(2, char::is_whitespace);
            let first = parts.next().map(str::to_string);
            let last = parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            (first, last)
        }
        None => (None, None),
    };

    Some(SessionEmployee {
        id,
        first_name,
        last_name,
        full_name: name,
        program: fields::first_string(row, fields::PROGRAM_FIELDS),
        avatar_url: fields::first_string(row, fields::AVATAR_FIELDS),
    })
}
