// src/roster.rs
//
// Roster retrieval policy: the dedicated roster table is preferred, but a
// deployment that only ever wrote session rows has no such table. In that
// case the roster is reconstructed from the session log itself.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde_json::Value;

use crate::fields;
use crate::models::Employee;
use crate::store::{fetch_all_rows, RowSource, StoreError, TableQuery};

fn roster_query() -> TableQuery {
    TableQuery::table("employees", "public.employees")
}

fn fallback_query() -> TableQuery {
    TableQuery {
        label: "sessions(roster-fallback)",
        from: "public.sessions".to_string(),
        select: "*".to_string(),
        not_null: Some("employee_name".to_string()),
        order_desc: None,
    }
}

/// Loads the roster, silently falling back to a scan of the session table
/// when the dedicated table is missing or empty. An empty result is a valid
/// end state, not an error.
pub async fn load_roster<S: RowSource + ?Sized>(source: &S) -> Result<Vec<Employee>, StoreError> {
    match fetch_all_rows(source, &roster_query(), true).await {
        Ok(rows) if !rows.is_empty() => {
            return Ok(rows.iter().map(normalize_employee).collect());
        }
        Ok(_) => {
            tracing::debug!("roster table empty, reconstructing from sessions");
        }
        Err(err) if err.is_missing_schema() => {
            tracing::debug!("no roster table, reconstructing from sessions");
        }
        Err(err) => return Err(err),
    }

    let rows = match fetch_all_rows(source, &fallback_query(), true).await {
        Ok(rows) => rows,
        Err(err) if err.is_missing_schema() => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    Ok(roster_from_session_rows(&rows))
}

/// Normalizes one raw roster row through the field-alias layer.
pub fn normalize_employee(row: &Value) -> Employee {
    Employee {
        id: fields::first_string(row, &["id", "employee_id"]).unwrap_or_default(),
        name: fields::display_name(row),
        program: fields::first_string(row, fields::PROGRAM_FIELDS),
        email: fields::first_string(row, fields::EMAIL_FIELDS),
        phone: fields::first_string(row, fields::PHONE_FIELDS),
        start_date: fields::first_date(row, fields::START_DATE_FIELDS),
        end_date: fields::first_date(row, fields::END_DATE_FIELDS),
        notes: fields::first_string(row, fields::NOTES_FIELDS),
        avatar_url: fields::first_string(row, fields::AVATAR_FIELDS),
    }
}

/// Reconciles session rows into one employee per key. Key is the employee
/// id when the row has one, else the normalized name. First-seen wins,
/// except that a later row replaces an earlier one when the earlier record
/// had no program and the later row brings one.
pub fn roster_from_session_rows(rows: &[Value]) -> Vec<Employee> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Employee> = HashMap::new();

    for row in rows {
        let Some(name) = fields::first_string(row, fields::SESSION_EMPLOYEE_NAME_FIELDS) else {
            continue;
        };
        let employee_id = fields::first_string(row, &["employee_id"]);
        let key = employee_id
            .clone()
            .unwrap_or_else(|| name.trim().to_lowercase());

        let candidate = Employee {
            id: employee_id
                .or_else(|| fields::first_string(row, &["id"]))
                .unwrap_or_default(),
            name: Some(name),
            program: fields::first_string(row, fields::PROGRAM_FIELDS),
            email: fields::first_string(row, fields::EMAIL_FIELDS),
            phone: None,
            start_date: None,
            end_date: None,
            notes: None,
            avatar_url: fields::first_string(row, fields::AVATAR_FIELDS),
        };

        match by_key.entry(key.clone()) {
            Entry::Vacant(slot) => {
                order.push(key);
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().program.is_none() && candidate.program.is_some() {
                    slot.insert(candidate);
                }
            }
        }
    }

    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

/// Presentation-level projection over the already-loaded roster: substring
/// match on name, exact match on program. "All"/"All Programs" and blanks
/// mean unfiltered.
pub fn filter_employees(
    employees: &[Employee],
    search: Option<&str>,
    program: Option<&str>,
) -> Vec<Employee> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let program = program
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "All" && *p != "All Programs");

    employees
        .iter()
        .filter(|e| {
            let name_ok = needle.as_ref().map_or(true, |n| {
                e.name
                    .as_deref()
                    .map_or(false, |name| name.to_lowercase().contains(n.as_str()))
            });
            let program_ok = program.map_or(true, |p| e.program.as_deref() == Some(p));
            name_ok && program_ok
        })
        .cloned()
        .collect()
}
