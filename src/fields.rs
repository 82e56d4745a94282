// src/fields.rs
//
// Alternate-column-name resolution. The remote store's schema is not under
// our control and semantically-equivalent columns show up under different
// names depending on which migration the customer ran. Each logical
// attribute gets a fixed priority list; the first populated column wins.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

pub const NAME_FIELDS: &[&str] = &["name", "full_name", "display_name", "employee_name", "employee"];
pub const PROGRAM_FIELDS: &[&str] = &["program", "department", "organization", "team"];
pub const EMAIL_FIELDS: &[&str] = &["email", "email_address", "contact_email"];
pub const PHONE_FIELDS: &[&str] = &["phone", "phone_number", "mobile"];
pub const START_DATE_FIELDS: &[&str] = &["start_date", "started_at", "hire_date"];
pub const END_DATE_FIELDS: &[&str] = &["end_date", "ended_at", "termination_date"];
pub const NOTES_FIELDS: &[&str] = &["notes", "note", "comments"];
pub const AVATAR_FIELDS: &[&str] = &["avatar_url", "avatar", "photo_url", "image_url"];

pub const SESSION_DATE_FIELDS: &[&str] = &["session_date", "date", "scheduled_at"];
pub const ACCOUNT_FIELDS: &[&str] = &["account", "account_name", "client"];
/// Joined sub-record on a session row, under whichever alias the join used.
pub const EMPLOYEE_REF_FIELDS: &[&str] = &["employee", "employees", "employee_manager"];
/// Flat name column on a session row (no join available).
pub const SESSION_EMPLOYEE_NAME_FIELDS: &[&str] = &["employee_name", "employee", "coachee_name"];

/// Scalar-to-text coercion. Numeric and boolean ids stringify; blank
/// strings count as missing so the priority scan keeps looking.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First populated value among `keys`, as raw JSON.
pub fn pick<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = row.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First populated value among `keys`, coerced to trimmed text.
pub fn first_string(row: &Value, keys: &[&str]) -> Option<String> {
    let obj = row.as_object()?;
    keys.iter().find_map(|k| obj.get(*k).and_then(as_text))
}

pub fn first_date(row: &Value, keys: &[&str]) -> Option<NaiveDate> {
    first_string(row, keys).and_then(|s| parse_date(&s))
}

pub fn first_datetime(row: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    first_string(row, keys)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Accepts plain `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(prefix) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Display name for a roster row: the name aliases first, then a composed
/// "first last" from the split columns.
pub fn display_name(row: &Value) -> Option<String> {
    if let Some(name) = first_string(row, NAME_FIELDS) {
        return Some(name);
    }
    let first = first_string(row, &["first_name"]);
    let last = first_string(row, &["last_name"]);
    match (first, last) {
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (Some(f), None) => Some(f),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_order_is_respected() {
        let row = json!({"department": "Ops", "program": "Coaching"});
        assert_eq!(first_string(&row, PROGRAM_FIELDS).as_deref(), Some("Coaching"));

        let row = json!({"department": "Ops"});
        assert_eq!(first_string(&row, PROGRAM_FIELDS).as_deref(), Some("Ops"));
    }

    #[test]
    fn blank_and_null_values_are_skipped() {
        let row = json!({"name": "  ", "full_name": null, "display_name": "Avery Lee"});
        assert_eq!(first_string(&row, NAME_FIELDS).as_deref(), Some("Avery Lee"));
    }

    #[test]
    fn numeric_ids_stringify() {
        let row = json!({"id": 42});
        assert_eq!(first_string(&row, &["id"]).as_deref(), Some("42"));
    }

    #[test]
    fn date_parsing_accepts_both_shapes() {
        assert_eq!(
            parse_date("2023-10-25"),
            NaiveDate::from_ymd_opt(2023, 10, 25)
        );
        assert_eq!(
            parse_date("2023-10-25T14:30:00+00:00"),
            NaiveDate::from_ymd_opt(2023, 10, 25)
        );
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn display_name_composes_split_columns() {
        let row = json!({"first_name": "Alice", "last_name": "Johnson"});
        assert_eq!(display_name(&row).as_deref(), Some("Alice Johnson"));

        let row = json!({"name": "Avery Lee", "first_name": "Ignored"});
        assert_eq!(display_name(&row).as_deref(), Some("Avery Lee"));
    }
}
