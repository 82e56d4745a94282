// src/stats.rs
//
// The aggregation pass: one stat record per unique normalized name key
// across the union of roster and sessions, rebuilt from scratch on every
// fetch. Filtering and summary math are separate pure projections over the
// aggregate so they can re-run per request without touching the store.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveTime, Utc};

use crate::models::{Employee, EmployeeStats, SessionRecord, Summary, TrendPoint};

const UNKNOWN_ROSTER_NAME: &str = "Unknown";
const UNKNOWN_SESSION_NAME: &str = "Unknown Employee";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Completed,
    NoShow,
    Scheduled,
}

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Total, mutually exclusive classification. Precedence: no-show markers
/// beat everything, then an explicit "completed", then the date rule for
/// blank statuses (a session already in the past with nothing recorded
/// counts as held).
pub fn classify(
    status: Option<&str>,
    session_date: Option<chrono::NaiveDate>,
    now: DateTime<Utc>,
) -> SessionStatus {
    let status = norm(status.unwrap_or(""));

    if ["no show", "noshow", "late cancel"]
        .iter()
        .any(|marker| status.contains(marker))
    {
        return SessionStatus::NoShow;
    }
    if status.contains("completed") {
        return SessionStatus::Completed;
    }
    if status.is_empty() {
        if let Some(date) = session_date {
            if date.and_time(NaiveTime::MIN).and_utc() < now {
                return SessionStatus::Completed;
            }
        }
    }
    SessionStatus::Scheduled
}

/// Display name for a session, nested reference first. A composed
/// "first last" beats a bare full name; the flat column is the last resort.
fn session_display_name(session: &SessionRecord) -> String {
    if let Some(employee) = &session.employee {
        let composed = match (&employee.first_name, &employee.last_name) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(f), None) => Some(f.clone()),
            _ => None,
        };
        if let Some(name) = composed {
            return name;
        }
        if let Some(name) = &employee.full_name {
            return name.clone();
        }
    }
    if let Some(name) = &session.employee_name {
        return name.clone();
    }
    UNKNOWN_SESSION_NAME.to_string()
}

/// Pure join of the two record sets by normalized name key. Every roster
/// employee appears even with zero sessions; a session whose employee is
/// missing from the roster creates its entry on the fly.
pub fn aggregate(
    sessions: &[SessionRecord],
    employees: &[Employee],
    now: DateTime<Utc>,
) -> Vec<EmployeeStats> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, EmployeeStats> = HashMap::new();

    for employee in employees {
        let name = employee
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_ROSTER_NAME.to_string());
        let key = norm(&name);
        if let Entry::Vacant(slot) = by_key.entry(key.clone()) {
            order.push(key);
            slot.insert(EmployeeStats {
                id: employee.id.clone(),
                name,
                program: employee.program.clone(),
                avatar_url: employee.avatar_url.clone(),
                completed: 0,
                no_show: 0,
                scheduled: 0,
                total: 0,
                last_session: None,
            });
        }
    }

    for session in sessions {
        let name = session_display_name(session);
        let key = norm(&name);

        let stats = match by_key.entry(key.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                order.push(key);
                let nested = session.employee.as_ref();
                let placeholder_id = nested
                    .and_then(|e| e.id.clone())
                    .unwrap_or_else(|| session.id.clone());
                slot.insert(EmployeeStats {
                    id: placeholder_id,
                    name,
                    program: nested.and_then(|e| e.program.clone()),
                    avatar_url: nested.and_then(|e| e.avatar_url.clone()),
                    completed: 0,
                    no_show: 0,
                    scheduled: 0,
                    total: 0,
                    last_session: None,
                })
            }
        };

        // Roster-seeded entries may still be missing labels the session
        // side knows about.
        if let Some(nested) = &session.employee {
            if stats.program.is_none() {
                stats.program = nested.program.clone();
            }
            if stats.avatar_url.is_none() {
                stats.avatar_url = nested.avatar_url.clone();
            }
        }

        match classify(session.status.as_deref(), session.session_date, now) {
            SessionStatus::Completed => stats.completed += 1,
            SessionStatus::NoShow => stats.no_show += 1,
            SessionStatus::Scheduled => stats.scheduled += 1,
        }
        stats.total += 1;

        if let Some(date) = session.session_date {
            stats.last_session = Some(match stats.last_session {
                Some(seen) if seen >= date => seen,
                _ => date,
            });
        }
    }

    let mut out: Vec<EmployeeStats> = order
        .into_iter()
        .filter_map(|k| by_key.remove(&k))
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Summary tiles, computed over whatever slice the caller filtered down to.
pub fn summary(stats: &[EmployeeStats]) -> Summary {
    let employees = stats.len();
    let sessions: i64 = stats.iter().map(|s| s.total).sum();
    let completed: i64 = stats.iter().map(|s| s.completed).sum();

    let avg_sessions = if employees == 0 {
        "0.0".to_string()
    } else {
        format!("{:.1}", sessions as f64 / employees as f64)
    };
    let utilization = if sessions == 0 {
        0
    } else {
        (100.0 * completed as f64 / sessions as f64).round() as i64
    };

    Summary {
        employees,
        sessions,
        avg_sessions,
        utilization,
    }
}

/// Completed sessions bucketed by calendar month, oldest first. Shares the
/// classifier so no-show markers stay excluded even when the blank-status
/// date rule would have fired.
pub fn monthly_trend(sessions: &[SessionRecord], now: DateTime<Utc>) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for session in sessions {
        let Some(date) = session.session_date else {
            continue;
        };
        if classify(session.status.as_deref(), Some(date), now) != SessionStatus::Completed {
            continue;
        }
        *buckets.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(month, completed)| TrendPoint { month, completed })
        .collect()
}

/// Pure projection for the dashboard filters: case-insensitive substring on
/// name, exact match on program ("All"/"All Programs" mean unfiltered).
pub fn filter_stats(
    stats: &[EmployeeStats],
    search: Option<&str>,
    program: Option<&str>,
) -> Vec<EmployeeStats> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let program = program
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "All" && *p != "All Programs");

    stats
        .iter()
        .filter(|s| {
            let name_ok = needle
                .as_ref()
                .map_or(true, |n| s.name.to_lowercase().contains(n.as_str()));
            let program_ok = program.map_or(true, |p| s.program.as_deref() == Some(p));
            name_ok && program_ok
        })
        .cloned()
        .collect()
}

/// Distinct non-empty program labels, sorted, for the filter dropdown.
pub fn program_options(stats: &[EmployeeStats]) -> Vec<String> {
    let mut programs: Vec<String> = stats
        .iter()
        .filter_map(|s| s.program.clone())
        .collect();
    programs.sort();
    programs.dedup();
    programs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionEmployee;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(id: &str, name: &str, program: Option<&str>) -> Employee {
        Employee {
            id: id.to_string(),
            name: Some(name.to_string()),
            program: program.map(str::to_string),
            email: None,
            phone: None,
            start_date: None,
            end_date: None,
            notes: None,
            avatar_url: None,
        }
    }

    fn session(id: &str, name: &str, status: Option<&str>, day: Option<NaiveDate>) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            created_at: None,
            session_date: day,
            status: status.map(str::to_string),
            program: None,
            account: None,
            employee: None,
            employee_name: Some(name.to_string()),
        }
    }

    #[test]
    fn no_show_markers_beat_everything() {
        assert_eq!(
            classify(Some("Late Cancel"), Some(date(2023, 1, 1)), now()),
            SessionStatus::NoShow
        );
        assert_eq!(
            classify(Some("NOSHOW"), None, now()),
            SessionStatus::NoShow
        );
        assert_eq!(
            classify(Some("no show - client sick"), Some(date(2030, 1, 1)), now()),
            SessionStatus::NoShow
        );
    }

    #[test]
    fn blank_status_uses_the_date_rule() {
        assert_eq!(
            classify(None, Some(date(2024, 6, 1)), now()),
            SessionStatus::Completed
        );
        assert_eq!(
            classify(Some("  "), Some(date(2024, 7, 1)), now()),
            SessionStatus::Scheduled
        );
        // No date at all: nothing to infer from, stays scheduled.
        assert_eq!(classify(None, None, now()), SessionStatus::Scheduled);
    }

    #[test]
    fn explicit_completed_wins_over_future_dates() {
        assert_eq!(
            classify(Some("Completed"), Some(date(2030, 1, 1)), now()),
            SessionStatus::Completed
        );
    }

    #[test]
    fn roster_employee_with_no_sessions_keeps_zero_counts() {
        let stats = aggregate(&[], &[employee("1", "Avery Lee", Some("Coaching"))], now());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "Avery Lee");
        assert_eq!(stats[0].completed, 0);
        assert_eq!(stats[0].no_show, 0);
        assert_eq!(stats[0].scheduled, 0);
        assert_eq!(stats[0].total, 0);
    }

    #[test]
    fn off_roster_session_creates_a_synthesized_entry() {
        let sessions = vec![session("s-9", "Drew Chen", Some("Scheduled"), None)];
        let stats = aggregate(&sessions, &[], now());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].id, "s-9"); // session's own id as placeholder
        assert_eq!(stats[0].total, 1);
    }

    #[test]
    fn off_roster_session_prefers_the_employee_id_when_present() {
        let mut s = session("s-9", "Drew Chen", None, None);
        s.employee = Some(SessionEmployee {
            id: Some("77".into()),
            first_name: Some("Drew".into()),
            last_name: Some("Chen".into()),
            full_name: None,
            program: None,
            avatar_url: None,
        });
        let stats = aggregate(&[s], &[], now());
        assert_eq!(stats[0].id, "77");
        assert_eq!(stats[0].name, "Drew Chen");
    }

    #[test]
    fn buckets_partition_every_session_exactly_once() {
        let sessions = vec![
            session("1", "Avery Lee", Some("Completed"), Some(date(2024, 5, 1))),
            session("2", "Avery Lee", Some("No Show"), Some(date(2024, 5, 2))),
            session("3", "Avery Lee", None, Some(date(2024, 5, 3))),
            session("4", "Avery Lee", None, Some(date(2024, 8, 3))),
            session("5", "Avery Lee", Some("Late Cancel"), Some(date(2024, 1, 3))),
        ];
        let stats = aggregate(&sessions, &[], now());
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.completed + s.no_show + s.scheduled, s.total);
        assert_eq!(s.total, 5);
        assert_eq!(s.completed, 2);
        assert_eq!(s.no_show, 2);
        assert_eq!(s.scheduled, 1);
        assert_eq!(s.last_session, Some(date(2024, 8, 3)));
    }

    #[test]
    fn roster_and_sessions_reconcile_by_case_insensitive_name() {
        let roster = vec![employee("1", "Alice Johnson", Some("Eng"))];
        let sessions = vec![session(
            "s-1",
            "alice johnson",
            Some("Completed"),
            Some(date(2023, 10, 25)),
        )];
        let stats = aggregate(&sessions, &roster, now());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name, "Alice Johnson");
        assert_eq!(stats[0].program.as_deref(), Some("Eng"));
        assert_eq!(stats[0].completed, 1);
        assert_eq!(stats[0].total, 1);
    }

    #[test]
    fn summary_handles_empty_views_without_dividing() {
        let s = summary(&[]);
        assert_eq!(s.employees, 0);
        assert_eq!(s.sessions, 0);
        assert_eq!(s.avg_sessions, "0.0");
        assert_eq!(s.utilization, 0);
    }

    #[test]
    fn summary_rounds_utilization_and_formats_average() {
        let stats = aggregate(
            &[
                session("1", "Avery Lee", Some("Completed"), Some(date(2024, 5, 1))),
                session("2", "Avery Lee", Some("Scheduled"), Some(date(2024, 7, 1))),
                session("3", "Drew Chen", Some("Completed"), Some(date(2024, 5, 2))),
            ],
            &[],
            now(),
        );
        let s = summary(&stats);
        assert_eq!(s.employees, 2);
        assert_eq!(s.sessions, 3);
        assert_eq!(s.avg_sessions, "1.5");
        assert_eq!(s.utilization, 67); // round(100 * 2 / 3)
    }

    #[test]
    fn trend_counts_completed_only_and_sorts_months() {
        let sessions = vec![
            session("1", "Avery Lee", Some("Completed"), Some(date(2024, 5, 20))),
            session("2", "Avery Lee", None, Some(date(2024, 3, 2))),
            // Past date, but a no-show never reaches the completed bucket.
            session("3", "Avery Lee", Some("No Show"), Some(date(2024, 3, 9))),
            session("4", "Drew Chen", Some("Completed"), Some(date(2024, 5, 1))),
        ];
        let trend = monthly_trend(&sessions, now());
        assert_eq!(
            trend,
            vec![
                TrendPoint { month: "2024-03".into(), completed: 1 },
                TrendPoint { month: "2024-05".into(), completed: 2 },
            ]
        );
    }

    #[test]
    fn filters_compose_and_all_programs_means_unfiltered() {
        let stats = aggregate(
            &[],
            &[
                employee("1", "Alice Johnson", Some("Eng")),
                employee("2", "Bob Smith", Some("Sales")),
            ],
            now(),
        );
        assert_eq!(filter_stats(&stats, Some("ALICE"), None).len(), 1);
        assert_eq!(filter_stats(&stats, None, Some("Sales")).len(), 1);
        assert_eq!(filter_stats(&stats, Some("alice"), Some("Sales")).len(), 0);
        assert_eq!(filter_stats(&stats, None, Some("All Programs")).len(), 2);
        assert_eq!(filter_stats(&stats, None, Some("All")).len(), 2);

        assert_eq!(program_options(&stats), vec!["Eng".to_string(), "Sales".to_string()]);
    }

    #[test]
    fn unnamed_roster_rows_fold_into_unknown() {
        let mut e = employee("1", "x", None);
        e.name = None;
        let stats = aggregate(&[], &[e], now());
        assert_eq!(stats[0].name, "Unknown");
    }
}
