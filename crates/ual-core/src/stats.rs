//! Aggregate ledger statistics for overview reporting.
//!
//! Counts default to zero and breakdowns to empty maps; these are the only
//! values in the crate allowed to fall back to defaults.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::clock::{MICROS_PER_HOUR, utc_day_start_us};
use crate::config::ProcessConfig;
use crate::error::Result;
use crate::process::status::TERMINAL_STATES;

/// `post_state` values that mark a record as awaiting follow-up. Matched
/// like [`TERMINAL_STATES`]: trimmed and case-insensitive.
pub const PENDING_STATES: &[&str] = &["pending", "waiting", "in_progress"];

const DAY_US: i64 = 24 * MICROS_PER_HOUR;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total_active: u64,
    /// Active records created on the UTC day containing `now`.
    pub active_today: u64,
    /// Active pending records without a completed active child.
    pub pending: u64,
    /// Pending records older than the overdue threshold.
    pub overdue: u64,
    pub voided: u64,
    /// Today's active records per department.
    pub by_department: BTreeMap<String, u64>,
    /// Today's active records per action type.
    pub by_action_type: BTreeMap<String, u64>,
}

/// Compute statistics as of `now_us`.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn ledger_stats(conn: &Connection, now_us: i64, config: &ProcessConfig) -> Result<LedgerStats> {
    let day_start = utc_day_start_us(now_us);
    let day_end = day_start.saturating_add(DAY_US);
    let overdue_before =
        now_us.saturating_sub(i64::from(config.overdue_hours).saturating_mul(MICROS_PER_HOUR));

    let pending_list = sql_list(PENDING_STATES);
    let terminal_list = sql_list(TERMINAL_STATES);
    let pending_predicate = format!(
        "a.is_voided = 0 AND lower(trim(a.post_state)) IN ({pending_list}) \
         AND NOT EXISTS ( \
             SELECT 1 FROM actions c \
             WHERE c.parent_action_id = a.action_id \
               AND c.is_voided = 0 \
               AND lower(trim(c.post_state)) IN ({terminal_list}))"
    );

    let tx = conn.unchecked_transaction()?;
    let stats = LedgerStats {
        total_active: count(&tx, "SELECT COUNT(*) FROM actions WHERE is_voided = 0", &[])?,
        active_today: count(
            &tx,
            "SELECT COUNT(*) FROM actions \
             WHERE is_voided = 0 AND created_at_us >= ?1 AND created_at_us < ?2",
            &[day_start, day_end],
        )?,
        pending: count(
            &tx,
            &format!("SELECT COUNT(*) FROM actions a WHERE {pending_predicate}"),
            &[],
        )?,
        overdue: count(
            &tx,
            &format!(
                "SELECT COUNT(*) FROM actions a WHERE {pending_predicate} AND a.created_at_us < ?1"
            ),
            &[overdue_before],
        )?,
        voided: count(&tx, "SELECT COUNT(*) FROM actions WHERE is_voided = 1", &[])?,
        by_department: grouped_today(&tx, "department", day_start, day_end)?,
        by_action_type: grouped_today(&tx, "action_type", day_start, day_end)?,
    };
    tx.finish()?;
    Ok(stats)
}

fn count(conn: &Connection, sql: &str, args: &[i64]) -> Result<u64> {
    let value: i64 = conn.query_row(sql, rusqlite::params_from_iter(args), |row| row.get(0))?;
    Ok(u64::try_from(value).unwrap_or_default())
}

fn grouped_today(
    conn: &Connection,
    column: &str,
    day_start: i64,
    day_end: i64,
) -> Result<BTreeMap<String, u64>> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM actions \
         WHERE is_voided = 0 AND created_at_us >= ?1 AND created_at_us < ?2 \
         GROUP BY {column}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![day_start, day_end], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = BTreeMap::new();
    for row in rows {
        let (key, value) = row?;
        counts.insert(key, u64::try_from(value).unwrap_or_default());
    }
    Ok(counts)
}

/// Quote constant lowercase state names for an `IN (...)` list.
fn sql_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::clock::ManualClock;
    use crate::config::AppendConfig;
    use crate::db::open_in_memory;
    use crate::ledger::append::append_with_clock;
    use crate::ledger::void::void_record;
    use crate::model::NewRecord;

    const DAY: i64 = DAY_US;

    #[test]
    fn empty_ledger_is_all_zero() {
        let conn = open_in_memory().expect("db");
        let stats = ledger_stats(&conn, 10 * DAY, &ProcessConfig::default()).expect("stats");
        assert_eq!(stats, LedgerStats::default());
    }

    #[test]
    fn counts_pending_overdue_and_breakdowns() {
        let mut conn = open_in_memory().expect("db");
        let alice = Actor::new("alice").expect("actor");
        let cfg = AppendConfig::default();
        let clock = ManualClock::new(10 * DAY);

        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("request", "PO-1", "po", "finance").states(None, Some("pending")),
            &cfg,
            &clock,
        )
        .expect("old pending");
        let resolved_parent = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("request", "PO-2", "po", "finance").states(None, Some("waiting")),
            &cfg,
            &clock,
        )
        .expect("parent");

        clock.set(13 * DAY + MICROS_PER_HOUR);
        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("approve", "PO-2", "po", "finance")
                .states(Some("waiting"), Some("approved"))
                .parent(resolved_parent.id.clone()),
            &cfg,
            &clock,
        )
        .expect("child");
        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("file", "RPT-1", "report", "ops").states(None, Some("in_progress")),
            &cfg,
            &clock,
        )
        .expect("fresh pending");
        let mistake = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("file", "RPT-2", "report", "ops"),
            &cfg,
            &clock,
        )
        .expect("mistake");
        void_record(&conn, &alice, &mistake.id, "typo").expect("void");

        let stats = ledger_stats(&conn, 13 * DAY + 2 * MICROS_PER_HOUR, &ProcessConfig::default())
            .expect("stats");
        assert_eq!(stats.total_active, 4);
        assert_eq!(stats.active_today, 2);
        assert_eq!(stats.pending, 2, "old pending + fresh in_progress");
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.voided, 1);
        assert_eq!(stats.by_department.get("finance"), Some(&1));
        assert_eq!(stats.by_department.get("ops"), Some(&1));
        assert_eq!(stats.by_action_type.get("approve"), Some(&1));
    }

    #[test]
    fn today_excludes_records_from_later_days() {
        let mut conn = open_in_memory().expect("db");
        let alice = Actor::new("alice").expect("actor");
        let clock = ManualClock::new(11 * DAY + MICROS_PER_HOUR);
        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("file", "RPT-9", "report", "ops"),
            &AppendConfig::default(),
            &clock,
        )
        .expect("tomorrow");

        let stats = ledger_stats(&conn, 10 * DAY + MICROS_PER_HOUR, &ProcessConfig::default())
            .expect("stats");
        assert_eq!(stats.total_active, 1);
        assert_eq!(stats.active_today, 0);
        assert!(stats.by_department.is_empty());
        assert!(stats.by_action_type.is_empty());
    }

    #[test]
    fn state_matching_ignores_case_and_padding() {
        let mut conn = open_in_memory().expect("db");
        let alice = Actor::new("alice").expect("actor");
        let cfg = AppendConfig::default();
        let clock = ManualClock::new(10 * DAY);

        let parent = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("request", "PO-7", "po", "finance").states(None, Some("Pending")),
            &cfg,
            &clock,
        )
        .expect("parent");
        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("approve", "PO-7", "po", "finance")
                .states(Some("Pending"), Some("Approved"))
                .parent(parent.id.clone()),
            &cfg,
            &clock,
        )
        .expect("child");
        append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("request", "PO-8", "po", "finance").states(None, Some(" WAITING ")),
            &cfg,
            &clock,
        )
        .expect("padded pending");

        let stats = ledger_stats(&conn, 10 * DAY + MICROS_PER_HOUR, &ProcessConfig::default())
            .expect("stats");
        assert!(crate::process::status::is_terminal_state(Some("Approved")));
        assert_eq!(stats.pending, 1, "only PO-8 still waits");
    }
}
