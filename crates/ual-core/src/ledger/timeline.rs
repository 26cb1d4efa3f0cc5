//! Per-target timelines.
//!
//! Two queries regardless of history length: one for the target's active
//! records, one joining their outgoing edges to the referenced records. The
//! related-actions window is a sliding scan over the sorted records.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::config::TimelineConfig;
use crate::db::rows::{DEPENDENCY_COLUMNS, RECORD_COLUMNS, row_to_dependency, row_to_record_at};
use crate::error::{LedgerError, Result};
use crate::model::{ActionDependency, LedgerRecord};

use super::query::records_for_target;

/// An outgoing edge with the record it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyEdge {
    #[serde(flatten)]
    pub dependency: ActionDependency,
    pub target: LedgerRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub record: LedgerRecord,
    pub dependencies: Vec<DependencyEdge>,
    /// Other active records on the same target within the proximity window.
    pub related: Vec<LedgerRecord>,
}

/// Assemble the timeline of `target_item`, oldest first.
///
/// # Errors
///
/// Returns [`LedgerError::TargetNotFound`] when the target has no records at
/// all. A target whose records are all voided yields an empty timeline.
pub fn timeline(
    conn: &Connection,
    target_item: &str,
    config: &TimelineConfig,
) -> Result<Vec<TimelineEvent>> {
    let target_item = target_item.trim();
    if target_item.is_empty() {
        return Err(LedgerError::validation("target_item is required"));
    }

    let tx = conn.unchecked_transaction()?;
    let records = records_for_target(&tx, target_item)?;
    if records.is_empty() {
        let any: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM actions WHERE target_item = ?1)",
            params![target_item],
            |row| row.get(0),
        )?;
        tx.finish()?;
        return if any {
            Ok(Vec::new())
        } else {
            Err(LedgerError::TargetNotFound(target_item.to_string()))
        };
    }
    let mut edges = dependency_edges(&tx, target_item)?;
    tx.finish()?;

    let window_us = config.related_window_us();
    let related = related_windows(&records, window_us, config.related_limit);
    debug!(target_item, events = records.len(), "assembled timeline");

    Ok(records
        .iter()
        .zip(related)
        .map(|(record, related)| TimelineEvent {
            dependencies: edges.remove(&record.id).unwrap_or_default(),
            related: related.into_iter().map(|idx| records[idx].clone()).collect(),
            record: record.clone(),
        })
        .collect())
}

/// Outgoing edges of every active record on `target_item`, keyed by source.
fn dependency_edges(
    conn: &Connection,
    target_item: &str,
) -> Result<HashMap<String, Vec<DependencyEdge>>> {
    let sql = format!(
        "SELECT {DEPENDENCY_COLUMNS}, {RECORD_COLUMNS} \
         FROM action_dependencies d \
         JOIN actions s ON s.action_id = d.source_action_id \
         JOIN actions a ON a.action_id = d.target_action_id \
         WHERE s.target_item = ?1 AND s.is_voided = 0 \
         ORDER BY d.created_at_us ASC, d.target_action_id ASC, d.dependency_type ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![target_item], |row| {
        Ok(DependencyEdge {
            dependency: row_to_dependency(row)?,
            target: row_to_record_at(row, 5)?,
        })
    })?;

    let mut by_source: HashMap<String, Vec<DependencyEdge>> = HashMap::new();
    for edge in rows {
        let edge = edge?;
        by_source
            .entry(edge.dependency.source_id.clone())
            .or_default()
            .push(edge);
    }
    Ok(by_source)
}

/// For each record, indices of the others with `|dt| < window_us`, earliest
/// first, at most `limit`. `records` must be sorted by creation time.
fn related_windows(records: &[LedgerRecord], window_us: i64, limit: usize) -> Vec<Vec<usize>> {
    if window_us <= 0 || limit == 0 {
        return vec![Vec::new(); records.len()];
    }
    let mut lo = 0;
    records
        .iter()
        .enumerate()
        .map(|(idx, anchor)| {
            while anchor.created_at_us.saturating_sub(records[lo].created_at_us) >= window_us {
                lo += 1;
            }
            records
                .iter()
                .enumerate()
                .skip(lo)
                .take_while(|(_, other)| {
                    other.created_at_us.saturating_sub(anchor.created_at_us) < window_us
                })
                .filter(|(other_idx, _)| *other_idx != idx)
                .map(|(other_idx, _)| other_idx)
                .take(limit)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::clock::ManualClock;
    use crate::config::AppendConfig;
    use crate::db::open_in_memory;
    use crate::ledger::append::{append, append_with_clock};
    use crate::ledger::link::link;
    use crate::ledger::void::void_record;
    use crate::model::{DependencyKind, NewRecord};

    fn at(ts: i64) -> LedgerRecord {
        LedgerRecord {
            id: format!("act-{ts:016x}"),
            seq: ts,
            hash: String::new(),
            prev_hash: None,
            created_at_us: ts,
            actor: "a".into(),
            action_type: "t".into(),
            target_item: "x".into(),
            target_type: "y".into(),
            department: "d".into(),
            description: None,
            pre_state: None,
            post_state: None,
            context_tags: serde_json::Map::new(),
            metadata: serde_json::Map::new(),
            process_blueprint_id: None,
            parent_action_id: None,
            step_id: None,
            is_voided: false,
            void_reason: None,
            voided_by: None,
            voided_at_us: None,
        }
    }

    #[test]
    fn window_is_strict_and_excludes_anchor() {
        let records: Vec<_> = [0, 5, 10, 20].into_iter().map(at).collect();
        let windows = related_windows(&records, 10, 5);
        assert_eq!(windows[0], vec![1]);
        assert_eq!(windows[1], vec![0, 2]);
        assert_eq!(windows[2], vec![1]);
        assert_eq!(windows[3], Vec::<usize>::new());
    }

    #[test]
    fn window_caps_at_limit_earliest_first() {
        let records: Vec<_> = (0..8).map(at).collect();
        let windows = related_windows(&records, 100, 3);
        assert_eq!(windows[0], vec![1, 2, 3]);
        assert_eq!(windows[5], vec![0, 1, 2]);
    }

    #[test]
    fn dependencies_carry_target_record() {
        let mut conn = open_in_memory().expect("db");
        let alice = Actor::new("alice").expect("actor");
        let clock = ManualClock::new(1_000_000);
        let cfg = AppendConfig::default();

        let a = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("submit", "PO-1", "po", "finance"),
            &cfg,
            &clock,
        )
        .expect("a");
        let other = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("file", "RPT-1", "report", "ops"),
            &cfg,
            &clock,
        )
        .expect("other");
        let b = append_with_clock(
            &mut conn,
            &alice,
            &NewRecord::new("approve", "PO-1", "po", "finance"),
            &cfg,
            &clock,
        )
        .expect("b");
        link(&conn, &alice, &b.id, &a.id, DependencyKind::Blocks).expect("link");
        link(&conn, &alice, &b.id, &other.id, DependencyKind::RelatesTo).expect("link");

        let events = timeline(&conn, "PO-1", &TimelineConfig::default()).expect("timeline");
        assert_eq!(events.len(), 2);
        assert!(events[0].dependencies.is_empty());
        let deps = &events[1].dependencies;
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|e| e.target.id == other.id && e.target.target_item == "RPT-1"));
    }

    #[test]
    fn unknown_target_vs_all_voided() {
        let mut conn = open_in_memory().expect("db");
        let alice = Actor::new("alice").expect("actor");
        assert!(matches!(
            timeline(&conn, "PO-404", &TimelineConfig::default()),
            Err(LedgerError::TargetNotFound(_))
        ));

        let rec = append(
            &mut conn,
            &alice,
            &NewRecord::new("submit", "PO-5", "po", "finance"),
            &AppendConfig::default(),
        )
        .expect("append");
        void_record(&conn, &alice, &rec.id, "mistake").expect("void");
        let events = timeline(&conn, "PO-5", &TimelineConfig::default()).expect("timeline");
        assert!(events.is_empty());
    }
}
