//! Typed dependency edges between records.

use rusqlite::{Connection, params};
use tracing::info;

use crate::actor::Actor;
use crate::clock::{Clock, SystemClock};
use crate::db::rows::{self, DEPENDENCY_COLUMNS, row_to_dependency};
use crate::error::{ErrorCode, LedgerError, Result};
use crate::model::{ActionDependency, DependencyKind};

/// Record `source -> target` of the given kind.
///
/// # Errors
///
/// - [`LedgerError::Validation`] for a self-edge
/// - [`LedgerError::RecordNotFound`] when either end does not exist
/// - [`LedgerError::Conflict`] when the same edge already exists
pub fn link(
    conn: &Connection,
    actor: &Actor,
    source_id: &str,
    target_id: &str,
    kind: DependencyKind,
) -> Result<ActionDependency> {
    link_with_clock(conn, actor, source_id, target_id, kind, &SystemClock)
}

/// [`link`] with an explicit clock.
///
/// # Errors
///
/// See [`link`].
pub fn link_with_clock(
    conn: &Connection,
    actor: &Actor,
    source_id: &str,
    target_id: &str,
    kind: DependencyKind,
    clock: &dyn Clock,
) -> Result<ActionDependency> {
    let source_id = source_id.trim();
    let target_id = target_id.trim();
    if source_id == target_id {
        return Err(LedgerError::validation(
            "a record cannot depend on itself",
        ));
    }

    let tx = conn.unchecked_transaction()?;
    for id in [source_id, target_id] {
        if !rows::record_exists(&tx, id)? {
            return Err(LedgerError::RecordNotFound(id.to_string()));
        }
    }

    let edge = ActionDependency {
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        kind,
        created_by: actor.as_str().to_string(),
        created_at_us: clock.now_us(),
    };
    let inserted = tx.execute(
        "INSERT INTO action_dependencies (
            source_action_id, target_action_id, dependency_type, created_by, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (source_action_id, target_action_id, dependency_type) DO NOTHING",
        params![
            edge.source_id,
            edge.target_id,
            edge.kind.as_str(),
            edge.created_by,
            edge.created_at_us,
        ],
    )?;
    if inserted == 0 {
        return Err(LedgerError::Conflict {
            code: ErrorCode::DuplicateDependency,
            message: format!("{source_id} already {kind} {target_id}"),
        });
    }
    tx.commit()?;

    info!(source = %edge.source_id, target = %edge.target_id, kind = %edge.kind, actor = %actor, "linked records");
    Ok(edge)
}

/// Outgoing edges of `source_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn dependencies_of(conn: &Connection, source_id: &str) -> Result<Vec<ActionDependency>> {
    let sql = format!(
        "SELECT {DEPENDENCY_COLUMNS} FROM action_dependencies d \
         WHERE d.source_action_id = ?1 \
         ORDER BY d.created_at_us ASC, d.target_action_id ASC, d.dependency_type ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![source_id], row_to_dependency)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppendConfig;
    use crate::db::open_in_memory;
    use crate::ledger::append::append;
    use crate::model::NewRecord;

    fn two_records(conn: &mut Connection) -> (String, String) {
        let actor = Actor::new("alice").expect("actor");
        let cfg = AppendConfig::default();
        let a = append(conn, &actor, &NewRecord::new("submit", "PO-1", "po", "finance"), &cfg)
            .expect("a");
        let b = append(conn, &actor, &NewRecord::new("approve", "PO-1", "po", "finance"), &cfg)
            .expect("b");
        (a.id, b.id)
    }

    #[test]
    fn link_and_list() {
        let mut conn = open_in_memory().expect("db");
        let (a, b) = two_records(&mut conn);
        let actor = Actor::new("bob").expect("actor");

        let edge = link(&conn, &actor, &b, &a, DependencyKind::Blocks).expect("link");
        assert_eq!(edge.created_by, "bob");
        link(&conn, &actor, &b, &a, DependencyKind::RelatesTo).expect("second kind");

        let deps = dependencies_of(&conn, &b).expect("deps");
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.target_id == a));
        assert!(dependencies_of(&conn, &a).expect("deps").is_empty());
    }

    #[test]
    fn rejects_self_duplicate_and_missing() {
        let mut conn = open_in_memory().expect("db");
        let (a, b) = two_records(&mut conn);
        let actor = Actor::new("bob").expect("actor");

        assert!(matches!(
            link(&conn, &actor, &a, &a, DependencyKind::Triggers),
            Err(LedgerError::Validation(_))
        ));

        link(&conn, &actor, &a, &b, DependencyKind::Triggers).expect("first");
        let dup = link(&conn, &actor, &a, &b, DependencyKind::Triggers).expect_err("dup");
        assert_eq!(dup.code(), ErrorCode::DuplicateDependency);
        assert_eq!(dup.http_status(), 409);

        assert!(matches!(
            link(&conn, &actor, &a, "act-ffffffffffffffff", DependencyKind::Blocks),
            Err(LedgerError::RecordNotFound(_))
        ));
    }
}
