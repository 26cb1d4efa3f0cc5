//! Row mapping between `SQLite` and the ledger model types.

use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde_json::Value;

use crate::error::Result;
use crate::model::{ActionDependency, Annotations, Blueprint, BlueprintStep, DependencyKind};
use crate::model::record::{LedgerRecord, is_record_id};

/// Column list matching [`row_to_record`], prefixed with table alias `a`.
pub const RECORD_COLUMNS: &str = "a.action_id, a.seq, a.hash, a.prev_hash, a.created_at_us, \
     a.actor, a.action_type, a.target_item, a.target_type, a.department, a.description, \
     a.pre_state, a.post_state, a.context_tags_json, a.metadata_json, \
     a.process_blueprint_id, a.parent_action_id, a.step_id, a.is_voided, \
     a.void_reason, a.voided_by, a.voided_at_us";

/// Map a row selected with [`RECORD_COLUMNS`].
///
/// # Errors
///
/// Fails when a column has the wrong type or a JSON column does not decode
/// to an object.
pub fn row_to_record(row: &Row<'_>) -> rusqlite::Result<LedgerRecord> {
    row_to_record_at(row, 0)
}

/// Map [`RECORD_COLUMNS`] starting at column `base` (for joined selects).
///
/// # Errors
///
/// Same as [`row_to_record`].
pub fn row_to_record_at(row: &Row<'_>, base: usize) -> rusqlite::Result<LedgerRecord> {
    Ok(LedgerRecord {
        id: row.get(base)?,
        seq: row.get(base + 1)?,
        hash: row.get(base + 2)?,
        prev_hash: row.get(base + 3)?,
        created_at_us: row.get(base + 4)?,
        actor: row.get(base + 5)?,
        action_type: row.get(base + 6)?,
        target_item: row.get(base + 7)?,
        target_type: row.get(base + 8)?,
        department: row.get(base + 9)?,
        description: row.get(base + 10)?,
        pre_state: row.get(base + 11)?,
        post_state: row.get(base + 12)?,
        context_tags: json_object(row, base + 13)?,
        metadata: json_object(row, base + 14)?,
        process_blueprint_id: row.get(base + 15)?,
        parent_action_id: row.get(base + 16)?,
        step_id: row.get(base + 17)?,
        is_voided: row.get(base + 18)?,
        void_reason: row.get(base + 19)?,
        voided_by: row.get(base + 20)?,
        voided_at_us: row.get(base + 21)?,
    })
}

fn json_object(row: &Row<'_>, idx: usize) -> rusqlite::Result<Annotations> {
    let raw: String = row.get(idx)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            "expected a JSON object".into(),
        )),
        Err(error) => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(error),
        )),
    }
}

/// Fetch one record by id, voided or not. Malformed ids resolve to `None`
/// without touching the database.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn fetch_record(conn: &Connection, id: &str) -> Result<Option<LedgerRecord>> {
    if !is_record_id(id) {
        return Ok(None);
    }
    let sql = format!("SELECT {RECORD_COLUMNS} FROM actions a WHERE a.action_id = ?1");
    let record = conn
        .query_row(&sql, params![id], row_to_record)
        .optional()?;
    Ok(record)
}

/// `true` when a record with this id exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn record_exists(conn: &Connection, id: &str) -> Result<bool> {
    if !is_record_id(id) {
        return Ok(false);
    }
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM actions WHERE action_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub(crate) const DEPENDENCY_COLUMNS: &str =
    "d.source_action_id, d.target_action_id, d.dependency_type, d.created_by, d.created_at_us";

pub(crate) fn row_to_dependency(row: &Row<'_>) -> rusqlite::Result<ActionDependency> {
    let kind_raw: String = row.get(2)?;
    let kind = kind_raw.parse::<DependencyKind>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error))
    })?;
    Ok(ActionDependency {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        kind,
        created_by: row.get(3)?,
        created_at_us: row.get(4)?,
    })
}

pub(crate) const BLUEPRINT_COLUMNS: &str =
    "blueprint_id, name, description, department, steps_json, created_by, created_at_us";

pub(crate) fn row_to_blueprint(row: &Row<'_>) -> rusqlite::Result<Blueprint> {
    let steps_raw: String = row.get(4)?;
    let steps: Vec<BlueprintStep> = serde_json::from_str(&steps_raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
    })?;
    Ok(Blueprint {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        department: row.get(3)?,
        steps,
        created_by: row.get(5)?,
        created_at_us: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn insert_raw(conn: &Connection, tags_json: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO actions (
                seq, action_id, hash, prev_hash, created_at_us, actor,
                action_type, target_item, target_type, department, context_tags_json
             ) VALUES (1, 'act-00000000000000aa', 'sha256:aa', NULL, 7, 'alice',
                       'submit', 'PO-1', 'purchase_order', 'finance', ?1)",
            params![tags_json],
        )
    }

    #[test]
    fn fetch_round_trips_columns() {
        let conn = open_in_memory().expect("db");
        insert_raw(&conn, r#"{"priority":"high"}"#).expect("insert");

        let record = fetch_record(&conn, "act-00000000000000aa")
            .expect("query")
            .expect("present");
        assert_eq!(record.seq, 1);
        assert_eq!(record.prev_hash, None);
        assert_eq!(record.context_tags["priority"], "high");
        assert!(record.metadata.is_empty());
        assert!(!record.is_voided);
    }

    #[test]
    fn malformed_ids_are_absent() {
        let conn = open_in_memory().expect("db");
        assert!(fetch_record(&conn, "PO-1").expect("query").is_none());
        assert!(!record_exists(&conn, "act-xyz").expect("query"));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let conn = open_in_memory().expect("db");
        insert_raw(&conn, "[1,2]").expect("insert");
        assert!(fetch_record(&conn, "act-00000000000000aa").is_err());
    }
}
