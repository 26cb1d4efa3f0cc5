//! Ledger append: read the chain tail, hash, and insert as one atomic unit.
//!
//! Every attempt runs inside `BEGIN IMMEDIATE`, which takes SQLite's
//! RESERVED lock before the tail is read. All writers on the database file
//! (any connection, any process) therefore serialize on the tail read. The
//! unique `prev_hash` index rejects a fork even if that ever fails.
//!
//! A busy lock or a uniqueness violation is a retryable conflict. Any other
//! failure drops the transaction, rolling the attempt back.

use rusqlite::{Connection, ErrorCode as SqliteCode, OptionalExtension, TransactionBehavior, params};
use serde_json::Value;
use std::thread;
use tracing::{debug, info, warn};

use crate::actor::Actor;
use crate::chain::canonical::canonicalize_json;
use crate::chain::hash::{compute_record_hash, record_id_for};
use crate::clock::{Clock, SystemClock};
use crate::config::AppendConfig;
use crate::db::rows;
use crate::error::{LedgerError, Result};
use crate::model::record::{LedgerRecord, NewRecord};
use crate::process::blueprint::fetch_blueprint;

/// The most recently appended record, as seen inside a write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTail {
    pub seq: i64,
    pub hash: String,
    pub created_at_us: i64,
}

/// Read the current chain tail.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn chain_tail(conn: &Connection) -> Result<Option<ChainTail>> {
    let tail = conn
        .query_row(
            "SELECT seq, hash, created_at_us FROM actions ORDER BY seq DESC LIMIT 1",
            [],
            |row| {
                Ok(ChainTail {
                    seq: row.get(0)?,
                    hash: row.get(1)?,
                    created_at_us: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(tail)
}

/// Append a record stamped with the system clock.
///
/// # Errors
///
/// See [`append_with_clock`].
pub fn append(
    conn: &mut Connection,
    actor: &Actor,
    record: &NewRecord,
    config: &AppendConfig,
) -> Result<LedgerRecord> {
    append_with_clock(conn, actor, record, config, &SystemClock)
}

/// Append a record, retrying conflicts up to `config.max_retries` times.
///
/// # Errors
///
/// - [`LedgerError::Validation`] for missing classification fields or
///   unknown parent/blueprint/step references
/// - [`LedgerError::Conflict`] when retries are exhausted
/// - [`LedgerError::Storage`] for any other database failure (nothing is
///   committed)
pub fn append_with_clock(
    conn: &mut Connection,
    actor: &Actor,
    record: &NewRecord,
    config: &AppendConfig,
    clock: &dyn Clock,
) -> Result<LedgerRecord> {
    let content = record.normalized()?;
    let mut attempt = 0_u32;

    loop {
        match try_append(conn, actor, &content, clock) {
            Ok(appended) => {
                info!(
                    id = %appended.id,
                    seq = appended.seq,
                    hash = %appended.hash,
                    actor = %actor,
                    target_item = %appended.target_item,
                    "appended ledger record"
                );
                return Ok(appended);
            }
            Err(error) if error.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(attempt, %error, "append conflict; retrying");
                thread::sleep(config.backoff(attempt));
            }
            Err(error) => return Err(error),
        }
    }
}

fn try_append(
    conn: &mut Connection,
    actor: &Actor,
    content: &NewRecord,
    clock: &dyn Clock,
) -> Result<LedgerRecord> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(classify_write_error)?;

    validate_references(&tx, content)?;

    let tail = chain_tail(&tx)?;
    let now = clock.now_us();
    let (seq, prev_hash, created_at_us) = match tail {
        Some(tail) => (tail.seq + 1, Some(tail.hash), now.max(tail.created_at_us)),
        None => (1, None, now),
    };
    debug!(seq, prev_hash = ?prev_hash, "read chain tail");

    let hash = compute_record_hash(content, actor.as_str(), created_at_us, prev_hash.as_deref());
    let id = record_id_for(&hash);
    let tags_json = canonicalize_json(&Value::Object(content.context_tags.clone()));
    let metadata_json = canonicalize_json(&Value::Object(content.metadata.clone()));

    tx.execute(
        "INSERT INTO actions (
            seq, action_id, hash, prev_hash, created_at_us, actor,
            action_type, target_item, target_type, department, description,
            pre_state, post_state, context_tags_json, metadata_json,
            process_blueprint_id, parent_action_id, step_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            seq,
            id,
            hash,
            prev_hash,
            created_at_us,
            actor.as_str(),
            content.action_type,
            content.target_item,
            content.target_type,
            content.department,
            content.description,
            content.pre_state,
            content.post_state,
            tags_json,
            metadata_json,
            content.process_blueprint_id,
            content.parent_action_id,
            content.step_id,
        ],
    )
    .map_err(classify_write_error)?;

    tx.commit().map_err(classify_write_error)?;

    Ok(LedgerRecord {
        id,
        seq,
        hash,
        prev_hash,
        created_at_us,
        actor: actor.as_str().to_string(),
        action_type: content.action_type.clone(),
        target_item: content.target_item.clone(),
        target_type: content.target_type.clone(),
        department: content.department.clone(),
        description: content.description.clone(),
        pre_state: content.pre_state.clone(),
        post_state: content.post_state.clone(),
        context_tags: content.context_tags.clone(),
        metadata: content.metadata.clone(),
        process_blueprint_id: content.process_blueprint_id.clone(),
        parent_action_id: content.parent_action_id.clone(),
        step_id: content.step_id.clone(),
        is_voided: false,
        void_reason: None,
        voided_by: None,
        voided_at_us: None,
    })
}

fn validate_references(conn: &Connection, content: &NewRecord) -> Result<()> {
    if let Some(parent) = content.parent_action_id.as_deref() {
        if !rows::record_exists(conn, parent)? {
            return Err(LedgerError::validation(format!(
                "parent_action_id '{parent}' does not exist"
            )));
        }
    }

    if let Some(blueprint_id) = content.process_blueprint_id.as_deref() {
        let Some(blueprint) = fetch_blueprint(conn, blueprint_id)? else {
            return Err(LedgerError::validation(format!(
                "process_blueprint_id '{blueprint_id}' does not exist"
            )));
        };
        if let Some(step_id) = content.step_id.as_deref() {
            if blueprint.step(step_id).is_none() {
                return Err(LedgerError::validation(format!(
                    "step_id '{step_id}' is not a step of blueprint '{blueprint_id}'"
                )));
            }
        }
    }

    Ok(())
}

/// Map write failures: lock contention and uniqueness violations mean the
/// chain tail moved under us; everything else is a storage failure.
fn classify_write_error(error: rusqlite::Error) -> LedgerError {
    match error.sqlite_error() {
        Some(err) if matches!(err.code, SqliteCode::DatabaseBusy | SqliteCode::DatabaseLocked) => {
            LedgerError::chain_conflict(format!("ledger is busy: {error}"))
        }
        Some(err)
            if err.code == SqliteCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                ) =>
        {
            LedgerError::chain_conflict(format!("chain tail moved: {error}"))
        }
        _ => LedgerError::Storage(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::hash::verify_record_hash;
    use crate::clock::ManualClock;
    use crate::db::open_in_memory;

    fn actor() -> Actor {
        Actor::new("alice").expect("actor")
    }

    fn po(target: &str) -> NewRecord {
        NewRecord::new("approve", target, "purchase_order", "finance")
    }

    #[test]
    fn first_record_has_no_prev_hash() {
        let mut conn = open_in_memory().expect("db");
        let clock = ManualClock::new(1_000);
        let rec = append_with_clock(&mut conn, &actor(), &po("PO-1"), &AppendConfig::default(), &clock)
            .expect("append");

        assert_eq!(rec.seq, 1);
        assert_eq!(rec.prev_hash, None);
        assert_eq!(rec.created_at_us, 1_000);
        assert!(verify_record_hash(&rec));
        assert_eq!(rec.id, record_id_for(&rec.hash));
    }

    #[test]
    fn records_link_to_predecessor() {
        let mut conn = open_in_memory().expect("db");
        let clock = ManualClock::new(1_000);
        let cfg = AppendConfig::default();
        let a = append_with_clock(&mut conn, &actor(), &po("PO-1"), &cfg, &clock).expect("a");
        clock.advance_secs(1);
        let b = append_with_clock(&mut conn, &actor(), &po("PO-2"), &cfg, &clock).expect("b");

        assert_eq!(b.seq, 2);
        assert_eq!(b.prev_hash.as_deref(), Some(a.hash.as_str()));
        assert_eq!(chain_tail(&conn).expect("tail").map(|t| t.hash), Some(b.hash));
    }

    #[test]
    fn timestamps_never_regress() {
        let mut conn = open_in_memory().expect("db");
        let clock = ManualClock::new(50_000);
        let cfg = AppendConfig::default();
        let a = append_with_clock(&mut conn, &actor(), &po("PO-1"), &cfg, &clock).expect("a");
        clock.set(10);
        let b = append_with_clock(&mut conn, &actor(), &po("PO-1"), &cfg, &clock).expect("b");
        assert_eq!(b.created_at_us, a.created_at_us);
        assert_ne!(a.hash, b.hash, "prev_hash keeps identical payloads distinct");
    }

    #[test]
    fn stored_row_matches_returned_record() {
        let mut conn = open_in_memory().expect("db");
        let rec = append(
            &mut conn,
            &actor(),
            &po("PO-7").tag("b", 2).tag("a", 1).meta("amount", 10.25),
            &AppendConfig::default(),
        )
        .expect("append");

        let stored = rows::fetch_record(&conn, &rec.id).expect("query").expect("row");
        assert_eq!(stored, rec);
        assert!(verify_record_hash(&stored));
    }

    #[test]
    fn validation_errors_write_nothing() {
        let mut conn = open_in_memory().expect("db");
        let cfg = AppendConfig::default();

        let err = append(&mut conn, &actor(), &NewRecord::new("approve", "PO-1", "", "finance"), &cfg)
            .expect_err("missing target_type");
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = append(&mut conn, &actor(), &po("PO-1").parent("act-00000000000000ff"), &cfg)
            .expect_err("unknown parent");
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = append(&mut conn, &actor(), &po("PO-1").blueprint("bp-missing", None), &cfg)
            .expect_err("unknown blueprint");
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(chain_tail(&conn).expect("tail"), None);
    }

    #[test]
    fn parent_reference_accepted_when_present() {
        let mut conn = open_in_memory().expect("db");
        let cfg = AppendConfig::default();
        let parent = append(&mut conn, &actor(), &po("PO-1"), &cfg).expect("parent");
        let child = append(&mut conn, &actor(), &po("PO-1").parent(parent.id.clone()), &cfg)
            .expect("child");
        assert_eq!(child.parent_action_id.as_deref(), Some(parent.id.as_str()));
    }

    #[test]
    fn busy_and_unique_errors_are_conflicts() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(classify_write_error(busy).is_retryable());

        let unique = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed".into()),
        );
        assert!(classify_write_error(unique).is_retryable());

        let fk = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            None,
        );
        assert!(matches!(classify_write_error(fk), LedgerError::Storage(_)));
    }
}
