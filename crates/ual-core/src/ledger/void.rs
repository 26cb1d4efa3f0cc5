//! The single permitted mutation: marking a record voided.
//!
//! Voiding never touches hashed columns, so chain verification is unaffected.

use rusqlite::{Connection, params};
use tracing::info;

use crate::actor::Actor;
use crate::clock::{Clock, SystemClock};
use crate::db::rows;
use crate::error::{LedgerError, Result};
use crate::model::LedgerRecord;

/// Void `id` with the system clock.
///
/// # Errors
///
/// See [`void_record_with_clock`].
pub fn void_record(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    reason: &str,
) -> Result<LedgerRecord> {
    void_record_with_clock(conn, actor, id, reason, &SystemClock)
}

/// Mark `id` voided with an audit reason.
///
/// The update is conditional on `is_voided = 0`, so among concurrent voids
/// of one record exactly one succeeds.
///
/// # Errors
///
/// - [`LedgerError::Validation`] for a blank reason
/// - [`LedgerError::RecordNotFound`] for unknown or malformed ids
/// - [`LedgerError::AlreadyVoided`] when the record was voided earlier
pub fn void_record_with_clock(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    reason: &str,
    clock: &dyn Clock,
) -> Result<LedgerRecord> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::validation("void reason is required"));
    }

    let updated = conn.execute(
        "UPDATE actions
         SET is_voided = 1, void_reason = ?2, voided_by = ?3, voided_at_us = ?4
         WHERE action_id = ?1 AND is_voided = 0",
        params![id, reason, actor.as_str(), clock.now_us()],
    )?;

    let record = rows::fetch_record(conn, id)?;
    match (updated, record) {
        (_, None) => Err(LedgerError::RecordNotFound(id.to_string())),
        (0, Some(_)) => Err(LedgerError::AlreadyVoided(id.to_string())),
        (_, Some(record)) => {
            info!(id = %record.id, actor = %actor, reason, "voided ledger record");
            Ok(record)
        }
    }
}
