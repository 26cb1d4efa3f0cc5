//! Whole-chain verification.
//!
//! Streams every stored record in `seq` order and checks, for each one:
//!
//! 1. **Hash integrity**: the stored `hash` matches the digest recomputed
//!    from the stored content, `actor`, `created_at_us` and `prev_hash`.
//! 2. **Linkage**: `prev_hash` equals the previous record's stored hash
//!    (absent for the first record).
//! 3. **Ordering**: `seq` has no gaps and `created_at_us` never decreases.
//! 4. **Identity**: the id is derived from the stored hash.
//! 5. **Decoding**: every column reads back as its stored type. A row that
//!    does not decode is reported and its stored hash still anchors the
//!    next link.
//!
//! Unlike append-time checks, verification never stops at the first
//! problem; every break is reported. Void columns are not hashed, so voided
//! records verify like any other.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::rows::{RECORD_COLUMNS, row_to_record};
use crate::error::Result;
use crate::model::LedgerRecord;

use super::hash::{recompute_hash, record_id_for};

/// One integrity problem found at a chain position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainBreak {
    /// Stored hash differs from the recomputed digest.
    HashMismatch {
        seq: i64,
        stored: String,
        expected: String,
    },
    /// `prev_hash` does not point at the preceding record.
    BrokenLink {
        seq: i64,
        expected_prev: Option<String>,
        found_prev: Option<String>,
    },
    /// Chain positions skip from `previous` to `seq`.
    SequenceGap { seq: i64, previous: i64 },
    /// Creation time moved backwards.
    TimeRegression {
        seq: i64,
        previous_us: i64,
        found_us: i64,
    },
    /// The record id is not derived from its hash.
    IdMismatch {
        seq: i64,
        stored: String,
        expected: String,
    },
    /// A stored column no longer decodes, so the digest cannot be recomputed.
    CorruptRow { seq: i64, column: String },
}

impl ChainBreak {
    #[must_use]
    pub const fn seq(&self) -> i64 {
        match self {
            Self::HashMismatch { seq, .. }
            | Self::BrokenLink { seq, .. }
            | Self::SequenceGap { seq, .. }
            | Self::TimeRegression { seq, .. }
            | Self::IdMismatch { seq, .. }
            | Self::CorruptRow { seq, .. } => *seq,
        }
    }
}

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub records_checked: u64,
    /// Stored hash of the last record, if any.
    pub tail_hash: Option<String>,
    pub breaks: Vec<ChainBreak>,
}

impl ChainReport {
    /// `true` when no break was found.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.breaks.is_empty()
    }
}

/// Verify every record of the ledger.
///
/// The scan reads one consistent snapshot, so concurrent appends land either
/// wholly inside or wholly outside the report.
///
/// # Errors
///
/// Returns an error if the scan fails or a row's `seq` or `hash` is unreadable.
pub fn verify_chain(conn: &Connection) -> Result<ChainReport> {
    let tx = conn.unchecked_transaction()?;
    let sql = format!("SELECT {RECORD_COLUMNS} FROM actions a ORDER BY a.seq ASC");

    let mut report = ChainReport {
        records_checked: 0,
        tail_hash: None,
        breaks: Vec::new(),
    };
    let mut previous: Option<(i64, String, i64)> = None;

    {
        let mut stmt = tx.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get(1)?;
            let stored_hash: String = row.get(2)?;
            let prev_hash = row.get::<_, Option<String>>(3);
            let created_at_us = row.get::<_, i64>(4);

            match row_to_record(row) {
                Ok(record) => check_content(&record, &mut report.breaks),
                Err(error) => {
                    let column = undecodable_column(&error).ok_or(error)?;
                    report.breaks.push(ChainBreak::CorruptRow { seq, column });
                }
            }

            let expected_prev = previous.as_ref().map(|(_, hash, _)| hash.clone());
            if let Ok(found_prev) = prev_hash {
                if found_prev != expected_prev {
                    report.breaks.push(ChainBreak::BrokenLink {
                        seq,
                        expected_prev,
                        found_prev,
                    });
                }
            }

            let previous_seq = previous.as_ref().map_or(0, |(prev_seq, _, _)| *prev_seq);
            if seq != previous_seq + 1 {
                report.breaks.push(ChainBreak::SequenceGap {
                    seq,
                    previous: previous_seq,
                });
            }

            let previous_us = previous.as_ref().map(|(_, _, us)| *us);
            if let (Some(previous_us), Ok(found_us)) = (previous_us, &created_at_us) {
                if *found_us < previous_us {
                    report.breaks.push(ChainBreak::TimeRegression {
                        seq,
                        previous_us,
                        found_us: *found_us,
                    });
                }
            }

            report.records_checked += 1;
            let anchor_us = created_at_us.ok().or(previous_us).unwrap_or(i64::MIN);
            previous = Some((seq, stored_hash, anchor_us));
        }
    }
    tx.finish()?;

    report.tail_hash = previous.map(|(_, hash, _)| hash);
    for chain_break in &report.breaks {
        warn!(seq = chain_break.seq(), ?chain_break, "ledger chain break");
    }
    debug!(
        records = report.records_checked,
        breaks = report.breaks.len(),
        "verified ledger chain"
    );
    Ok(report)
}

/// Hash and identity checks for a decoded record.
fn check_content(record: &LedgerRecord, breaks: &mut Vec<ChainBreak>) {
    let expected = recompute_hash(record);
    if expected != record.hash {
        breaks.push(ChainBreak::HashMismatch {
            seq: record.seq,
            stored: record.hash.clone(),
            expected,
        });
    }

    let expected_id = record_id_for(&record.hash);
    if expected_id != record.id {
        breaks.push(ChainBreak::IdMismatch {
            seq: record.seq,
            stored: record.id.clone(),
            expected: expected_id,
        });
    }
}

/// Column name behind a decode failure; `None` for errors that are not about
/// stored values.
fn undecodable_column(error: &rusqlite::Error) -> Option<String> {
    let idx = match error {
        rusqlite::Error::InvalidColumnType(_, name, _) => return Some(name.clone()),
        rusqlite::Error::FromSqlConversionFailure(idx, ..)
        | rusqlite::Error::IntegralValueOutOfRange(idx, _) => *idx,
        _ => return None,
    };
    RECORD_COLUMNS
        .split(',')
        .nth(idx)
        .map(|column| column.trim().trim_start_matches("a.").to_string())
}
