//! Record digests for the hash chain.
//!
//! - The digest covers the record content, the attributed actor, the
//!   store-assigned timestamp and the predecessor's hash.
//! - Void fields are excluded, so voiding never changes a record's hash.
//! - Hash format: `sha256:<64 lowercase hex>`.
//! - Record ids reuse the first 16 hex chars of the digest (`act-<hex>`).

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::chain::canonical::canonicalize_json;
use crate::model::record::{LedgerRecord, NewRecord, RECORD_ID_HEX_LEN, RECORD_ID_PREFIX};

pub const HASH_PREFIX: &str = "sha256:";

/// Build the canonical hashed payload for a record.
#[must_use]
pub fn hashed_payload(
    content: &NewRecord,
    actor: &str,
    created_at_us: i64,
    prev_hash: Option<&str>,
) -> Value {
    json!({
        "action_type": content.action_type,
        "actor": actor,
        "context_tags": content.context_tags,
        "created_at_us": created_at_us,
        "department": content.department,
        "description": content.description,
        "metadata": content.metadata,
        "parent_action_id": content.parent_action_id,
        "post_state": content.post_state,
        "pre_state": content.pre_state,
        "prev_hash": prev_hash,
        "process_blueprint_id": content.process_blueprint_id,
        "step_id": content.step_id,
        "target_item": content.target_item,
        "target_type": content.target_type,
    })
}

/// Compute the chain hash for a new record.
#[must_use]
pub fn compute_record_hash(
    content: &NewRecord,
    actor: &str,
    created_at_us: i64,
    prev_hash: Option<&str>,
) -> String {
    let canonical = canonicalize_json(&hashed_payload(content, actor, created_at_us, prev_hash));
    format!("{HASH_PREFIX}{}", sha256_hex(canonical.as_bytes()))
}

/// Lowercase hex SHA-256 of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Recompute a stored record's hash from its stored fields.
#[must_use]
pub fn recompute_hash(record: &LedgerRecord) -> String {
    compute_record_hash(
        &record.hashed_content(),
        &record.actor,
        record.created_at_us,
        record.prev_hash.as_deref(),
    )
}

/// `true` when the stored hash matches the recomputed one.
#[must_use]
pub fn verify_record_hash(record: &LedgerRecord) -> bool {
    recompute_hash(record) == record.hash
}

/// Derive the record id from its hash.
#[must_use]
pub fn record_id_for(hash: &str) -> String {
    let hex = hash.strip_prefix(HASH_PREFIX).unwrap_or(hash);
    let short: String = hex.chars().take(RECORD_ID_HEX_LEN).collect();
    format!("{RECORD_ID_PREFIX}{short}")
}
