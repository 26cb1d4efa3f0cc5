//! Tamper evidence: canonical encoding, record hashing, chain verification.
//!
//! - [`canonical`] renders JSON with sorted keys so digests are stable
//! - [`hash`] derives `sha256:<hex>` record hashes and `act-` ids
//! - [`verify`] walks the stored chain and reports every break

pub mod canonical;
pub mod hash;
pub mod verify;

pub use hash::{compute_record_hash, record_id_for, verify_record_hash};
pub use verify::{ChainBreak, ChainReport, verify_chain};
