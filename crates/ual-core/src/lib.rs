//! ual-core library.
//!
//! A hash-chained, append-only ledger of actions taken against business
//! items, stored in `SQLite`.
//!
//! - [`ledger`]: append, read, timeline, void and dependency edges
//! - [`process`]: blueprints and the process-status projection
//! - [`chain`]: hashing and whole-chain verification
//! - [`stats`]: aggregate counts for overview reporting
//!
//! # Conventions
//!
//! - **Errors**: ledger operations return [`error::Result`]; config loading
//!   and database opening use `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!` for mutations, `debug!` for
//!   reads, `warn!` for conflicts and chain breaks).
//! - **Time**: `*_us` fields are microseconds since the Unix epoch, assigned
//!   by a [`clock::Clock`], never by callers.

pub mod actor;
pub mod chain;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod model;
pub mod process;
pub mod stats;

pub use actor::Actor;
pub use error::{ErrorCode, LedgerError, Result};
