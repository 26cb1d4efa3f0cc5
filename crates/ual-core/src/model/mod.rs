//! Ledger domain types.

pub mod blueprint;
pub mod dependency;
pub mod record;

pub use blueprint::{Blueprint, BlueprintStep, NewBlueprint};
pub use dependency::{ActionDependency, DependencyKind};
pub use record::{Annotations, LedgerRecord, NewRecord, is_record_id};
