use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Typed edge between two ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Blocks,
    Triggers,
    RelatesTo,
}

impl DependencyKind {
    pub const ALL: [Self; 3] = [Self::Blocks, Self::Triggers, Self::RelatesTo];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Triggers => "triggers",
            Self::RelatesTo => "relates_to",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocks" => Ok(Self::Blocks),
            "triggers" => Ok(Self::Triggers),
            "relates_to" | "relates-to" | "related" => Ok(Self::RelatesTo),
            other => Err(LedgerError::validation(format!(
                "unknown dependency kind '{other}': expected one of blocks, triggers, relates_to"
            ))),
        }
    }
}

/// A directed dependency edge `source -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDependency {
    pub source_id: String,
    pub target_id: String,
    pub kind: DependencyKind,
    pub created_by: String,
    pub created_at_us: i64,
}
