use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidInput,
    MissingActor,
    RecordNotFound,
    TargetNotFound,
    BlueprintNotFound,
    AlreadyVoided,
    ChainTailConflict,
    DuplicateDependency,
    DuplicateBlueprint,
    StorageFailure,
    CorruptPayload,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidInput => "E1002",
            Self::MissingActor => "E1003",
            Self::RecordNotFound => "E2001",
            Self::TargetNotFound => "E2002",
            Self::BlueprintNotFound => "E2003",
            Self::AlreadyVoided => "E3001",
            Self::ChainTailConflict => "E3002",
            Self::DuplicateDependency => "E3003",
            Self::DuplicateBlueprint => "E3004",
            Self::StorageFailure => "E5001",
            Self::CorruptPayload => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidInput => "Invalid input",
            Self::MissingActor => "Actor identity required",
            Self::RecordNotFound => "Ledger record not found",
            Self::TargetNotFound => "Target item has no ledger records",
            Self::BlueprintNotFound => "Process blueprint not found",
            Self::AlreadyVoided => "Ledger record already voided",
            Self::ChainTailConflict => "Chain tail moved during append",
            Self::DuplicateDependency => "Dependency edge already exists",
            Self::DuplicateBlueprint => "Blueprint name already registered",
            Self::StorageFailure => "Ledger storage failure",
            Self::CorruptPayload => "Stored payload could not be decoded",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .ual/config.toml and retry."),
            Self::InvalidInput => None,
            Self::MissingActor => Some("Set --actor or the UAL_ACTOR environment variable."),
            Self::RecordNotFound | Self::TargetNotFound => None,
            Self::BlueprintNotFound => Some("Run `ual blueprint list` to see registered ids."),
            Self::AlreadyVoided => Some("Voiding is permanent; nothing further to do."),
            Self::ChainTailConflict => Some("Retry; another writer appended concurrently."),
            Self::DuplicateDependency => None,
            Self::DuplicateBlueprint => Some("Choose a different blueprint name."),
            Self::StorageFailure => Some("Check disk space and database file permissions."),
            Self::CorruptPayload => Some("Run `ual verify` to locate the damaged record."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by every ledger operation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Required input was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No actor identity was supplied for a mutating call.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A record id did not resolve.
    #[error("ledger record not found: {0}")]
    RecordNotFound(String),

    /// A target item has no records at all.
    #[error("no ledger records for target item: {0}")]
    TargetNotFound(String),

    /// A blueprint id did not resolve.
    #[error("process blueprint not found: {0}")]
    BlueprintNotFound(String),

    /// The record exists but was voided earlier.
    #[error("ledger record {0} is already voided")]
    AlreadyVoided(String),

    /// A write raced another writer (chain tail moved, lock busy, or a
    /// uniqueness rule tripped).
    #[error("conflict: {message}")]
    Conflict {
        code: ErrorCode,
        message: String,
    },

    /// The durability layer failed. Nothing was committed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn chain_conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            code: ErrorCode::ChainTailConflict,
            message: message.into(),
        }
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidInput,
            Self::Unauthorized(_) => ErrorCode::MissingActor,
            Self::RecordNotFound(_) => ErrorCode::RecordNotFound,
            Self::TargetNotFound(_) => ErrorCode::TargetNotFound,
            Self::BlueprintNotFound(_) => ErrorCode::BlueprintNotFound,
            Self::AlreadyVoided(_) => ErrorCode::AlreadyVoided,
            Self::Conflict { code, .. } => *code,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Serialization(_) => ErrorCode::CorruptPayload,
        }
    }

    /// HTTP-equivalent status for request surfaces.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::RecordNotFound(_) | Self::TargetNotFound(_) | Self::BlueprintNotFound(_) => 404,
            Self::AlreadyVoided(_) | Self::Conflict { .. } => 409,
            Self::Storage(_) | Self::Serialization(_) => 500,
        }
    }

    /// `true` for failures an append loop may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict {
                code: ErrorCode::ChainTailConflict,
                ..
            }
        )
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Shorthand used across the ledger modules.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::{ErrorCode, LedgerError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidInput,
            ErrorCode::MissingActor,
            ErrorCode::RecordNotFound,
            ErrorCode::TargetNotFound,
            ErrorCode::BlueprintNotFound,
            ErrorCode::AlreadyVoided,
            ErrorCode::ChainTailConflict,
            ErrorCode::DuplicateDependency,
            ErrorCode::DuplicateBlueprint,
            ErrorCode::StorageFailure,
            ErrorCode::CorruptPayload,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::AlreadyVoided.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn statuses_follow_request_surface() {
        assert_eq!(LedgerError::validation("x").http_status(), 400);
        assert_eq!(LedgerError::Unauthorized("x".into()).http_status(), 401);
        assert_eq!(LedgerError::RecordNotFound("x".into()).http_status(), 404);
        assert_eq!(LedgerError::AlreadyVoided("x".into()).http_status(), 409);
        assert_eq!(LedgerError::chain_conflict("x").http_status(), 409);
        assert_eq!(
            LedgerError::Storage(rusqlite::Error::QueryReturnedNoRows).http_status(),
            500
        );
    }

    #[test]
    fn only_chain_conflicts_are_retryable() {
        assert!(LedgerError::chain_conflict("tail moved").is_retryable());
        assert!(
            !LedgerError::Conflict {
                code: ErrorCode::DuplicateDependency,
                message: "dup".into(),
            }
            .is_retryable()
        );
        assert!(!LedgerError::AlreadyVoided("act-1".into()).is_retryable());
    }
}
