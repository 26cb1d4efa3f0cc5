//! Ledger configuration loaded from `.ual/config.toml`.
//!
//! Every section is optional; a missing file yields [`LedgerConfig::default`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding the ledger database and config under a project root.
pub const LEDGER_DIR: &str = ".ual";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub append: AppendConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub process: ProcessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendConfig {
    /// Conflict retries before the append surfaces `Conflict`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AppendConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AppendConfig {
    /// Sleep before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default = "default_list_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_list_limit")]
    pub max_limit: u32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: default_list_limit(),
            max_limit: default_max_list_limit(),
        }
    }
}

impl ListConfig {
    /// Resolve a requested page size against the configured default and cap.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Half-width of the "related actions" proximity window.
    #[serde(default = "default_related_window_secs")]
    pub related_window_secs: u64,
    #[serde(default = "default_related_limit")]
    pub related_limit: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            related_window_secs: default_related_window_secs(),
            related_limit: default_related_limit(),
        }
    }
}

impl TimelineConfig {
    #[must_use]
    pub fn related_window_us(&self) -> i64 {
        i64::try_from(self.related_window_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1_000_000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Expected duration assumed for blueprint steps that declare none.
    #[serde(default = "default_step_hours")]
    pub default_step_hours: u32,
    /// Age after which a pending record counts as overdue in statistics.
    #[serde(default = "default_overdue_hours")]
    pub overdue_hours: u32,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_step_hours: default_step_hours(),
            overdue_hours: default_overdue_hours(),
        }
    }
}

const fn default_max_retries() -> u32 {
    8
}

const fn default_retry_backoff_ms() -> u64 {
    5
}

const fn default_list_limit() -> u32 {
    50
}

const fn default_max_list_limit() -> u32 {
    500
}

const fn default_related_window_secs() -> u64 {
    3_600
}

const fn default_related_limit() -> usize {
    5
}

const fn default_step_hours() -> u32 {
    24
}

const fn default_overdue_hours() -> u32 {
    48
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(LEDGER_DIR).join("config.toml")
}

/// Default database location under `project_root`.
#[must_use]
pub fn default_db_path(project_root: &Path) -> PathBuf {
    project_root.join(LEDGER_DIR).join("ledger.sqlite3")
}

/// Load the project config, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(project_root: &Path) -> Result<LedgerConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(LedgerConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse config text. Exposed for tests and embedding callers.
///
/// # Errors
///
/// Returns an error on invalid TOML or mistyped values.
pub fn parse_config(content: &str) -> Result<LedgerConfig> {
    let config = toml::from_str::<LedgerConfig>(content)?;
    Ok(config)
}
