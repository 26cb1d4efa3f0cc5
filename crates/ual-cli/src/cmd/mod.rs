pub mod blueprint;
pub mod create;
pub mod init;
pub mod link;
pub mod list;
pub mod show;
pub mod stats;
pub mod status;
pub mod timeline;
pub mod verify;
pub mod void;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use ual_core::config::{LedgerConfig, default_db_path, load_config};
use ual_core::db::open_ledger;

/// Where the ledger lives and how it is tuned, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub project_root: PathBuf,
    pub db_path: PathBuf,
    pub config: LedgerConfig,
}

impl LedgerContext {
    /// Resolve the database path (`--db` > `UAL_DB` > project default) and
    /// load the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn resolve(project_root: &Path, db_flag: Option<&Path>) -> Result<Self> {
        let env_db = std::env::var_os("UAL_DB")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Ok(Self {
            project_root: project_root.to_path_buf(),
            db_path: resolve_db_path(project_root, db_flag, env_db),
            config: load_config(project_root)?,
        })
    }

    /// Open (creating and migrating if needed) the ledger database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(&self) -> Result<Connection> {
        open_ledger(&self.db_path)
    }
}

fn resolve_db_path(project_root: &Path, flag: Option<&Path>, env: Option<PathBuf>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or(env)
        .unwrap_or_else(|| default_db_path(project_root))
}
