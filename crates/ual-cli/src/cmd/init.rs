//! `ual init`: create the `.ual/` directory, config, and database.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use ual_core::config::{LEDGER_DIR, LedgerConfig, config_path};

use super::LedgerContext;
use crate::output::{OutputMode, pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.ual/config.toml` with defaults.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "ledger.sqlite3\nledger.sqlite3-wal\nledger.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config_path: PathBuf,
    db_path: PathBuf,
    config_written: bool,
}

/// Execute `ual init`. Creates:
///
/// ```text
/// .ual/
///   config.toml       (defaults, unless one exists and --force is not set)
///   .gitignore        (the SQLite database and its WAL files)
///   ledger.sqlite3    (migrated to the latest schema)
/// ```
///
/// # Errors
///
/// Returns an error if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let ledger_dir = ctx.project_root.join(LEDGER_DIR);
    std::fs::create_dir_all(&ledger_dir)
        .with_context(|| format!("Failed to create {}", ledger_dir.display()))?;

    let config_file = config_path(&ctx.project_root);
    let config_written = args.force || !config_file.exists();
    if config_written {
        let text = toml::to_string_pretty(&LedgerConfig::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&config_file, text)
            .with_context(|| format!("Failed to write {}", config_file.display()))?;
    }

    let gitignore = ledger_dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, GITIGNORE)
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    // Opening applies migrations.
    drop(ctx.open()?);
    tracing::info!(db = %ctx.db_path.display(), "initialized ledger");

    let report = InitReport {
        config_path: config_file,
        db_path: ctx.db_path.clone(),
        config_written,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "initialized {}", r.db_path.display()),
        |r, w| {
            writeln!(w, "Initialized ual ledger")?;
            pretty_kv(w, "Database", r.db_path.display().to_string())?;
            pretty_kv(
                w,
                "Config",
                format!(
                    "{}{}",
                    r.config_path.display(),
                    if r.config_written { "" } else { " (kept)" }
                ),
            )
        },
    )
}
