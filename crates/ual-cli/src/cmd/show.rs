//! `ual show`: display one record with its dependency edges.
//!
//! Voided records stay readable; they are flagged, never hidden.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use ual_core::ledger::get_record_detail;

use super::LedgerContext;
use crate::output::{OutputMode, pretty_kv, pretty_section, record_block, record_row, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Record id (`act-…`).
    pub id: String,
}

/// Execute `ual show <id>`.
///
/// # Errors
///
/// Returns an error if the record does not exist or the query fails.
pub fn run_show(args: &ShowArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let detail = get_record_detail(&conn, args.id.trim())?;

    render_mode(
        output,
        &detail,
        |d, w| {
            record_row(w, &d.record)?;
            for dep in &d.dependencies {
                writeln!(w, "dep\t{}\t{}", dep.kind, dep.target_id)?;
            }
            Ok(())
        },
        |d, w| {
            record_block(w, &d.record)?;
            if !d.dependencies.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Dependencies")?;
                for dep in &d.dependencies {
                    pretty_kv(w, dep.kind.as_str(), &dep.target_id)?;
                }
            }
            Ok(())
        },
    )
}
