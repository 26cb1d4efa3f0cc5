use std::io::Write;

use anyhow::Result;
use ual_core::chain::{ChainBreak, verify_chain};

use super::LedgerContext;
use crate::output::{OutputMode, render};

fn describe(chain_break: &ChainBreak) -> String {
    match chain_break {
        ChainBreak::HashMismatch { stored, expected, .. } => {
            format!("hash mismatch (stored {stored}, recomputed {expected})")
        }
        ChainBreak::BrokenLink { expected_prev, found_prev, .. } => format!(
            "broken link (expected prev {}, found {})",
            expected_prev.as_deref().unwrap_or("none"),
            found_prev.as_deref().unwrap_or("none")
        ),
        ChainBreak::SequenceGap { previous, .. } => format!("sequence gap after seq {previous}"),
        ChainBreak::TimeRegression { previous_us, found_us, .. } => {
            format!("time regression ({found_us} < {previous_us})")
        }
        ChainBreak::IdMismatch { stored, expected, .. } => {
            format!("id mismatch (stored {stored}, expected {expected})")
        }
        ChainBreak::CorruptRow { column, .. } => format!("undecodable column {column}"),
    }
}

/// Verify every record's hash and link in the ledger.
///
/// # Errors
///
/// Returns an error when the chain has any break, so the process exits
/// non-zero.
pub fn run_verify(ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let report = verify_chain(&conn)?;

    render(output, &report, |r, w| {
        for chain_break in &r.breaks {
            writeln!(w, "FAIL seq {}: {}", chain_break.seq(), describe(chain_break))?;
        }
        if r.is_intact() {
            writeln!(w, "OK   {} records verified", r.records_checked)?;
        }
        Ok(())
    })?;

    if report.is_intact() {
        Ok(())
    } else {
        anyhow::bail!(
            "verify: {} break(s) in {} records",
            report.breaks.len(),
            report.records_checked
        );
    }
}
