//! `ual stats`: ledger overview counts.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use ual_core::clock::{Clock, SystemClock};
use ual_core::stats::ledger_stats;

use super::LedgerContext;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `ual stats`.
#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

fn breakdown(w: &mut dyn Write, heading: &str, counts: &BTreeMap<String, u64>) -> std::io::Result<()> {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, heading)?;
    for (key, count) in counts {
        pretty_kv(w, key, count.to_string())?;
    }
    Ok(())
}

/// Execute `ual stats`.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn run_stats(_args: &StatsArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let stats = ledger_stats(&conn, SystemClock.now_us(), &ctx.config.process)?;

    render_mode(
        output,
        &stats,
        |s, w| {
            writeln!(w, "total_active\t{}", s.total_active)?;
            writeln!(w, "active_today\t{}", s.active_today)?;
            writeln!(w, "pending\t{}", s.pending)?;
            writeln!(w, "overdue\t{}", s.overdue)?;
            writeln!(w, "voided\t{}", s.voided)?;
            for (department, count) in &s.by_department {
                writeln!(w, "department\t{department}\t{count}")?;
            }
            for (action_type, count) in &s.by_action_type {
                writeln!(w, "action\t{action_type}\t{count}")?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, "Ledger")?;
            pretty_kv(w, "Active", s.total_active.to_string())?;
            pretty_kv(w, "Today", s.active_today.to_string())?;
            pretty_kv(w, "Pending", s.pending.to_string())?;
            pretty_kv(
                w,
                "Overdue",
                format!("{} (> {}h)", s.overdue, ctx.config.process.overdue_hours),
            )?;
            pretty_kv(w, "Voided", s.voided.to_string())?;
            breakdown(w, "Today by department", &s.by_department)?;
            breakdown(w, "Today by action", &s.by_action_type)
        },
    )
}
