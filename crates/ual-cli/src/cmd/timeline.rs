//! `ual timeline`: chronological history of one target item.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use ual_core::ledger::timeline;

use super::LedgerContext;
use crate::output::{OutputMode, micros_to_local_datetime, pretty_section, render_mode, state_transition};

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Target item, e.g. `PO-1023`.
    pub target: String,
}

/// Execute `ual timeline <target>`.
///
/// # Errors
///
/// Returns an error if the target has no records or a query fails.
pub fn run_timeline(args: &TimelineArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let events = timeline(&conn, &args.target, &ctx.config.timeline)?;

    render_mode(
        output,
        &events,
        |events, w| {
            for event in events {
                let r = &event.record;
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    ual_core::clock::format_us(r.created_at_us),
                    r.id,
                    r.actor,
                    r.action_type,
                    state_transition(r)
                )?;
                for edge in &event.dependencies {
                    writeln!(w, "  dep\t{}\t{}", edge.dependency.kind, edge.target.id)?;
                }
                for related in &event.related {
                    writeln!(w, "  near\t{}", related.id)?;
                }
            }
            Ok(())
        },
        |events, w| {
            pretty_section(w, &format!("Timeline of {}", args.target.trim()))?;
            if events.is_empty() {
                return writeln!(w, "All records for this target are voided.");
            }
            for event in events {
                let r = &event.record;
                writeln!(
                    w,
                    "{}  {:<12} by {:<12} {}",
                    micros_to_local_datetime(r.created_at_us),
                    r.action_type,
                    r.actor,
                    state_transition(r)
                )?;
                if let Some(description) = &r.description {
                    writeln!(w, "    {description}")?;
                }
                for edge in &event.dependencies {
                    writeln!(
                        w,
                        "    {} {} ({} on {})",
                        edge.dependency.kind,
                        edge.target.id,
                        edge.target.action_type,
                        edge.target.target_item
                    )?;
                }
                if !event.related.is_empty() {
                    let ids: Vec<&str> = event.related.iter().map(|rel| rel.id.as_str()).collect();
                    writeln!(w, "    nearby: {}", ids.join(", "))?;
                }
            }
            Ok(())
        },
    )
}
