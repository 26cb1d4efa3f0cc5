//! `ual status`: progress of a target item through a process blueprint.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use ual_core::clock::{Clock, SystemClock};
use ual_core::process::{StepState, process_status};

use super::LedgerContext;
use crate::output::{OutputMode, micros_to_local_datetime, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Blueprint id (`bp-…`).
    pub blueprint: String,

    /// Target item, e.g. `PO-1023`.
    pub target: String,
}

const fn step_marker(state: StepState) -> &'static str {
    match state {
        StepState::Completed => "[x]",
        StepState::InProgress => "[~]",
        StepState::NotStarted => "[ ]",
    }
}

/// Execute `ual status <blueprint> <target>`.
///
/// # Errors
///
/// Returns an error if the blueprint is unknown or a query fails.
pub fn run_status(args: &StatusArgs, ctx: &LedgerContext, output: OutputMode) -> Result<()> {
    let conn = ctx.open()?;
    let status = process_status(
        &conn,
        args.blueprint.trim(),
        &args.target,
        SystemClock.now_us(),
        &ctx.config.process,
    )?;

    render_mode(
        output,
        &status,
        |s, w| {
            writeln!(
                w,
                "{}\t{}\t{}/{}\t{:.1}%\t{}{}",
                s.blueprint_id,
                s.target_item,
                s.completed_steps,
                s.total_steps,
                s.completion_percent,
                s.current_step.as_deref().unwrap_or("done"),
                if s.is_overdue { "\tOVERDUE" } else { "" }
            )?;
            for step in &s.steps {
                writeln!(w, "{}\t{}", step.step_id, step_marker(step.state))?;
            }
            Ok(())
        },
        |s, w| {
            pretty_section(w, &format!("{} / {}", s.blueprint_name, s.target_item))?;
            pretty_kv(
                w,
                "Progress",
                format!(
                    "{}/{} steps ({:.1}%)",
                    s.completed_steps, s.total_steps, s.completion_percent
                ),
            )?;
            pretty_kv(w, "Current step", s.current_step.as_deref().unwrap_or("complete"))?;
            if let Some(started) = s.started_at_us {
                pretty_kv(w, "Started", micros_to_local_datetime(started))?;
            }
            if let Some(eta) = s.estimated_completion_us {
                let overdue = if s.is_overdue { "  OVERDUE" } else { "" };
                pretty_kv(w, "Expected by", format!("{}{overdue}", micros_to_local_datetime(eta)))?;
            }
            writeln!(w)?;
            for step in &s.steps {
                writeln!(
                    w,
                    "  {} {:<24} {:>5}h  {}",
                    step_marker(step.state),
                    step.name,
                    step.expected_hours,
                    step.latest_action_id.as_deref().unwrap_or("")
                )?;
            }
            Ok(())
        },
    )
}
