//! `ual link`: add a typed dependency edge between two records.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use ual_core::ledger::link;
use ual_core::model::DependencyKind;

use super::LedgerContext;
use crate::actor;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Record the edge starts from.
    pub source: String,

    /// Record the edge points at.
    pub target: String,

    /// Edge kind: blocks, triggers, or relates_to.
    #[arg(short, long, default_value = "relates_to")]
    pub kind: String,
}

/// Execute `ual link <source> <target> --kind <kind>`.
///
/// # Errors
///
/// Returns an error for an unknown kind, a self edge, a missing endpoint, or
/// a duplicate edge.
pub fn run_link(
    args: &LinkArgs,
    actor_flag: Option<&str>,
    ctx: &LedgerContext,
    output: OutputMode,
) -> Result<()> {
    let actor = actor::require_actor(actor_flag)?;
    let kind: DependencyKind = args.kind.parse()?;
    let conn = ctx.open()?;
    let edge = link(&conn, &actor, args.source.trim(), args.target.trim(), kind)?;

    render(output, &edge, |e, w| {
        writeln!(w, "{} {} {}", e.source_id, e.kind, e.target_id)
    })
}
