//! `ual void`: retract a record without removing it from the chain.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use ual_core::ledger::void_record;

use super::LedgerContext;
use crate::actor;
use crate::output::{OutputMode, record_block, render_mode};

#[derive(Args, Debug)]
pub struct VoidArgs {
    /// Record id to void.
    pub id: String,

    /// Why the record is being voided.
    #[arg(short, long)]
    pub reason: String,
}

/// Execute `ual void <id> --reason <text>`.
///
/// # Errors
///
/// Returns an error if no actor resolves, the reason is blank, the record is
/// missing, or it was already voided.
pub fn run_void(
    args: &VoidArgs,
    actor_flag: Option<&str>,
    ctx: &LedgerContext,
    output: OutputMode,
) -> Result<()> {
    let actor = actor::require_actor(actor_flag)?;
    let conn = ctx.open()?;
    let record = void_record(&conn, &actor, args.id.trim(), &args.reason)?;

    render_mode(
        output,
        &record,
        |r, w| writeln!(w, "voided\t{}", r.id),
        |r, w| {
            writeln!(w, "Voided {}", r.id)?;
            record_block(w, r)
        },
    )
}
