//! `ual create`: append a new action record to the ledger.

use anyhow::Result;
use clap::Args;
use serde_json::Value;
use std::io::Write;
use ual_core::ledger::append;
use ual_core::model::NewRecord;

use super::LedgerContext;
use crate::actor;
use crate::output::{OutputMode, record_block, render_mode};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Action type, e.g. `approve` or `submit`.
    #[arg(short, long = "action")]
    pub action_type: String,

    /// Business item the action was taken against, e.g. `PO-1023`.
    #[arg(short, long)]
    pub target: String,

    /// Kind of the target item, e.g. `purchase_order`.
    #[arg(long)]
    pub target_type: String,

    /// Owning department.
    #[arg(short, long)]
    pub department: String,

    /// Free-text description.
    #[arg(long)]
    pub description: Option<String>,

    /// State of the target before the action.
    #[arg(long)]
    pub pre_state: Option<String>,

    /// State of the target after the action.
    #[arg(long)]
    pub post_state: Option<String>,

    /// Context tag as KEY=VALUE (repeatable). JSON values are kept typed.
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_annotation)]
    pub tags: Vec<(String, Value)>,

    /// Metadata entry as KEY=VALUE (repeatable). JSON values are kept typed.
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_annotation)]
    pub metadata: Vec<(String, Value)>,

    /// Process blueprint this action belongs to.
    #[arg(long)]
    pub blueprint: Option<String>,

    /// Blueprint step this action performs (requires --blueprint).
    #[arg(long, requires = "blueprint")]
    pub step: Option<String>,

    /// Record this action follows up on.
    #[arg(long)]
    pub parent: Option<String>,
}

impl CreateArgs {
    fn to_new_record(&self) -> NewRecord {
        NewRecord {
            action_type: self.action_type.clone(),
            target_item: self.target.clone(),
            target_type: self.target_type.clone(),
            department: self.department.clone(),
            description: self.description.clone(),
            pre_state: self.pre_state.clone(),
            post_state: self.post_state.clone(),
            context_tags: self.tags.iter().cloned().collect(),
            metadata: self.metadata.iter().cloned().collect(),
            process_blueprint_id: self.blueprint.clone(),
            parent_action_id: self.parent.clone(),
            step_id: self.step.clone(),
        }
    }
}

/// Parse `KEY=VALUE`. Values that parse as JSON keep their type; anything
/// else is stored as a string.
fn parse_annotation(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = serde_json::from_str::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Execute `ual create`.
///
/// # Errors
///
/// Returns an error if no actor resolves, the payload is invalid, a
/// referenced parent or blueprint is missing, or the append fails.
pub fn run_create(
    args: &CreateArgs,
    actor_flag: Option<&str>,
    ctx: &LedgerContext,
    output: OutputMode,
) -> Result<()> {
    let actor = actor::require_actor(actor_flag)?;
    let mut conn = ctx.open()?;
    let record = append(&mut conn, &actor, &args.to_new_record(), &ctx.config.append)?;

    render_mode(
        output,
        &record,
        |r, w| writeln!(w, "{}\t{}", r.id, r.hash),
        |r, w| {
            writeln!(w, "Recorded {}", r.id)?;
            record_block(w, r)
        },
    )
}
