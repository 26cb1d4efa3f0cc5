//! `ual blueprint`: register and inspect process blueprints.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use ual_core::LedgerError;
use ual_core::model::{Blueprint, NewBlueprint};
use ual_core::process::{get_blueprint, list_blueprints, register_blueprint};

use super::LedgerContext;
use crate::actor;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct BlueprintArgs {
    #[command(subcommand)]
    pub command: BlueprintCommand,
}

#[derive(Subcommand, Debug)]
pub enum BlueprintCommand {
    /// Register a blueprint from a JSON file (`-` reads stdin).
    #[command(
        after_help = "FILE FORMAT:\n    {\"name\": \"Purchase order\", \"department\": \"finance\",\n     \"steps\": [{\"id\": \"submit\", \"name\": \"Submit\", \"expected_hours\": 2}]}"
    )]
    Add {
        /// Path to the blueprint JSON.
        file: PathBuf,
    },
    /// Show one blueprint.
    Show {
        /// Blueprint id (`bp-…`).
        id: String,
    },
    /// List all blueprints by name.
    List,
}

/// Execute `ual blueprint <subcommand>`.
///
/// # Errors
///
/// Returns an error for an unreadable or invalid file, a duplicate name, an
/// unknown id, or a failed query.
pub fn run_blueprint(
    args: &BlueprintArgs,
    actor_flag: Option<&str>,
    ctx: &LedgerContext,
    output: OutputMode,
) -> Result<()> {
    match &args.command {
        BlueprintCommand::Add { file } => {
            let actor = actor::require_actor(actor_flag)?;
            let payload = read_blueprint_file(file)?;
            let conn = ctx.open()?;
            let blueprint = register_blueprint(&conn, &actor, &payload)?;
            render_blueprint(output, &blueprint)
        }
        BlueprintCommand::Show { id } => {
            let conn = ctx.open()?;
            let blueprint = get_blueprint(&conn, id.trim())?;
            render_blueprint(output, &blueprint)
        }
        BlueprintCommand::List => {
            let conn = ctx.open()?;
            let blueprints = list_blueprints(&conn)?;
            render_mode(
                output,
                &blueprints,
                |all, w| {
                    for bp in all {
                        writeln!(w, "{}\t{}\t{}", bp.id, bp.name, bp.steps.len())?;
                    }
                    Ok(())
                },
                |all, w| {
                    if all.is_empty() {
                        return writeln!(w, "No blueprints registered.");
                    }
                    for bp in all {
                        writeln!(w, "{}  {:<24} {} steps", bp.id, bp.name, bp.steps.len())?;
                    }
                    Ok(())
                },
            )
        }
    }
}

fn read_blueprint_file(path: &Path) -> Result<NewBlueprint> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read blueprint from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    parse_blueprint(&text)
}

fn parse_blueprint(text: &str) -> Result<NewBlueprint> {
    serde_json::from_str(text)
        .map_err(|e| LedgerError::Validation(format!("invalid blueprint JSON: {e}")).into())
}

fn render_blueprint(output: OutputMode, blueprint: &Blueprint) -> Result<()> {
    render_mode(
        output,
        blueprint,
        |bp, w| {
            writeln!(w, "{}\t{}", bp.id, bp.name)?;
            for step in &bp.steps {
                let hours = step
                    .expected_hours
                    .map_or_else(|| "-".to_string(), |h| h.to_string());
                writeln!(w, "step\t{}\t{}\t{hours}", step.id, step.name)?;
            }
            Ok(())
        },
        |bp, w| {
            pretty_section(w, &format!("{} ({})", bp.name, bp.id))?;
            if let Some(description) = &bp.description {
                pretty_kv(w, "Description", description)?;
            }
            if let Some(department) = &bp.department {
                pretty_kv(w, "Department", department)?;
            }
            pretty_kv(w, "Created by", &bp.created_by)?;
            for (idx, step) in bp.steps.iter().enumerate() {
                let hours = step
                    .expected_hours
                    .map_or_else(String::new, |h| format!(" ({h}h)"));
                writeln!(w, "  {}. {} [{}]{hours}", idx + 1, step.name, step.id)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_blueprint() {
        let bp = parse_blueprint(
            r#"{"name": "PO", "steps": [{"id": "submit", "name": "Submit"}]}"#,
        )
        .unwrap();
        assert_eq!(bp.name, "PO");
        assert_eq!(bp.steps.len(), 1);
        assert!(bp.department.is_none());
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_blueprint("{\"name\": ").unwrap_err();
        let ledger = err.downcast_ref::<LedgerError>().unwrap();
        assert_eq!(ledger.http_status(), 400);
    }
}
