//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for agents and pipes,
//! or stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use ual_core::LedgerError;
use ual_core::model::LedgerRecord;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned fields, local times).
    Pretty,
    /// Token-efficient plain text for agents and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Core resolution logic, separated from I/O for testability.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value, fall through to TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from CLI flags, environment, and TTY defaults.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

/// Render a serializable value with explicit text and pretty renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render a serializable value, sharing one renderer between pretty and text.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// HTTP-equivalent status of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
            status: None,
        }
    }
}

impl From<&LedgerError> for CliError {
    fn from(err: &LedgerError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
            status: Some(err.http_status()),
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)?;
    Ok(())
}

fn write_error(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *w, &wrapper)?;
            writeln!(w)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
                None => writeln!(w, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(w, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Local wall-clock rendering for pretty output.
pub fn micros_to_local_datetime(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us).map_or_else(
        || us.to_string(),
        |ts| {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// `pre -> post` transition, or `-` when neither is set.
pub fn state_transition(record: &LedgerRecord) -> String {
    match (record.pre_state.as_deref(), record.post_state.as_deref()) {
        (None, None) => "-".to_string(),
        (pre, post) => format!("{} -> {}", pre.unwrap_or("?"), post.unwrap_or("?")),
    }
}

/// One tab-separated row per record for text mode.
pub fn record_row(w: &mut dyn Write, record: &LedgerRecord) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}{}",
        record.id,
        ual_core::clock::format_us(record.created_at_us),
        record.actor,
        record.action_type,
        record.target_item,
        record.department,
        state_transition(record),
        if record.is_voided { "\tVOIDED" } else { "" }
    )
}

/// Column headers matching [`record_row`].
pub const RECORD_ROW_HEADERS: &str = "ID\tCREATED\tACTOR\tACTION\tTARGET\tDEPARTMENT\tSTATE";

/// Full pretty block for a single record.
pub fn record_block(w: &mut dyn Write, record: &LedgerRecord) -> io::Result<()> {
    let title = if record.is_voided {
        format!("{} (VOIDED)", record.id)
    } else {
        record.id.clone()
    };
    pretty_section(w, &title)?;
    pretty_kv(w, "Action", &record.action_type)?;
    pretty_kv(
        w,
        "Target",
        format!("{} ({})", record.target_item, record.target_type),
    )?;
    pretty_kv(w, "Department", &record.department)?;
    pretty_kv(w, "Actor", &record.actor)?;
    pretty_kv(w, "Created", micros_to_local_datetime(record.created_at_us))?;
    pretty_kv(w, "State", state_transition(record))?;
    if let Some(description) = &record.description {
        pretty_kv(w, "Description", description)?;
    }
    if let Some(blueprint) = &record.process_blueprint_id {
        let step = record.step_id.as_deref().unwrap_or("-");
        pretty_kv(w, "Process", format!("{blueprint} / {step}"))?;
    }
    if let Some(parent) = &record.parent_action_id {
        pretty_kv(w, "Parent", parent)?;
    }
    if !record.context_tags.is_empty() {
        pretty_kv(w, "Tags", serde_json::Value::Object(record.context_tags.clone()).to_string())?;
    }
    if !record.metadata.is_empty() {
        pretty_kv(w, "Metadata", serde_json::Value::Object(record.metadata.clone()).to_string())?;
    }
    pretty_kv(w, "Seq", record.seq.to_string())?;
    pretty_kv(w, "Hash", &record.hash)?;
    if record.is_voided {
        pretty_kv(w, "Void reason", record.void_reason.as_deref().unwrap_or("-"))?;
        pretty_kv(w, "Voided by", record.voided_by.as_deref().unwrap_or("-"))?;
        if let Some(at) = record.voided_at_us {
            pretty_kv(w, "Voided at", micros_to_local_datetime(at))?;
        }
    }
    Ok(())
}
