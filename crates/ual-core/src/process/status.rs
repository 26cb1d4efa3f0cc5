//! Process-status projection: how far a target item has progressed through a
//! blueprint, derived from the active records that name its steps.

use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::debug;

use crate::clock::MICROS_PER_HOUR;
use crate::config::ProcessConfig;
use crate::db::rows::{RECORD_COLUMNS, row_to_record};
use crate::error::Result;
use crate::model::{Blueprint, BlueprintStep, LedgerRecord};

use super::blueprint::get_blueprint;

/// `post_state` values that complete a step.
pub const TERMINAL_STATES: &[&str] = &["completed", "approved", "resolved"];

/// `true` when `post_state` is one of [`TERMINAL_STATES`] (case-insensitive).
#[must_use]
pub fn is_terminal_state(post_state: Option<&str>) -> bool {
    post_state.is_some_and(|state| {
        TERMINAL_STATES
            .iter()
            .any(|terminal| state.trim().eq_ignore_ascii_case(terminal))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepStatus {
    pub step_id: String,
    pub name: String,
    pub state: StepState,
    pub expected_hours: f64,
    /// Latest record naming this step.
    pub latest_action_id: Option<String>,
    pub updated_at_us: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStatus {
    pub blueprint_id: String,
    pub blueprint_name: String,
    pub target_item: String,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub completion_percent: f64,
    /// First step that is not completed; `None` once all are.
    pub current_step: Option<String>,
    pub started_at_us: Option<i64>,
    pub estimated_completion_us: Option<i64>,
    pub is_overdue: bool,
    pub steps: Vec<StepStatus>,
    pub records: Vec<LedgerRecord>,
}

/// Project the status of `target_item` through blueprint `blueprint_id`.
///
/// # Errors
///
/// Returns [`crate::error::LedgerError::BlueprintNotFound`] for an unknown
/// blueprint, or a storage error if a query fails.
pub fn process_status(
    conn: &Connection,
    blueprint_id: &str,
    target_item: &str,
    now_us: i64,
    config: &ProcessConfig,
) -> Result<ProcessStatus> {
    let tx = conn.unchecked_transaction()?;
    let blueprint = get_blueprint(&tx, blueprint_id)?;
    let records = {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM actions a \
             WHERE a.process_blueprint_id = ?1 AND a.target_item = ?2 AND a.is_voided = 0 \
             ORDER BY a.created_at_us ASC, a.seq ASC"
        );
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt.query_map(params![blueprint.id, target_item.trim()], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    tx.finish()?;

    let status = project(&blueprint, target_item.trim(), records, now_us, config);
    debug!(
        blueprint = %status.blueprint_id,
        target_item = %status.target_item,
        completed = status.completed_steps,
        total = status.total_steps,
        "projected process status"
    );
    Ok(status)
}

fn project(
    blueprint: &Blueprint,
    target_item: &str,
    records: Vec<LedgerRecord>,
    now_us: i64,
    config: &ProcessConfig,
) -> ProcessStatus {
    let steps: Vec<StepStatus> = blueprint
        .steps
        .iter()
        .map(|step| step_status(step, &records, config))
        .collect();

    let total_steps = steps.len();
    let completed_steps = steps
        .iter()
        .filter(|s| s.state == StepState::Completed)
        .count();
    let current_step = steps
        .iter()
        .find(|s| s.state != StepState::Completed)
        .map(|s| s.step_id.clone());

    let started_at_us = records.first().map(|r| r.created_at_us);
    let expected_us: i64 = steps
        .iter()
        .map(|s| hours_to_us(s.expected_hours))
        .fold(0, i64::saturating_add);
    let estimated_completion_us = started_at_us.map(|start| start.saturating_add(expected_us));
    let is_overdue = current_step.is_some()
        && estimated_completion_us.is_some_and(|estimate| now_us > estimate);

    ProcessStatus {
        blueprint_id: blueprint.id.clone(),
        blueprint_name: blueprint.name.clone(),
        target_item: target_item.to_string(),
        total_steps,
        completed_steps,
        completion_percent: percent(completed_steps, total_steps),
        current_step,
        started_at_us,
        estimated_completion_us,
        is_overdue,
        steps,
        records,
    }
}

fn step_status(step: &BlueprintStep, records: &[LedgerRecord], config: &ProcessConfig) -> StepStatus {
    let latest = records
        .iter()
        .rev()
        .find(|r| r.step_id.as_deref() == Some(step.id.as_str()));
    let state = match latest {
        None => StepState::NotStarted,
        Some(record) if is_terminal_state(record.post_state.as_deref()) => StepState::Completed,
        Some(_) => StepState::InProgress,
    };
    StepStatus {
        step_id: step.id.clone(),
        name: step.name.clone(),
        state,
        expected_hours: step
            .expected_hours
            .unwrap_or_else(|| f64::from(config.default_step_hours)),
        latest_action_id: latest.map(|r| r.id.clone()),
        updated_at_us: latest.map(|r| r.created_at_us),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn hours_to_us(hours: f64) -> i64 {
    // Saturating float-to-int conversion; durations are validated positive.
    (hours * MICROS_PER_HOUR as f64).round() as i64
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 100.0 / whole as f64 * 10.0).round() / 10.0
}
