//! Minimal blueprint store: register, fetch, list.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::actor::Actor;
use crate::chain::hash::sha256_hex;
use crate::clock::{Clock, SystemClock};
use crate::db::rows::{BLUEPRINT_COLUMNS, row_to_blueprint};
use crate::error::{ErrorCode, LedgerError, Result};
use crate::model::blueprint::BLUEPRINT_ID_PREFIX;
use crate::model::{Blueprint, NewBlueprint};

const BLUEPRINT_ID_HEX_LEN: usize = 16;

/// Register a blueprint with the system clock.
///
/// # Errors
///
/// See [`register_blueprint_with_clock`].
pub fn register_blueprint(
    conn: &Connection,
    actor: &Actor,
    blueprint: &NewBlueprint,
) -> Result<Blueprint> {
    register_blueprint_with_clock(conn, actor, blueprint, &SystemClock)
}

/// Validate and store a blueprint. The id is derived from its name.
///
/// # Errors
///
/// - [`LedgerError::Validation`] for an invalid payload
/// - [`LedgerError::Conflict`] when the name is already registered
pub fn register_blueprint_with_clock(
    conn: &Connection,
    actor: &Actor,
    blueprint: &NewBlueprint,
    clock: &dyn Clock,
) -> Result<Blueprint> {
    let blueprint = blueprint.normalized()?;
    let hex = sha256_hex(blueprint.name.as_bytes());
    let stored = Blueprint {
        id: format!("{BLUEPRINT_ID_PREFIX}{}", &hex[..BLUEPRINT_ID_HEX_LEN]),
        name: blueprint.name,
        description: blueprint.description,
        department: blueprint.department,
        steps: blueprint.steps,
        created_by: actor.as_str().to_string(),
        created_at_us: clock.now_us(),
    };
    let steps_json = serde_json::to_string(&stored.steps)?;

    let inserted = conn.execute(
        "INSERT INTO blueprints (
            blueprint_id, name, description, department, steps_json, created_by, created_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT DO NOTHING",
        params![
            stored.id,
            stored.name,
            stored.description,
            stored.department,
            steps_json,
            stored.created_by,
            stored.created_at_us,
        ],
    )?;
    if inserted == 0 {
        return Err(LedgerError::Conflict {
            code: ErrorCode::DuplicateBlueprint,
            message: format!("blueprint '{}' already exists", stored.name),
        });
    }

    info!(id = %stored.id, name = %stored.name, steps = stored.steps.len(), actor = %actor, "registered blueprint");
    Ok(stored)
}

/// Look up a blueprint, `None` when absent.
///
/// # Errors
///
/// Returns an error if the query fails or `steps_json` is corrupt.
pub fn fetch_blueprint(conn: &Connection, id: &str) -> Result<Option<Blueprint>> {
    let sql = format!("SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE blueprint_id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_blueprint).optional()?)
}

/// Fetch a blueprint by id.
///
/// # Errors
///
/// Returns [`LedgerError::BlueprintNotFound`] when absent.
pub fn get_blueprint(conn: &Connection, id: &str) -> Result<Blueprint> {
    fetch_blueprint(conn, id)?.ok_or_else(|| LedgerError::BlueprintNotFound(id.to_string()))
}

/// All blueprints ordered by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_blueprints(conn: &Connection) -> Result<Vec<Blueprint>> {
    let sql = format!("SELECT {BLUEPRINT_COLUMNS} FROM blueprints ORDER BY name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_blueprint)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
