//! Actor identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `UAL_ACTOR` env > `USER` env (TTY only).
//! Mutating commands require an actor; read-only commands work without one.

use std::env;
use ual_core::{Actor, LedgerError};

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(actor) = cli_flag.filter(|a| !a.trim().is_empty()) {
        return Some(actor.to_string());
    }

    if let Some(val) = env.get("UAL_ACTOR") {
        return Some(val);
    }

    // USER is only trusted for interactive sessions.
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve and validate the actor for a mutating command.
///
/// # Errors
///
/// Returns [`LedgerError::Unauthorized`] when no identity resolves or the
/// resolved one is invalid.
pub fn require_actor(cli_flag: Option<&str>) -> Result<Actor, LedgerError> {
    require_actor_with(cli_flag, &RealEnv)
}

fn require_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Result<Actor, LedgerError> {
    let id = resolve_actor_with(cli_flag, env).ok_or_else(|| {
        LedgerError::Unauthorized(
            "actor identity required for this command; set --actor or UAL_ACTOR".to_string(),
        )
    })?;
    Actor::new(id)
}
