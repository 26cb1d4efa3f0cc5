//! Process blueprints and the status projection built on them.

pub mod blueprint;
pub mod status;

pub use blueprint::{
    fetch_blueprint, get_blueprint, list_blueprints, register_blueprint,
    register_blueprint_with_clock,
};
pub use status::{ProcessStatus, StepState, StepStatus, TERMINAL_STATES, process_status};
