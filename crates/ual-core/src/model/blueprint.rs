//! Process blueprints: named, ordered templates of expected steps.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{LedgerError, Result};

pub const BLUEPRINT_ID_PREFIX: &str = "bp-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintStep {
    /// Stable step identifier, unique within its blueprint.
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected duration in hours; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub steps: Vec<BlueprintStep>,
    pub created_by: String,
    pub created_at_us: i64,
}

impl Blueprint {
    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&BlueprintStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

/// Blueprint registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlueprint {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    pub steps: Vec<BlueprintStep>,
}

impl NewBlueprint {
    /// Validate the payload and return a trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] for a blank name, no steps, blank
    /// or duplicate step ids, blank step names, or non-positive durations.
    pub fn normalized(&self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("blueprint name is required"));
        }
        if self.steps.is_empty() {
            return Err(LedgerError::validation(
                "blueprint must declare at least one step",
            ));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let id = step.id.trim();
            if id.is_empty() {
                return Err(LedgerError::validation("step id is required"));
            }
            if !seen.insert(id.to_string()) {
                return Err(LedgerError::validation(format!("duplicate step id '{id}'")));
            }
            let step_name = step.name.trim();
            if step_name.is_empty() {
                return Err(LedgerError::validation(format!("step '{id}' needs a name")));
            }
            if step
                .expected_hours
                .is_some_and(|hours| !(hours.is_finite() && hours > 0.0))
            {
                return Err(LedgerError::validation(format!(
                    "step '{id}' expected_hours must be positive"
                )));
            }
            steps.push(BlueprintStep {
                id: id.to_string(),
                name: step_name.to_string(),
                description: trimmed(step.description.as_deref()),
                expected_hours: step.expected_hours,
                assigned_role: trimmed(step.assigned_role.as_deref()),
            });
        }

        Ok(Self {
            name: name.to_string(),
            description: trimmed(self.description.as_deref()),
            department: trimmed(self.department.as_deref()),
            steps,
        })
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
