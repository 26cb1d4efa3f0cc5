//! Ledger records and the payload accepted by append.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LedgerError, Result};

/// Prefix of every record id.
pub const RECORD_ID_PREFIX: &str = "act-";
/// Hex characters of the record digest kept in the id.
pub const RECORD_ID_HEX_LEN: usize = 16;

/// Open key/value annotation map (`context_tags`, `metadata`).
pub type Annotations = Map<String, Value>;

/// One immutable audit entry describing something done to a target item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    /// 1-based chain position.
    pub seq: i64,
    pub hash: String,
    pub prev_hash: Option<String>,
    pub created_at_us: i64,
    pub actor: String,
    pub action_type: String,
    pub target_item: String,
    pub target_type: String,
    pub department: String,
    pub description: Option<String>,
    pub pre_state: Option<String>,
    pub post_state: Option<String>,
    pub context_tags: Annotations,
    pub metadata: Annotations,
    pub process_blueprint_id: Option<String>,
    pub parent_action_id: Option<String>,
    pub step_id: Option<String>,
    pub is_voided: bool,
    pub void_reason: Option<String>,
    pub voided_by: Option<String>,
    pub voided_at_us: Option<i64>,
}

impl LedgerRecord {
    /// Content that was hashed at creation, rebuilt from stored fields.
    #[must_use]
    pub fn hashed_content(&self) -> NewRecord {
        NewRecord {
            action_type: self.action_type.clone(),
            target_item: self.target_item.clone(),
            target_type: self.target_type.clone(),
            department: self.department.clone(),
            description: self.description.clone(),
            pre_state: self.pre_state.clone(),
            post_state: self.post_state.clone(),
            context_tags: self.context_tags.clone(),
            metadata: self.metadata.clone(),
            process_blueprint_id: self.process_blueprint_id.clone(),
            parent_action_id: self.parent_action_id.clone(),
            step_id: self.step_id.clone(),
        }
    }
}

/// Proposed record payload. Identity, hash, chain link and timestamp are
/// assigned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub action_type: String,
    pub target_item: String,
    pub target_type: String,
    pub department: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pre_state: Option<String>,
    #[serde(default)]
    pub post_state: Option<String>,
    #[serde(default)]
    pub context_tags: Annotations,
    #[serde(default)]
    pub metadata: Annotations,
    #[serde(default)]
    pub process_blueprint_id: Option<String>,
    #[serde(default)]
    pub parent_action_id: Option<String>,
    #[serde(default)]
    pub step_id: Option<String>,
}

impl NewRecord {
    /// Start a payload with the four required classification fields.
    #[must_use]
    pub fn new(
        action_type: impl Into<String>,
        target_item: impl Into<String>,
        target_type: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            target_item: target_item.into(),
            target_type: target_type.into(),
            department: department.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn states(mut self, pre: Option<&str>, post: Option<&str>) -> Self {
        self.pre_state = pre.map(str::to_string);
        self.post_state = post.map(str::to_string);
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context_tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn blueprint(mut self, blueprint_id: impl Into<String>, step_id: Option<&str>) -> Self {
        self.process_blueprint_id = Some(blueprint_id.into());
        self.step_id = step_id.map(str::to_string);
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_action_id: impl Into<String>) -> Self {
        self.parent_action_id = Some(parent_action_id.into());
        self
    }

    /// Trim text fields, drop blank optionals, and enforce the required
    /// classification fields.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] naming the first missing field.
    pub fn normalized(&self) -> Result<Self> {
        let required = |name: &str, value: &str| -> Result<String> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(LedgerError::validation(format!("{name} is required")))
            } else {
                Ok(trimmed.to_string())
            }
        };
        let optional = |value: &Option<String>| -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let normalized = Self {
            action_type: required("action_type", &self.action_type)?,
            target_item: required("target_item", &self.target_item)?,
            target_type: required("target_type", &self.target_type)?,
            department: required("department", &self.department)?,
            description: optional(&self.description),
            pre_state: optional(&self.pre_state),
            post_state: optional(&self.post_state),
            context_tags: self.context_tags.clone(),
            metadata: self.metadata.clone(),
            process_blueprint_id: optional(&self.process_blueprint_id),
            parent_action_id: optional(&self.parent_action_id),
            step_id: optional(&self.step_id),
        };

        if normalized.step_id.is_some() && normalized.process_blueprint_id.is_none() {
            return Err(LedgerError::validation(
                "step_id requires process_blueprint_id",
            ));
        }

        Ok(normalized)
    }
}

/// `true` when `id` has the shape of a record id (`act-` + 16 lowercase hex).
#[must_use]
pub fn is_record_id(id: &str) -> bool {
    id.strip_prefix(RECORD_ID_PREFIX).is_some_and(|hex| {
        hex.len() == RECORD_ID_HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    })
}
