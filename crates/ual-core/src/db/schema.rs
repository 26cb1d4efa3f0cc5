//! Canonical SQLite schema for the action ledger.
//!
//! - `actions` holds every record ever appended, ordered by `seq`; rows are
//!   never deleted and only the void columns ever change
//! - `action_dependencies` holds typed edges between records
//! - `blueprints` holds process templates referenced by records
//! - `ledger_meta` tracks the applied schema version

/// Migration v1: core tables and the no-fork chain index.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS blueprints (
    blueprint_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE CHECK (length(trim(name)) > 0),
    description TEXT,
    department TEXT,
    steps_json TEXT NOT NULL,
    created_by TEXT NOT NULL CHECK (length(trim(created_by)) > 0),
    created_at_us INTEGER NOT NULL,
    CHECK (blueprint_id LIKE 'bp-%')
);

CREATE TABLE IF NOT EXISTS actions (
    seq INTEGER PRIMARY KEY CHECK (seq > 0),
    action_id TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL UNIQUE,
    prev_hash TEXT,
    created_at_us INTEGER NOT NULL,
    actor TEXT NOT NULL CHECK (length(trim(actor)) > 0),
    action_type TEXT NOT NULL CHECK (length(trim(action_type)) > 0),
    target_item TEXT NOT NULL CHECK (length(trim(target_item)) > 0),
    target_type TEXT NOT NULL CHECK (length(trim(target_type)) > 0),
    department TEXT NOT NULL CHECK (length(trim(department)) > 0),
    description TEXT,
    pre_state TEXT,
    post_state TEXT,
    context_tags_json TEXT NOT NULL DEFAULT '{}',
    metadata_json TEXT NOT NULL DEFAULT '{}',
    process_blueprint_id TEXT REFERENCES blueprints(blueprint_id),
    parent_action_id TEXT REFERENCES actions(action_id),
    step_id TEXT,
    is_voided INTEGER NOT NULL DEFAULT 0 CHECK (is_voided IN (0, 1)),
    void_reason TEXT,
    voided_by TEXT,
    voided_at_us INTEGER,
    CHECK (action_id LIKE 'act-%'),
    CHECK (hash LIKE 'sha256:%'),
    CHECK (
        is_voided = 0
        OR (void_reason IS NOT NULL AND voided_by IS NOT NULL AND voided_at_us IS NOT NULL)
    )
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_actions_chain_link
    ON actions(COALESCE(prev_hash, ''));

CREATE TABLE IF NOT EXISTS action_dependencies (
    source_action_id TEXT NOT NULL REFERENCES actions(action_id),
    target_action_id TEXT NOT NULL REFERENCES actions(action_id),
    dependency_type TEXT NOT NULL
        CHECK (dependency_type IN ('blocks', 'triggers', 'relates_to')),
    created_by TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (source_action_id, target_action_id, dependency_type),
    CHECK (source_action_id <> target_action_id)
);

CREATE TABLE IF NOT EXISTS ledger_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO ledger_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes and append-only triggers.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_actions_active_created
    ON actions(is_voided, created_at_us DESC, seq DESC);

CREATE INDEX IF NOT EXISTS idx_actions_target_created
    ON actions(target_item, created_at_us, seq);

CREATE INDEX IF NOT EXISTS idx_actions_department
    ON actions(department, is_voided, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_actions_action_type
    ON actions(action_type, is_voided, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_actions_blueprint_target
    ON actions(process_blueprint_id, target_item, created_at_us);

CREATE INDEX IF NOT EXISTS idx_actions_parent
    ON actions(parent_action_id);

CREATE INDEX IF NOT EXISTS idx_action_dependencies_target
    ON action_dependencies(target_action_id, dependency_type);

CREATE TRIGGER IF NOT EXISTS actions_no_delete
BEFORE DELETE ON actions
BEGIN
    SELECT RAISE(ABORT, 'ledger records are append-only');
END;

CREATE TRIGGER IF NOT EXISTS actions_content_immutable
BEFORE UPDATE OF
    seq, action_id, hash, prev_hash, created_at_us, actor, action_type,
    target_item, target_type, department, description, pre_state, post_state,
    context_tags_json, metadata_json, process_blueprint_id, parent_action_id, step_id
ON actions
BEGIN
    SELECT RAISE(ABORT, 'ledger record content is immutable');
END;

CREATE TRIGGER IF NOT EXISTS actions_void_once
BEFORE UPDATE OF is_voided, void_reason, voided_by, voided_at_us ON actions
WHEN old.is_voided = 1
BEGIN
    SELECT RAISE(ABORT, 'voided records cannot change');
END;

CREATE TRIGGER IF NOT EXISTS action_dependencies_no_delete
BEFORE DELETE ON action_dependencies
BEGIN
    SELECT RAISE(ABORT, 'dependency edges are append-only');
END;

UPDATE ledger_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by list/timeline/status query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_actions_chain_link",
    "idx_actions_active_created",
    "idx_actions_target_created",
    "idx_actions_department",
    "idx_actions_action_type",
    "idx_actions_blueprint_target",
    "idx_actions_parent",
    "idx_action_dependencies_target",
];

/// Append-only guards installed by migration v2.
pub const REQUIRED_TRIGGERS: &[&str] = &[
    "actions_no_delete",
    "actions_content_immutable",
    "actions_void_once",
    "action_dependencies_no_delete",
];
