//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the context,
//! the command logger and the error facility.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_SAVE_ID: &str = "save_id";

// Entity identifiers
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_RECIPE_ID: &str = "recipe_id";

// Command logging
pub const FIELD_SQL: &str = "sql";
pub const FIELD_PARAMS: &str = "params";
pub const FIELD_BATCH: &str = "batch";
pub const FIELD_BATCH_SIZE: &str = "batch_size";
pub const FIELD_ATTEMPT: &str = "attempt";
pub const FIELD_ROWS: &str = "rows";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_COMMAND: &str = "command";
pub const EVENT_BATCH: &str = "batch";
pub const EVENT_RETRY: &str = "retry";

/// Placeholder written in place of parameter values when sensitive data
/// logging is disabled.
pub const REDACTED_PARAMS: &str = "?";
