//! Error handling for recipe-store
//!
//! Wraps recipe-core ExError with store-specific constructors

use recipe_core::errors::{ExError, ExErrorKind};
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ChecksumMismatch)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a schema verification error
pub fn schema_mismatch(table: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::SchemaMismatch)
        .with_op("verify_schema")
        .with_entity(table)
        .with_message(reason)
}

/// Create an unknown stored procedure error
pub fn procedure_not_found(name: &str) -> ExError {
    ExError::new(ExErrorKind::ProcedureNotFound)
        .with_op("exec_procedure")
        .with_message(format!("Stored procedure {} does not exist", name))
}

/// Create a procedure parameter mismatch error
pub fn invalid_parameters(name: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidParameters)
        .with_op("exec_procedure")
        .with_entity(name)
        .with_message(reason)
}

/// Create a configuration error
pub fn config_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op("config")
        .with_message(reason)
}

/// Create an invalid query error (unknown column, bad paging)
pub fn invalid_query(entity: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("query")
        .with_entity(entity)
        .with_message(reason)
}

/// Create an error for an update or delete that matched no row
pub fn concurrency_error(entity: &str, key: impl ToString, affected: usize) -> ExError {
    ExError::new(ExErrorKind::Concurrency)
        .with_op("save_changes")
        .with_entity(entity)
        .with_entity_id(key)
        .with_message(format!(
            "expected to affect 1 row but affected {}; the row may have been modified or deleted",
            affected
        ))
}

/// Create the error reported once the retry budget is spent
pub fn retry_limit_exceeded(op: &str, retries: u32, last: ExError) -> ExError {
    ExError::new(ExErrorKind::RetryLimitExceeded)
        .with_op(op.to_string())
        .with_message(format!(
            "Maximum number of retries ({}) exceeded while executing database operations",
            retries
        ))
        .with_source(last)
}

/// Create a database error from rusqlite::Error
///
/// The SQLite result code decides the kind: busy and locked are
/// transient, constraint failures are integrity violations, anything else
/// is a plain persistence failure.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::Transient,
            ErrorCode::ConstraintViolation => ExErrorKind::ConstraintViolation,
            _ => ExErrorKind::Persistence,
        },
        rusqlite::Error::QueryReturnedNoRows => ExErrorKind::NotFound,
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ExErrorKind::Serialization,
        rusqlite::Error::InvalidParameterName(_) | rusqlite::Error::InvalidParameterCount(..) => {
            ExErrorKind::InvalidParameters
        }
        _ => ExErrorKind::Persistence,
    };

    ExError::new(kind)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a seed validation error
pub fn seed_validation(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("seed_import")
        .with_message(reason)
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
