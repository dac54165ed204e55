use thiserror::Error;

/// Result type alias using RecipeError
pub type Result<T> = std::result::Result<T, RecipeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers and tests can match
/// on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidDecimal,

    // Lookup / tracking
    NotFound,
    NotTracked,
    InvalidState,

    // Store-enforced integrity
    ConstraintViolation,
    /// An update or delete matched no row
    Concurrency,

    // Schema and migrations
    Migration,
    ChecksumMismatch,
    SchemaMismatch,

    // Stored procedures
    ProcedureNotFound,
    InvalidParameters,

    // Execution strategy
    /// Busy or locked store; worth retrying
    Transient,
    /// A transient failure persisted past the configured retry count
    RetryLimitExceeded,

    // Integration/IO
    Configuration,
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDecimal => "ERR_INVALID_DECIMAL",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::NotTracked => "ERR_NOT_TRACKED",
            ExErrorKind::InvalidState => "ERR_INVALID_STATE",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Migration => "ERR_MIGRATION",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            ExErrorKind::ProcedureNotFound => "ERR_PROCEDURE_NOT_FOUND",
            ExErrorKind::InvalidParameters => "ERR_INVALID_PARAMETERS",
            ExErrorKind::Transient => "ERR_TRANSIENT",
            ExErrorKind::RetryLimitExceeded => "ERR_RETRY_LIMIT_EXCEEDED",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether an operation failing with this kind may succeed if repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, ExErrorKind::Transient)
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// (operation, entity, key) needed to read a failure out of a log line.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    entity_id: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity (table) context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add entity key context
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Whether retrying the failed operation could succeed
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        match (&self.entity, &self.entity_id) {
            (Some(entity), Some(id)) => write!(f, " ({} {})", entity, id)?,
            (Some(entity), None) => write!(f, " ({})", entity)?,
            (None, Some(id)) => write!(f, " (id: {})", id)?,
            (None, None) => {}
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised before anything reaches the store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    /// A required text field is empty
    #[error("{entity}.{field} is required")]
    FieldRequired {
        entity: &'static str,
        field: &'static str,
    },

    /// A text field exceeds its column length
    #[error("{entity}.{field} is {actual} characters long, the limit is {max}")]
    FieldTooLong {
        entity: &'static str,
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// A decimal literal could not be parsed or does not fit the column
    #[error("Invalid decimal '{input}': {reason}")]
    InvalidDecimal { input: String, reason: String },

    /// A keyed lookup found nothing
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The handle does not belong to this session
    #[error("{entity} is not tracked by this context")]
    NotTracked { entity: &'static str },

    /// The operation conflicts with the entity's tracking state
    #[error("{entity} {id} is {state}: {reason}")]
    InvalidState {
        entity: &'static str,
        id: String,
        state: String,
        reason: String,
    },
}

impl From<RecipeError> for ExError {
    fn from(err: RecipeError) -> Self {
        let message = err.to_string();
        match err {
            RecipeError::FieldRequired { entity, .. } | RecipeError::FieldTooLong { entity, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("validate")
                    .with_entity(entity)
                    .with_message(message)
            }
            RecipeError::InvalidDecimal { .. } => {
                ExError::new(ExErrorKind::InvalidDecimal).with_message(message)
            }
            RecipeError::NotFound { entity, id } => ExError::new(ExErrorKind::NotFound)
                .with_entity(entity)
                .with_entity_id(id)
                .with_message(message),
            RecipeError::NotTracked { entity } => ExError::new(ExErrorKind::NotTracked)
                .with_entity(entity)
                .with_message(message),
            RecipeError::InvalidState { entity, id, .. } => {
                ExError::new(ExErrorKind::InvalidState)
                    .with_entity(entity)
                    .with_entity_id(id)
                    .with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::InvalidInput,
            ExErrorKind::InvalidDecimal,
            ExErrorKind::NotFound,
            ExErrorKind::NotTracked,
            ExErrorKind::InvalidState,
            ExErrorKind::ConstraintViolation,
            ExErrorKind::Concurrency,
            ExErrorKind::Migration,
            ExErrorKind::ChecksumMismatch,
            ExErrorKind::SchemaMismatch,
            ExErrorKind::ProcedureNotFound,
            ExErrorKind::InvalidParameters,
            ExErrorKind::Transient,
            ExErrorKind::RetryLimitExceeded,
            ExErrorKind::Configuration,
            ExErrorKind::Io,
            ExErrorKind::Serialization,
            ExErrorKind::Persistence,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ExErrorKind::Transient.is_transient());
        assert!(!ExErrorKind::ConstraintViolation.is_transient());
        assert!(!ExErrorKind::RetryLimitExceeded.is_transient());
    }

    #[test]
    fn test_display_includes_context_and_source() {
        let err = ExError::new(ExErrorKind::RetryLimitExceeded)
            .with_op("save_changes")
            .with_message("gave up after 3 retries")
            .with_source(ExError::new(ExErrorKind::Transient).with_message("database is locked"));

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_RETRY_LIMIT_EXCEEDED]"));
        assert!(rendered.contains("save_changes"));
        assert!(rendered.contains("database is locked"));
    }

    #[test]
    fn test_std_error_source_chain() {
        use std::error::Error;

        let err = ExError::new(ExErrorKind::Persistence)
            .with_source(ExError::new(ExErrorKind::Io).with_message("disk gone"));
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("disk gone"));
    }
}
