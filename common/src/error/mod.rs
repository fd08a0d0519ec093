//! Error types for the persistence layer
//!
//! Every storage failure reaches the caller as one of three kinds: the row
//! was not found, a uniqueness constraint rejected the write, or something
//! else went wrong. Callers branch on [`Error::kind`] rather than matching
//! driver messages.

use std::fmt::Display;
use thiserror::Error;

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero rows matched an identifier-based read, update or delete
    NotFound,
    /// A uniqueness constraint rejected an insert
    Duplicate,
    /// Any other storage failure
    Other,
}

/// Persistence layer error type
#[derive(Debug, Error)]
pub enum Error {
    /// No row matched the lookup key
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A unique constraint rejected the write
    #[error("duplicate {entity}: violates unique constraint \"{constraint}\"")]
    Duplicate {
        entity: &'static str,
        constraint: String,
    },

    /// A check or foreign key constraint rejected the statement
    #[error("constraint \"{constraint}\" violated: {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// Input the storage layer cannot represent (too long, out of precision)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Another error annotated with what was being attempted
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a NotFound error
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Create a Duplicate error
    pub fn duplicate(entity: &'static str, constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            constraint: constraint.into(),
        }
    }

    /// Create a ConstraintViolation error
    pub fn constraint(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Classify the error, looking through any context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Duplicate { .. } => ErrorKind::Duplicate,
            Error::Context { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }

    /// Name of the violated constraint, if the failure came from one
    pub fn constraint_name(&self) -> Option<&str> {
        match self {
            Error::Duplicate { constraint, .. } => Some(constraint),
            Error::ConstraintViolation { constraint, .. } => Some(constraint),
            Error::Database(e) => e.as_database_error().and_then(|dbe| dbe.constraint()),
            Error::Context { source, .. } => source.constraint_name(),
            _ => None,
        }
    }
}

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T, E> ErrorExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| Error::Context {
            context: context_fn().to_string(),
            source: Box::new(e.into()),
        })
    }
}
