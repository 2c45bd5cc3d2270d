//! Error handling for the precinct ledger

use std::fmt;

/// Result type alias for the ledger
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record a failed lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Precinct,
    Ballot,
    ElectionReturn,
    Inspector,
    Mark,
    Mapping,
    Position,
    Candidate,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Precinct => "Precinct",
            Entity::Ballot => "Ballot",
            Entity::ElectionReturn => "Election return",
            Entity::Inspector => "Inspector",
            Entity::Mark => "Mark",
            Entity::Mapping => "Mapping",
            Entity::Position => "Position",
            Entity::Candidate => "Candidate",
        };
        f.write_str(name)
    }
}

/// Caller-facing classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    ValidationFailed,
    PreconditionFailed,
    Internal,
}

/// Main error type for the ledger
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A referenced record does not exist
    #[error("{entity} [{code}] not found")]
    NotFound { entity: Entity, code: String },

    /// Malformed input or out-of-range values
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// The operation is not allowed in the current state
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// Backend storage failures
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new not-found error
    pub fn not_found(entity: Entity, code: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            code: code.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error for the adapter boundary
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::NotFound { .. } => Outcome::NotFound,
            Error::Validation { .. } | Error::Serialization(_) => Outcome::ValidationFailed,
            Error::Precondition { .. } => Outcome::PreconditionFailed,
            Error::Storage { .. } | Error::Io(_) | Error::Internal { .. } => Outcome::Internal,
        }
    }

    /// HTTP-style status for adapters that speak one
    pub fn status_code(&self) -> u16 {
        match self.outcome() {
            Outcome::NotFound => 404,
            Outcome::ValidationFailed => 422,
            Outcome::PreconditionFailed => 409,
            Outcome::Internal => 500,
        }
    }

    /// Whether this is a not-found error for the given entity
    pub fn is_not_found(&self, wanted: Entity) -> bool {
        matches!(self, Error::NotFound { entity, .. } if *entity == wanted)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::storage(err.to_string())
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $msg:expr) => {
        $crate::Error::validation($field, $msg)
    };
    ($field:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::Error::validation($field, format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! precondition_error {
    ($msg:expr) => {
        $crate::Error::precondition($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::precondition(format!($fmt, $($arg)*))
    };
}
