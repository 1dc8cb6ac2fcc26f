//! Error types for notekit operations

use crate::FieldType;
use thiserror::Error;

/// Record access errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Field not found: {field}")]
    FieldMissing { field: String },

    #[error("Field {field} has type {actual}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: FieldType,
    },

    #[error("Record is read-only")]
    ReadOnly,

    #[error("Store error: {reason}")]
    Store { reason: String },
}

/// A single resource that could not be released during a bulk release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    /// Canonical name of the resource.
    pub resource: String,
    /// Why the release failed.
    pub reason: String,
}

/// View cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Failed to open {resource} in container {container}: {reason}")]
    OpenFailed {
        container: String,
        resource: String,
        reason: String,
    },

    #[error("{} resource(s) failed to release", failures.len())]
    ReleaseFailed { failures: Vec<ReleaseFailure> },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Sort field list is empty")]
    EmptyFieldList,

    #[error("Sort field at position {index} is blank")]
    BlankFieldName { index: usize },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all notekit errors.
#[derive(Debug, Clone, Error)]
pub enum NotesError {
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for notekit operations.
pub type NotesResult<T> = Result<T, NotesError>;

// =============================================================================
// TESTS
// =============================================================================
