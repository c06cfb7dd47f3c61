//! Document store error types following the aerodoc error-code convention
//!
//! Error codes:
//! - AERO_DUPLICATE_KEY (ERROR)
//! - AERO_NOT_FOUND (ERROR)
//! - AERO_INVALID_UPDATE (ERROR)
//! - AERO_INVALID_DOCUMENT (ERROR)
//! - AERO_INVALID_INDEX (ERROR)
//! - AERO_INVALID_FILTER (ERROR)
//! - AERO_INVALID_PIPELINE (ERROR)
//! - AERO_COLLECTION_EXISTS (ERROR)
//! - AERO_UNKNOWN_COLLECTION (ERROR)
//! - AERO_INVALID_NAME (ERROR)
//!
//! Subsystem errors (index, query, aggregation) convert into [`StoreError`]
//! keeping their code and message.

use std::fmt;

use crate::aggregation::{PipelineError, PipelineErrorCode};
use crate::index::{IndexError, IndexErrorCode};
use crate::query::QueryError;

/// Severity levels for store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation rejected, engine state unchanged
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// `_id` or a unique index key already taken
    AeroDuplicateKey,
    /// No document with the given identifier
    AeroNotFound,
    /// Malformed update operation
    AeroInvalidUpdate,
    /// Document rejected on insert (bad `_id`)
    AeroInvalidDocument,
    /// Malformed or conflicting index definition
    AeroInvalidIndex,
    /// Malformed filter or find options
    AeroInvalidFilter,
    /// Malformed aggregation pipeline
    AeroInvalidPipeline,
    /// Collection name already in use
    AeroCollectionExists,
    /// No collection with the given name
    AeroUnknownCollection,
    /// Empty or malformed collection name
    AeroInvalidName,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::AeroDuplicateKey => "AERO_DUPLICATE_KEY",
            StoreErrorCode::AeroNotFound => "AERO_NOT_FOUND",
            StoreErrorCode::AeroInvalidUpdate => "AERO_INVALID_UPDATE",
            StoreErrorCode::AeroInvalidDocument => "AERO_INVALID_DOCUMENT",
            StoreErrorCode::AeroInvalidIndex => "AERO_INVALID_INDEX",
            StoreErrorCode::AeroInvalidFilter => "AERO_INVALID_FILTER",
            StoreErrorCode::AeroInvalidPipeline => "AERO_INVALID_PIPELINE",
            StoreErrorCode::AeroCollectionExists => "AERO_COLLECTION_EXISTS",
            StoreErrorCode::AeroUnknownCollection => "AERO_UNKNOWN_COLLECTION",
            StoreErrorCode::AeroInvalidName => "AERO_INVALID_NAME",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error type with full context
#[derive(Debug, Clone)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `_id` already present in the collection
    pub fn duplicate_id(collection: &str, id: impl fmt::Display) -> Self {
        Self::new(
            StoreErrorCode::AeroDuplicateKey,
            format!("duplicate _id {} in collection '{}'", id, collection),
        )
    }

    /// No document with this identifier
    pub fn not_found(collection: &str, id: impl fmt::Display) -> Self {
        Self::new(
            StoreErrorCode::AeroNotFound,
            format!("no document with _id {} in collection '{}'", id, collection),
        )
    }

    /// Malformed update operation
    pub fn invalid_update(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::AeroInvalidUpdate, reason)
    }

    /// Document cannot be stored
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::AeroInvalidDocument, reason)
    }

    /// Collection name already in use
    pub fn collection_exists(name: &str) -> Self {
        Self::new(
            StoreErrorCode::AeroCollectionExists,
            format!("collection '{}' already exists", name),
        )
    }

    /// No such collection
    pub fn unknown_collection(name: &str) -> Self {
        Self::new(
            StoreErrorCode::AeroUnknownCollection,
            format!("collection '{}' does not exist", name),
        )
    }

    /// Collection name rejected
    pub fn invalid_name(name: &str, reason: &str) -> Self {
        Self::new(
            StoreErrorCode::AeroInvalidName,
            format!("invalid collection name '{}': {}", name, reason),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<IndexError> for StoreError {
    fn from(err: IndexError) -> Self {
        let code = match err.code() {
            IndexErrorCode::AeroDuplicateKey => StoreErrorCode::AeroDuplicateKey,
            IndexErrorCode::AeroInvalidIndex => StoreErrorCode::AeroInvalidIndex,
            IndexErrorCode::AeroTextIndexRequired => StoreErrorCode::AeroInvalidFilter,
        };
        Self::new(code, err.message())
    }
}

impl From<QueryError> for StoreError {
    fn from(err: QueryError) -> Self {
        Self::new(StoreErrorCode::AeroInvalidFilter, err.message())
    }
}

impl From<PipelineError> for StoreError {
    fn from(err: PipelineError) -> Self {
        let code = match err.code() {
            PipelineErrorCode::AeroInvalidPipeline => StoreErrorCode::AeroInvalidPipeline,
            PipelineErrorCode::AeroInvalidFilter => StoreErrorCode::AeroInvalidFilter,
        };
        Self::new(code, err.message())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
