//! Index error types following the aerodoc error-code convention
//!
//! Error codes:
//! - AERO_DUPLICATE_KEY (ERROR)
//! - AERO_INVALID_INDEX (ERROR)
//! - AERO_TEXT_INDEX_REQUIRED (ERROR)

use std::fmt;

/// Severity levels for index errors
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

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// A unique index already holds this key for another document
    AeroDuplicateKey,
    /// Index definition is malformed or conflicts with an existing one
    AeroInvalidIndex,
    /// Text search issued against a collection without a text index
    AeroTextIndexRequired,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::AeroDuplicateKey => "AERO_DUPLICATE_KEY",
            IndexErrorCode::AeroInvalidIndex => "AERO_INVALID_INDEX",
            IndexErrorCode::AeroTextIndexRequired => "AERO_TEXT_INDEX_REQUIRED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    /// Name of the index involved, if any
    index_name: Option<String>,
}

impl IndexError {
    /// Unique constraint violation on `index_name`
    pub fn duplicate_key(index_name: impl Into<String>, key: impl fmt::Display) -> Self {
        let index_name = index_name.into();
        Self {
            code: IndexErrorCode::AeroDuplicateKey,
            message: format!("duplicate key {} for unique index '{}'", key, index_name),
            index_name: Some(index_name),
        }
    }

    /// Malformed or conflicting index definition
    pub fn invalid_index(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::AeroInvalidIndex,
            message: reason.into(),
            index_name: None,
        }
    }

    /// Text search without a text index
    pub fn text_index_required() -> Self {
        Self {
            code: IndexErrorCode::AeroTextIndexRequired,
            message: "text search requires a text index on the collection".to_string(),
            index_name: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns the index name if applicable
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexErrorCode::AeroDuplicateKey.code(), "AERO_DUPLICATE_KEY");
        assert_eq!(IndexErrorCode::AeroInvalidIndex.code(), "AERO_INVALID_INDEX");
        assert_eq!(
            IndexErrorCode::AeroTextIndexRequired.code(),
            "AERO_TEXT_INDEX_REQUIRED"
        );
    }

    #[test]
    fn test_duplicate_key_display() {
        let err = IndexError::duplicate_key("sku_1", "(\"A\")");
        let display = format!("{}", err);
        assert!(display.contains("AERO_DUPLICATE_KEY"));
        assert!(display.contains("ERROR"));
        assert!(display.contains("sku_1"));
        assert_eq!(err.index_name(), Some("sku_1"));
    }
}
