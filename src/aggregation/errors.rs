//! Aggregation error types following the aerodoc error-code convention
//!
//! Error codes:
//! - AERO_INVALID_PIPELINE (ERROR)
//! - AERO_INVALID_FILTER (ERROR)

use std::fmt;

use crate::query::QueryError;

/// Severity levels for pipeline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Pipeline rejected before any stage ran
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Pipeline error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorCode {
    /// Malformed stage
    AeroInvalidPipeline,
    /// Malformed filter inside a `match` stage
    AeroInvalidFilter,
}

impl PipelineErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineErrorCode::AeroInvalidPipeline => "AERO_INVALID_PIPELINE",
            PipelineErrorCode::AeroInvalidFilter => "AERO_INVALID_FILTER",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for PipelineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Pipeline error type
#[derive(Debug, Clone)]
pub struct PipelineError {
    code: PipelineErrorCode,
    stage: Option<usize>,
    message: String,
}

impl PipelineError {
    /// Malformed stage at position `stage`
    pub fn invalid_stage(stage: usize, reason: impl Into<String>) -> Self {
        Self {
            code: PipelineErrorCode::AeroInvalidPipeline,
            stage: Some(stage),
            message: format!("stage {}: {}", stage, reason.into()),
        }
    }

    /// Malformed pipeline as a whole
    pub fn invalid_pipeline(reason: impl Into<String>) -> Self {
        Self {
            code: PipelineErrorCode::AeroInvalidPipeline,
            stage: None,
            message: reason.into(),
        }
    }

    /// Bad filter in the `match` stage at position `stage`
    pub fn invalid_filter(stage: usize, err: QueryError) -> Self {
        Self {
            code: PipelineErrorCode::AeroInvalidFilter,
            stage: Some(stage),
            message: format!("stage {}: {}", stage, err.message()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PipelineErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Position of the offending stage, if one is to blame
    pub fn stage(&self) -> Option<usize> {
        self.stage
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for PipelineError {}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_is_reported() {
        let err = PipelineError::invalid_stage(2, "limit must be > 0");
        assert_eq!(err.stage(), Some(2));
        assert_eq!(
            err.to_string(),
            "[ERROR] AERO_INVALID_PIPELINE: stage 2: limit must be > 0"
        );
    }

    #[test]
    fn test_filter_errors_keep_filter_code() {
        let err = PipelineError::invalid_filter(0, QueryError::invalid_filter("empty and"));
        assert_eq!(err.code(), PipelineErrorCode::AeroInvalidFilter);
    }
}
