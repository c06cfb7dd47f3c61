//! Snapshot errors
//!
//! Error codes:
//! - AERO_SNAPSHOT_IO (ERROR)
//! - AERO_SNAPSHOT_CORRUPTION (FATAL)
//! - AERO_SNAPSHOT_RESTORE (ERROR)

use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on snapshot: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot corrupted at byte {offset}: {reason}")]
    Corruption { offset: usize, reason: String },

    /// Records pass their checksums but do not fit together
    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),

    /// The file is intact but its contents cannot be stored
    #[error("snapshot contents rejected: {0}")]
    Restore(#[from] StoreError),
}

impl SnapshotError {
    pub(crate) fn corruption(offset: usize, reason: impl Into<String>) -> Self {
        SnapshotError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotError::Io(_) => "AERO_SNAPSHOT_IO",
            SnapshotError::Corruption { .. } | SnapshotError::Inconsistent(_) => {
                "AERO_SNAPSHOT_CORRUPTION"
            }
            SnapshotError::Restore(_) => "AERO_SNAPSHOT_RESTORE",
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            SnapshotError::Corruption { .. } | SnapshotError::Inconsistent(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_display() {
        let err = SnapshotError::corruption(12, "checksum mismatch");
        assert_eq!(err.code(), "AERO_SNAPSHOT_CORRUPTION");
        assert!(err.is_corruption());
        assert_eq!(err.to_string(), "snapshot corrupted at byte 12: checksum mismatch");

        let err: SnapshotError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), "AERO_SNAPSHOT_IO");
    }
}
