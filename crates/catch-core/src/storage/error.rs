//! Storage error handling
//!
//! Every variant is recoverable from the session's point of view: the order
//! ledger simply stops persisting.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during local storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage cannot be used at all this session
    #[error("Local storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// Failed to create the directory holding the database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Hint shown next to the error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::CreateDirectory { source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                Some("Point data_dir somewhere writable: catch config set data_dir <path>")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Database(_) => {
                Some("The order database may be locked by another process or corrupted.")
            }
            StorageError::Unavailable { .. } | StorageError::Io(_) => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_suggestion() {
        let err = StorageError::CreateDirectory {
            path: PathBuf::from("/root/catch"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };

        assert!(err.to_string().contains("/root/catch"));
        assert!(err.recovery_suggestion().unwrap().contains("data_dir"));
    }

    #[test]
    fn test_unavailable_display() {
        let err = StorageError::Unavailable {
            reason: "read-only filesystem".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("read-only"));
        assert!(err.recovery_suggestion().is_none());
    }
}
