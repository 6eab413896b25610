//! Error types shared across the core library
//!
//! Three recoverable families:
//! - [`ValidationError`]: malformed user input, rejected before any mutation
//! - [`SyncError`]: the realtime backend misbehaved; the session keeps working
//!   on local state and reports degraded sync
//! - [`StorageError`](crate::storage::StorageError): local storage failed; the
//!   order ledger falls back to memory for the rest of the session

use thiserror::Error;

/// Input that cannot be turned into a valid record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Price text did not parse as a finite number
    #[error("Invalid price '{value}': expected a number like 12.50")]
    InvalidPrice { value: String },

    /// Status text was neither "available" nor "unavailable"
    #[error("Invalid status '{value}': expected 'available' or 'unavailable'")]
    InvalidStatus { value: String },

    /// Store id is empty or contains characters the remote path cannot hold
    #[error("Invalid store name '{value}': {reason}")]
    InvalidStoreId { value: String, reason: &'static str },

    /// Edit form named a field that does not exist
    #[error("Unknown fish field '{name}'. Valid fields: name, price, status, desc, image")]
    UnknownField { name: String },

    /// No fish with this key in the current inventory
    #[error("No fish with key '{key}'")]
    UnknownFish { key: String },

    /// Locale tag has no currency rule
    #[error("Unknown locale '{tag}'. Supported: en-US, en-GB, de-DE, fr-FR")]
    UnknownLocale { tag: String },
}

/// Failures talking to the realtime backend
#[derive(Error, Debug)]
pub enum SyncError {
    /// Could not reach the relay server
    #[error("Failed to connect to realtime server '{url}': {reason}")]
    Connect { url: String, reason: String },

    /// The connection or background task is gone
    #[error("Realtime connection closed")]
    Closed,

    /// The peer sent something we do not understand
    #[error("Realtime protocol error: {0}")]
    Protocol(String),

    /// A message could not be encoded for the wire
    #[error("Failed to encode realtime message: {0}")]
    Encode(String),

    /// Local file backing an in-process tree failed
    #[error("Realtime tree I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Short description used by status indicators
    pub fn summary(&self) -> String {
        match self {
            SyncError::Connect { .. } => "offline".to_string(),
            SyncError::Closed => "disconnected".to_string(),
            SyncError::Protocol(_) | SyncError::Encode(_) => "protocol error".to_string(),
            SyncError::Io(_) => "disk error".to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => SyncError::Closed,
            WsError::Io(e) => SyncError::Io(e),
            other => SyncError::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = ValidationError::InvalidPrice {
            value: "cheap".to_string(),
        };
        assert!(err.to_string().contains("cheap"));

        let err = ValidationError::InvalidStoreId {
            value: "a/b".to_string(),
            reason: "must not contain '/'",
        };
        assert!(err.to_string().contains("a/b"));
        assert!(err.to_string().contains("'/'"));
    }

    #[test]
    fn test_sync_error_summary() {
        let err = SyncError::Connect {
            url: "ws://localhost:3030".to_string(),
            reason: "refused".to_string(),
        };
        assert_eq!(err.summary(), "offline");
        assert!(err.to_string().contains("ws://localhost:3030"));
        assert_eq!(SyncError::Closed.summary(), "disconnected");
    }
}
