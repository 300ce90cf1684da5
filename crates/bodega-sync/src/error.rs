//! # Sync Error Types
//!
//! Error types for replication. None of these reach a local write caller:
//! a failed push is recorded on the record as `last_sync_error`.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Remote      │  │     Local               │ │
//! │  │                 │  │  (RemoteError)  │  │                         │ │
//! │  │  InvalidConfig  │  │  Timeout        │  │  DatabaseError          │ │
//! │  │  InvalidUrl     │  │  Unavailable    │  │  RecordNotFound         │ │
//! │  │  ConfigLoad/Save│  │  Rejected       │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::EntityKind;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure talking to the remote document store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The call didn't finish within the request timeout.
    #[error("Remote request timed out after {0} ms")]
    Timeout(u64),

    /// Network-level failure (DNS, refused connection, TLS...).
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// The remote answered with an error status.
    #[error("Remote rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl RemoteError {
    /// Server-side and throttling rejections are worth retrying; client
    /// errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Timeout(_) | RemoteError::Unavailable(_) => true,
            RemoteError::Rejected { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => RemoteError::Unavailable(err.to_string()),
        }
    }
}

/// Sync error type covering all replication failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Remote URL failed to parse or has the wrong scheme.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Reading or updating local sync metadata failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The record to push no longer exists locally.
    #[error("{kind} {id} not found locally")]
    RecordNotFound { kind: EntityKind, id: String },

    /// Failed to build the remote document.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Coordinator Errors
    // =========================================================================
    /// The coordinator has stopped accepting commands.
    #[error("Sync coordinator is shutting down")]
    ShuttingDown,

    /// A push task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<bodega_db::DbError> for SyncError {
    fn from(err: bodega_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later sweep may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(remote) => remote.is_retryable(),
            SyncError::DatabaseError(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Remote(RemoteError::Timeout(5_000)).is_retryable());
        assert!(SyncError::Remote(RemoteError::Unavailable("refused".into())).is_retryable());
        assert!(SyncError::Remote(RemoteError::Rejected {
            status: 503,
            message: "busy".into()
        })
        .is_retryable());

        assert!(!SyncError::Remote(RemoteError::Rejected {
            status: 403,
            message: "forbidden".into()
        })
        .is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidUrl("ftp://x".into()).is_config_error());
        assert!(!SyncError::ShuttingDown.is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::RecordNotFound {
            kind: EntityKind::Sale,
            id: "s-1".into(),
        };
        assert_eq!(err.to_string(), "sale s-1 not found locally");
        assert_eq!(
            SyncError::Remote(RemoteError::Timeout(250)).to_string(),
            "Remote request timed out after 250 ms"
        );
    }
}
