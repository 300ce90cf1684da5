//! # CLI Error Mapping
//!
//! Converts library errors into what the user sees: a short code, a
//! message, and the process exit status.
//!
//! ```text
//! DbError / CoreError / SyncError ──► CliError { code, message } ──► stderr + exit code
//! ```

use serde::Serialize;
use std::fmt;
use std::process::ExitCode;

use bodega_core::CoreError;
use bodega_db::DbError;
use bodega_sync::SyncError;

/// Error reported to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    BusinessRule,
    DatabaseError,
    ConfigError,
    SyncError,
    Internal,
}

impl ErrorCode {
    /// Exit status for this kind of failure. Usage errors exit 2 (clap).
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::BusinessRule
            | ErrorCode::NotFound => 1,
            ErrorCode::ConfigError => 3,
            ErrorCode::DatabaseError | ErrorCode::SyncError | ErrorCode::Internal => 4,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn usage(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{:?}]: {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::InsufficientStock { .. } | CoreError::NegativeStock { .. } => {
                ErrorCode::InsufficientStock
            }
            CoreError::BusinessRule { .. } => ErrorCode::BusinessRule,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => e.into(),
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => CliError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvariantViolation(message) => {
                tracing::error!(%message, "Ledger invariant violated");
                CliError::new(ErrorCode::Internal, "Stock ledger is inconsistent; nothing was written")
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                CliError::new(ErrorCode::DatabaseError, other.to_string())
            }
        }
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        if err.is_config_error() {
            return CliError::new(ErrorCode::ConfigError, err.to_string());
        }
        match err {
            SyncError::DatabaseError(message) => CliError::new(ErrorCode::DatabaseError, message),
            other => CliError::new(ErrorCode::SyncError, other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::new(ErrorCode::Internal, format!("Failed to render output: {}", err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::new(ErrorCode::Internal, err.to_string())
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(err: tokio::task::JoinError) -> Self {
        CliError::new(ErrorCode::Internal, format!("Sync worker failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_message() {
        let err: CliError = DbError::Domain(CoreError::InsufficientStock {
            product_id: "p1".into(),
            product_name: "Rice".into(),
            requested: 6,
            available: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("available 5"));

        let err: CliError = DbError::rule("Sale s1 is canceled").into();
        assert_eq!(err.code, ErrorCode::BusinessRule);
        assert_eq!(err.message, "Sale s1 is canceled");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorCode::BusinessRule.exit_code(), 1);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 3);
        assert_eq!(ErrorCode::DatabaseError.exit_code(), 4);
    }

    #[test]
    fn test_config_errors() {
        let err: CliError = SyncError::InvalidUrl("ftp://x".into()).into();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
