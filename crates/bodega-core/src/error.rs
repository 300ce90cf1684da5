//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bodega-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  bodega-db errors                                                      │
//! │  └── DbError          - Storage failures, wraps CoreError as Domain    │
//! │                                                                         │
//! │  bodega-sync errors                                                    │
//! │  └── SyncError        - Never reaches write callers                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError::Domain → CLI             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business conditions (not enough stock, editing a canceled sale) are
//! ordinary `Err` values that callers match on. They never panic and are
//! never retried.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds the stock available for a product.
    ///
    /// ## When This Occurs
    /// - Creating a sale that sells more than the shelf holds
    /// - Updating a sale whose new lines exceed the stock left after the
    ///   old lines are given back
    ///
    /// ## User Workflow
    /// ```text
    /// sale create --item p1:5
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_name: "Rice 1kg", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Nothing written, caller shows "Only 3 Rice 1kg in stock"
    /// ```
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// A business rule forbids the operation.
    ///
    /// ## When This Occurs
    /// - Editing a CANCELED sale
    /// - Referencing a product or customer that doesn't exist
    /// - Recording a movement whose direction contradicts its reason
    #[error("{message}")]
    BusinessRule { message: String },

    /// The ledger refused a movement that would drive stock below zero.
    ///
    /// Stock is never clamped; the movement is rejected and nothing is
    /// written.
    #[error("Movement of {quantity} would make stock of {product_id} negative (current {previous_stock})")]
    NegativeStock {
        product_id: String,
        previous_stock: i64,
        quantity: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a BusinessRule error.
    pub fn rule(message: impl Into<String>) -> Self {
        CoreError::BusinessRule {
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before any storage work starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid SKU characters, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "p1".to_string(),
            product_name: "Rice 1kg".to_string(),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rice 1kg: available 3, requested 5"
        );
    }

    #[test]
    fn test_business_rule_message() {
        let err = CoreError::rule("Canceled sales cannot be edited");
        assert_eq!(err.to_string(), "Canceled sales cannot be edited");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
