//! # Error Types
//!
//! Domain-specific error types for billbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  billbook-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  billbook-register errors                                              │
//! │  └── RegisterError    - What the UI sees (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → RegisterError → UI                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bad keystrokes in the cart grid are NOT errors: they are ignored in place
//! (see [`crate::cart::Cart::update_line`]).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// All of these are raised before anything is persisted.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Commit or hold was attempted on a cart without lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A debt sale needs a registered customer to owe the money.
    ///
    /// ## User Workflow
    /// ```text
    /// Pay with: Debt
    ///      │
    ///      ▼
    /// cart.customer == None?
    ///      │
    ///      ▼
    /// CustomerRequired ──► UI offers "add customer" dialog
    /// ```
    #[error("A registered customer is required for {method} payment")]
    CustomerRequired { method: String },

    /// The payment method cannot be used for this transition
    /// (e.g. committing with `Held`).
    #[error("Payment method {method} is not valid for {operation}")]
    InvalidPaymentMethod { method: String, operation: String },

    /// Bill is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Resuming a bill that is not held
    /// - Marking a held bill as paid
    #[error("Bill {bill_number} is {current_state}, cannot {operation}")]
    InvalidBillState {
        bill_number: String,
        current_state: String,
        operation: String,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The line or cart total would not fit in a money value.
    #[error("Amount too large for product {product_id}")]
    AmountTooLarge { product_id: String },

    /// Line index does not exist in the cart.
    #[error("Cart has no line {index}")]
    LineOutOfRange { index: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for catalog edits and configuration before any business logic runs.
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
    OutOfRange { field: String, min: String, max: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., letters in a phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
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
    fn test_error_messages() {
        let err = CoreError::CustomerRequired {
            method: "Debt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A registered customer is required for Debt payment"
        );

        let err = CoreError::InvalidBillState {
            bill_number: "BB-20260101-120000-001".to_string(),
            current_state: "held".to_string(),
            operation: "mark paid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Bill BB-20260101-120000-001 is held, cannot mark paid"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "tax_percent".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        };
        assert_eq!(err.to_string(), "tax_percent must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
