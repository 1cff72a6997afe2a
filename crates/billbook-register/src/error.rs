//! # Register Error Type
//!
//! Unified error type for register operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Billbook POS                           │
//! │                                                                         │
//! │  Checkout screen             Register                                   │
//! │  ───────────────             ────────                                   │
//! │                                                                         │
//! │  register.commit(Debt)                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  RegisterResult<T>                                               │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Validation? ─── CoreError::CustomerRequired ───────┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Storage? ────── DbError::TransactionFailed ── RegisterError ──►│  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Success                                    ErrorPayload        │  │
//! │  │                                             { code, message }   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The UI switches on [`ErrorCode`]; the message is for display only.

use serde::Serialize;
use thiserror::Error;

use billbook_core::{CoreError, ValidationError};
use billbook_db::DbError;

use crate::config::ConfigError;

/// Errors surfaced by the register and the catalog service.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Business rule or input validation failed. Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed. The cart is left as it was.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Bill, product or customer does not exist (or is not in a usable state).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A product code or customer phone is already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Customers with bills on record cannot be deleted.
    #[error("Customer {name} has {bill_count} bill(s) and cannot be deleted")]
    CustomerHasBills { name: String, bill_count: i64 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegisterError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        RegisterError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable category for the UI.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegisterError::Core(err) => match err {
                CoreError::EmptyCart
                | CoreError::CartTooLarge { .. }
                | CoreError::AmountTooLarge { .. }
                | CoreError::LineOutOfRange { .. } => ErrorCode::CartError,
                CoreError::CustomerRequired { .. } => ErrorCode::CustomerRequired,
                CoreError::InvalidPaymentMethod { .. } | CoreError::InvalidBillState { .. } => {
                    ErrorCode::BusinessLogic
                }
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            RegisterError::Database(DbError::NotFound { .. }) | RegisterError::NotFound { .. } => {
                ErrorCode::NotFound
            }
            RegisterError::Database(DbError::UniqueViolation { .. })
            | RegisterError::Duplicate { .. } => ErrorCode::Duplicate,
            RegisterError::Database(_) => ErrorCode::DatabaseError,
            RegisterError::CustomerHasBills { .. } => ErrorCode::BusinessLogic,
            RegisterError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// The `{ code, message }` pair shown to the cashier.
    ///
    /// Storage internals are logged and replaced by a generic message.
    pub fn payload(&self) -> ErrorPayload {
        let message = match self {
            RegisterError::Database(DbError::UniqueViolation { field, value }) => {
                format!("{} '{}' already exists", field, value)
            }
            RegisterError::Database(DbError::NotFound { entity, id }) => {
                format!("{} not found: {}", entity, id)
            }
            RegisterError::Database(DbError::ForeignKeyViolation { message }) => {
                tracing::error!("Foreign key violation: {}", message);
                "Invalid reference".to_string()
            }
            RegisterError::Database(err) => {
                tracing::error!("Database operation failed: {}", err);
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorPayload {
            code: self.code(),
            message,
        }
    }
}

impl From<ValidationError> for RegisterError {
    fn from(err: ValidationError) -> Self {
        RegisterError::Core(CoreError::Validation(err))
    }
}

/// Error codes for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    Duplicate,
    /// Cart is empty, full, or the line does not exist.
    CartError,
    /// Debt payment without a selected customer.
    CustomerRequired,
    BusinessLogic,
    DatabaseError,
    ConfigError,
}

/// Serialized form of an error:
/// ```json
/// { "code": "CUSTOMER_REQUIRED", "message": "A registered customer is required for Debt payment" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

pub type RegisterResult<T> = Result<T, RegisterError>;
