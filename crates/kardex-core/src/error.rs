//! # Error Types
//!
//! Domain-specific error types for kardex-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kardex-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures (stock, documents)      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kardex-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → HTTP layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers must be able to tell "bad input" apart from "not enough stock":
//! the first is a [`ValidationError`], the second is
//! [`CoreError::InsufficientStock`].

use thiserror::Error;

use crate::quantity::Quantity;
use crate::types::Location;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist, belongs to another company, or is inactive.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Branch does not exist, belongs to another company, or is inactive.
    #[error("Branch not found: {0}")]
    BranchNotFound(i64),

    /// Client does not exist, belongs to another company, or is inactive.
    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    /// The branch is not the company's active warehouse.
    #[error("Branch {0} is not the active warehouse")]
    WarehouseNotFound(i64),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    #[error("Stock transfer not found: {0}")]
    TransferNotFound(i64),

    /// A balance would go negative.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5) at BRANCH:3
    ///      │
    ///      ▼
    /// Conditional decrement: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 7, location: BRANCH:3, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole checkout rolls back, nothing is persisted
    /// ```
    #[error(
        "Insufficient stock for product {product_id} at {location}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: i64,
        location: Location,
        available: Quantity,
        requested: Quantity,
    },

    /// A document (transfer, sale, edit) ended up with no usable lines.
    #[error("{document} has no lines")]
    EmptyDocument { document: &'static str },

    /// Source and destination of a transfer are the same branch.
    #[error("Source and destination must be different (branch {0})")]
    SameLocation(i64),

    /// The same product appears on two lines of one document.
    #[error("Product {product_id} appears more than once")]
    DuplicateLine { product_id: i64 },

    /// Another active warehouse already exists for the company.
    #[error("Company already has an active warehouse (branch {existing_id})")]
    WarehouseConflict { existing_id: i64 },

    /// The warehouse still holds stock and cannot be deactivated.
    #[error("Warehouse {branch_id} still holds stock")]
    WarehouseHasStock { branch_id: i64 },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for failures caused by the request itself rather than by state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_)
                | CoreError::EmptyDocument { .. }
                | CoreError::SameLocation(_)
                | CoreError::DuplicateLine { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A signed value (adjustment delta) must be non-zero.
    #[error("{field} must not be zero")]
    MustNotBeZero { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set (unknown tag).
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn not_allowed(field: &str, allowed: &[&str]) -> Self {
        ValidationError::NotAllowed {
            field: field.to_string(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
