//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── LedgerError      - The engine's domain taxonomy                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → LedgerError ← DbError (mapped by the engine)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, figures, ID)
//! 3. Errors are enum variants, never String
//! 4. Every precondition failure carries the figures a caller needs to
//!    render an actionable message

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Ledger Error
// =============================================================================

/// The transaction engine's error taxonomy.
///
/// Every `post`/`reverse`/`adjust` failure is one of these kinds; none are
/// silently downgraded, and no partial application is ever committed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Posted or adjusted amount was not positive.
    #[error("Invalid amount: {amount_cents} cents (must be positive)")]
    InvalidAmount { amount_cents: i64 },

    /// Sale quantity was not positive (or exceeded the sanity cap).
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})")]
    InvalidQuantity { quantity: i64, max: i64 },

    /// Referenced category, item, or ledger entry does not exist.
    ///
    /// ## When This Occurs
    /// - Bad reference in a post request
    /// - Reversing an already-reversed entry (the row is gone)
    /// - Adjusting a reversed entry
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Sale requested more units than are on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Post sale (qty: 5)
    ///      │
    ///      ▼
    /// Guarded decrement fails: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "COKE-330", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Caller shows: "Only 3 COKE-330 in stock"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Expense exceeded derived profit, or withdrawal exceeded derived
    /// capital health.
    #[error("Insufficient funds: {fund} is {available}, requested {requested}")]
    InsufficientFunds {
        /// Which derived figure was short: "profit" or "capital health".
        fund: &'static str,
        available: Money,
        requested: Money,
    },

    /// A reversal found the sale's inventory item deleted out-of-band.
    ///
    /// Stock restoration is skipped and the condition surfaced; nothing is
    /// committed.
    #[error("Inventory item missing for reversal: {item_id}")]
    InventoryItemMissing { item_id: String },

    /// Writer conflicts persisted past the engine's bounded retries.
    #[error("Concurrent modification, retries exhausted")]
    ConcurrentModification,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// True infrastructure failure (store unreachable, pool closed, ...).
    /// Kept distinct from every domain kind above.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., invalid characters in an item code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = LedgerError::InsufficientStock {
            code: "COKE-330".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COKE-330: available 3, requested 5"
        );
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            fund: "capital health",
            available: Money::from_cents(120_00),
            requested: Money::from_cents(150_00),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: capital health is $120.00, requested $150.00"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = LedgerError::not_found("LedgerEntry", "abc-123");
        assert_eq!(err.to_string(), "LedgerEntry not found: abc-123");
    }

    #[test]
    fn test_validation_converts_to_ledger_error() {
        let validation_err = ValidationError::Required {
            field: "fund_source".to_string(),
        };
        let err: LedgerError = validation_err.into();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
