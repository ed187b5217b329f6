//! # Validation Module
//!
//! Input validation utilities for the Tally bookkeeping core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (out-of-scope UI / transport)                         │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry point (Rust)                                    │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field validation, before any mutation                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{LedgerError, LedgerResult, ValidationError, ValidationResult};
use crate::{MAX_FUND_SOURCE_LEN, MAX_SALE_QUANTITY};

// =============================================================================
// Amount / Quantity Validators
// =============================================================================

/// Validates a posted or adjusted amount.
///
/// ## Rules
/// - Must be strictly positive (the entry's `kind` carries the sign meaning)
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents(100).is_ok());
/// assert!(validate_amount_cents(0).is_err());
/// assert!(validate_amount_cents(-5).is_err());
/// ```
pub fn validate_amount_cents(amount_cents: i64) -> LedgerResult<()> {
    if amount_cents <= 0 {
        return Err(LedgerError::InvalidAmount { amount_cents });
    }
    Ok(())
}

/// Validates a sale quantity.
///
/// ## Rules
/// - Must be strictly positive
/// - Must not exceed [`MAX_SALE_QUANTITY`] (fat-finger guard)
pub fn validate_quantity(quantity: i64) -> LedgerResult<()> {
    if quantity <= 0 || quantity > MAX_SALE_QUANTITY {
        return Err(LedgerError::InvalidQuantity {
            quantity,
            max: MAX_SALE_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item code (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_item_code;
///
/// assert!(validate_item_code("COKE-330").is_ok());
/// assert!(validate_item_code("").is_err());
/// assert!(validate_item_code("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    // Check for valid characters (alphanumeric, hyphen, underscore)
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a category or item name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates the free-text fund source field.
///
/// ## Rules
/// - Must not be empty (every entry records its provenance)
/// - Must be at most [`MAX_FUND_SOURCE_LEN`] characters
pub fn validate_fund_source(fund_source: &str) -> ValidationResult<()> {
    let fund_source = fund_source.trim();

    if fund_source.is_empty() {
        return Err(ValidationError::Required {
            field: "fund_source".to_string(),
        });
    }

    if fund_source.len() > MAX_FUND_SOURCE_LEN {
        return Err(ValidationError::TooLong {
            field: "fund_source".to_string(),
            max: MAX_FUND_SOURCE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount_cents(1).is_ok());
        assert!(validate_amount_cents(100_00).is_ok());
        assert!(matches!(
            validate_amount_cents(0),
            Err(LedgerError::InvalidAmount { amount_cents: 0 })
        ));
        assert!(validate_amount_cents(-100).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_SALE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_SALE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_item_code() {
        assert!(validate_item_code("COKE-330").is_ok());
        assert!(validate_item_code("item_01").is_ok());
        assert!(validate_item_code("").is_err());
        assert!(validate_item_code("has space").is_err());
        assert!(validate_item_code("A".repeat(51).as_str()).is_err());
    }

    #[test]
    fn test_validate_fund_source() {
        assert!(validate_fund_source("cash").is_ok());
        assert!(validate_fund_source("  ").is_err());
        assert!(validate_fund_source("x".repeat(MAX_FUND_SOURCE_LEN + 1).as_str()).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Beverages").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("n".repeat(201).as_str()).is_err());
    }
}
