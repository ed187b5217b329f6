//! # Domain Types
//!
//! Core domain types used throughout the Tally bookkeeping core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │  InventoryItem  │   │   LedgerEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  code (SKU)     │   │  kind           │       │
//! │  │  initial_capital│   │  quantity ≥ 0   │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ TransactionKind │   │ BusinessSummary │   │ ReversalRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Sale           │   │  revenue        │   │  entry snapshot │       │
//! │  │  Expense        │   │  profit         │   │  at delete time │       │
//! │  │  CapitalWithdr. │   │  capital_health │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Inventory items have:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `code`: human-readable SKU - unique, potentially mutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Transaction Kind
// =============================================================================

/// The kind of financial event a ledger entry records.
///
/// ## Canonical Naming
/// Capital taken out of a category is always `CapitalWithdrawal`
/// (`capital_withdrawal` in storage and on the wire). There is exactly one
/// name for this kind; no aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Revenue event; always carries an inventory item and quantity.
    Sale,
    /// Outflow paid out of the category's profit.
    Expense,
    /// Capital taken out of the category's baseline.
    CapitalWithdrawal,
}

impl TransactionKind {
    /// Storage/wire representation of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Expense => "expense",
            TransactionKind::CapitalWithdrawal => "capital_withdrawal",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Category
// =============================================================================

/// A business unit/department.
///
/// Referenced by every ledger entry and inventory item. Immutable after
/// creation except for renames via the administrative path; the capital
/// baseline is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across categories.
    pub name: String,

    /// The fixed capital baseline the business unit started with, in cents.
    /// Capital health is derived from this minus all withdrawals to date.
    pub initial_capital_cents: i64,

    /// When the category was created.
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Returns the capital baseline as a Money type.
    #[inline]
    pub fn initial_capital(&self) -> Money {
        Money::from_cents(self.initial_capital_cents)
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A stock-keeping unit.
///
/// ## Quantity Ownership
/// `quantity` is mutated exclusively by the transaction engine when a sale or
/// reversal changes stock. Catalog fields (name, code, prices, thresholds)
/// are edited via the out-of-core catalog path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Category this item belongs to.
    pub category_id: String,

    /// Stock Keeping Unit - unique human-readable business identifier.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Acquisition cost in cents.
    pub cost_price_cents: i64,

    /// Selling price in cents.
    pub selling_price_cents: i64,

    /// On-hand quantity. Invariant: never negative.
    pub quantity: i64,

    /// Reorder threshold; stock at or below this is "low".
    pub min_stock: i64,

    /// Shelf capacity hint for restocking.
    pub max_stock: i64,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the acquisition cost as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Checks whether the on-hand quantity can cover a requested sale.
    #[inline]
    pub fn can_fill(&self, requested: i64) -> bool {
        self.quantity >= requested
    }

    /// Checks whether stock is at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// An immutable-by-default financial event.
///
/// ## Lifecycle
/// ```text
/// Posted ──► Adjusted* (amount-only, audited) ──► Reversed (terminal)
/// ```
/// Created by the engine's `post`; the amount may be corrected via `adjust`
/// (each correction leaves an [`AmountRevision`]); removed only via `reverse`,
/// which snapshots the entry into a [`ReversalRecord`] before deleting it.
///
/// ## Invariant
/// `Sale` entries always carry `item_id` and a positive `quantity` matching
/// the inventory decrement applied at post time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Category this event belongs to.
    pub category_id: String,

    /// Inventory item sold; present iff `kind` is `Sale`.
    pub item_id: Option<String>,

    /// Units sold; present iff `kind` is `Sale`, always positive.
    pub quantity: Option<i64>,

    /// Event amount in cents; always positive, signed meaning determined
    /// by `kind`.
    pub amount_cents: i64,

    /// What kind of financial event this is.
    pub kind: TransactionKind,

    /// Free-text provenance (payment method, payee, ...).
    pub fund_source: String,

    /// Optional caller note.
    pub description: Option<String>,

    /// Client-supplied idempotency key; unique when present.
    pub request_id: Option<String>,

    /// When the entry was posted.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Checks whether this entry is a sale (carries stock effects).
    #[inline]
    pub fn is_sale(&self) -> bool {
        self.kind == TransactionKind::Sale
    }
}

// =============================================================================
// Business Summary
// =============================================================================

/// Per-category derived figures. Recomputed from ledger rows; never stored
/// authoritatively, never hand-edited.
///
/// ## Formulas
/// ```text
/// revenue        = Σ amount of `sale` entries
/// expenses       = Σ amount of `expense` entries
/// profit         = revenue - expenses
/// capital_health = initial capital - Σ amount of `capital_withdrawal` entries
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSummary {
    pub revenue_cents: i64,
    pub expenses_cents: i64,
    pub profit_cents: i64,
    pub capital_health_cents: i64,
}

impl BusinessSummary {
    /// Folds the summary from its inputs, keeping the profit/capital formulas
    /// in exactly one place.
    pub fn derive(
        revenue_cents: i64,
        expenses_cents: i64,
        withdrawn_cents: i64,
        initial_capital_cents: i64,
    ) -> Self {
        BusinessSummary {
            revenue_cents,
            expenses_cents,
            profit_cents: revenue_cents - expenses_cents,
            capital_health_cents: initial_capital_cents - withdrawn_cents,
        }
    }

    /// Returns total revenue as Money.
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }

    /// Returns total expenses as Money.
    #[inline]
    pub fn expenses(&self) -> Money {
        Money::from_cents(self.expenses_cents)
    }

    /// Returns profit (revenue minus expenses) as Money.
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }

    /// Returns capital health (baseline minus withdrawals) as Money.
    #[inline]
    pub fn capital_health(&self) -> Money {
        Money::from_cents(self.capital_health_cents)
    }
}

// =============================================================================
// Audit Records
// =============================================================================

/// One amount correction applied to a ledger entry.
///
/// Written in the same atomic unit as the amount update, so the full history
/// of a mis-keyed value is always reconstructible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AmountRevision {
    pub id: String,
    pub entry_id: String,
    pub old_amount_cents: i64,
    pub new_amount_cents: i64,
    pub adjusted_at: DateTime<Utc>,
}

/// Snapshot of a ledger entry at the moment it was reversed.
///
/// Reversal is a financial event in its own right, distinguishable from a
/// silent deletion: the snapshot is written in the same atomic unit as the
/// entry delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReversalRecord {
    pub id: String,
    /// Id of the entry that was reversed (the entry row no longer exists).
    pub entry_id: String,
    pub category_id: String,
    pub item_id: Option<String>,
    pub quantity: Option<i64>,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub fund_source: String,
    pub reversed_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_names() {
        assert_eq!(TransactionKind::Sale.as_str(), "sale");
        assert_eq!(TransactionKind::Expense.as_str(), "expense");
        assert_eq!(
            TransactionKind::CapitalWithdrawal.as_str(),
            "capital_withdrawal"
        );
    }

    #[test]
    fn test_kind_serde_round_trip() {
        let json = serde_json::to_string(&TransactionKind::CapitalWithdrawal).unwrap();
        assert_eq!(json, "\"capital_withdrawal\"");
        let kind: TransactionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, TransactionKind::CapitalWithdrawal);
    }

    #[test]
    fn test_summary_derivation() {
        let summary = BusinessSummary::derive(10000, 4000, 200_00, 1000_00);
        assert_eq!(summary.revenue_cents, 10000);
        assert_eq!(summary.expenses_cents, 4000);
        assert_eq!(summary.profit_cents, 6000);
        assert_eq!(summary.capital_health_cents, 800_00);
    }

    #[test]
    fn test_summary_profit_can_go_negative() {
        let summary = BusinessSummary::derive(1000, 5000, 0, 0);
        assert_eq!(summary.profit_cents, -4000);
        assert!(summary.profit().is_negative());
    }

    #[test]
    fn test_item_can_fill() {
        let now = Utc::now();
        let item = InventoryItem {
            id: "i-1".to_string(),
            category_id: "c-1".to_string(),
            code: "COKE-330".to_string(),
            name: "Coca-Cola 330ml".to_string(),
            cost_price_cents: 150,
            selling_price_cents: 299,
            quantity: 5,
            min_stock: 2,
            max_stock: 50,
            created_at: now,
            updated_at: now,
        };

        assert!(item.can_fill(5));
        assert!(!item.can_fill(6));
        assert!(!item.is_low_stock());
    }
}
