//! # Aggregate Projector
//!
//! Derives per-category summary figures from the ledger.
//!
//! ## On-Demand Fold, Not Materialized Counters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Summary Derivation                                   │
//! │                                                                         │
//! │  ledger_entries (category C)                                           │
//! │  ├── Σ sale                → revenue                                   │
//! │  ├── Σ expense             → expenses                                  │
//! │  └── Σ capital_withdrawal  → withdrawn                                 │
//! │                                                                         │
//! │  categories (C)                                                        │
//! │  └── initial_capital_cents                                             │
//! │                                                                         │
//! │  profit         = revenue - expenses                                   │
//! │  capital_health = initial capital - withdrawn                          │
//! │                                                                         │
//! │  The fold runs on read. There is no stored counter to drift out of    │
//! │  sync with the rows: whatever Post/Reverse/Adjust commit, the next     │
//! │  read reflects.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::engine::map_storage;
use tally_core::{BusinessSummary, LedgerError, LedgerResult, TransactionKind};
use tally_db::Database;

/// Read-side projector over the ledger store. Never writes.
#[derive(Debug, Clone)]
pub struct SummaryProjector {
    db: Database,
}

impl SummaryProjector {
    /// Creates a new projector over the given database.
    pub fn new(db: Database) -> Self {
        SummaryProjector { db }
    }

    /// Computes the summary figures for one category.
    ///
    /// ## Returns
    /// Revenue, expenses, profit, and capital health, folded from that
    /// category's ledger rows and its capital baseline.
    ///
    /// ## Errors
    /// `NotFound` if the category does not exist.
    pub async fn summary(&self, category_id: &str) -> LedgerResult<BusinessSummary> {
        let category = self
            .db
            .categories()
            .get_by_id(category_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| LedgerError::not_found("Category", category_id))?;

        let ledger = self.db.ledger();
        let revenue = ledger
            .sum_amount_by_kind(category_id, TransactionKind::Sale)
            .await
            .map_err(map_storage)?;
        let expenses = ledger
            .sum_amount_by_kind(category_id, TransactionKind::Expense)
            .await
            .map_err(map_storage)?;
        let withdrawn = ledger
            .sum_amount_by_kind(category_id, TransactionKind::CapitalWithdrawal)
            .await
            .map_err(map_storage)?;

        let summary = BusinessSummary::derive(
            revenue,
            expenses,
            withdrawn,
            category.initial_capital_cents,
        );

        debug!(
            category_id = %category_id,
            revenue = %summary.revenue_cents,
            profit = %summary.profit_cents,
            capital_health = %summary.capital_health_cents,
            "Summary derived"
        );

        Ok(summary)
    }
}
