//! # Query Façade
//!
//! Read paths consumed by the out-of-scope presentation layer: ledger
//! archive listings, inventory quantities, and the audit trails. Everything
//! here is read-only; mutations go through the transaction engine.

use crate::engine::map_storage;
use tally_core::{AmountRevision, LedgerEntry, LedgerError, LedgerResult, ReversalRecord};
use tally_db::{Database, LedgerFilter};

/// Read-only façade over the stores.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    db: Database,
}

impl LedgerQuery {
    /// Creates a new query façade over the given database.
    pub fn new(db: Database) -> Self {
        LedgerQuery { db }
    }

    /// Lists ledger entries matching a filter, newest first.
    ///
    /// The result is finite and restartable: page with the filter's
    /// `limit`/`offset`.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // Second page of a category's expense archive
    /// let filter = LedgerFilter::for_category(&category.id)
    ///     .kind(TransactionKind::Expense)
    ///     .page(50, 50);
    /// let entries = query.list_entries(&filter).await?;
    /// ```
    pub async fn list_entries(&self, filter: &LedgerFilter) -> LedgerResult<Vec<LedgerEntry>> {
        self.db.ledger().list(filter).await.map_err(map_storage)
    }

    /// Gets one ledger entry by ID.
    pub async fn entry(&self, entry_id: &str) -> LedgerResult<Option<LedgerEntry>> {
        self.db
            .ledger()
            .get_by_id(entry_id)
            .await
            .map_err(map_storage)
    }

    /// Reads an item's current on-hand quantity.
    ///
    /// ## Errors
    /// `NotFound` if the item does not exist.
    pub async fn item_quantity(&self, item_id: &str) -> LedgerResult<i64> {
        self.db
            .inventory()
            .quantity(item_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| LedgerError::not_found("InventoryItem", item_id))
    }

    /// Lists the amount corrections applied to one entry, oldest first.
    ///
    /// Together with the entry's current amount this reconstructs the full
    /// history of a mis-keyed value.
    pub async fn revisions(&self, entry_id: &str) -> LedgerResult<Vec<AmountRevision>> {
        self.db
            .ledger()
            .list_revisions(entry_id)
            .await
            .map_err(map_storage)
    }

    /// Lists a category's reversal records, newest first.
    ///
    /// Reversals are financial events of their own; this is how they stay
    /// distinguishable from silent deletion.
    pub async fn reversals(&self, category_id: &str) -> LedgerResult<Vec<ReversalRecord>> {
        self.db
            .ledger()
            .list_reversals(category_id)
            .await
            .map_err(map_storage)
    }
}
