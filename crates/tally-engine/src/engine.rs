//! # Transaction Engine
//!
//! The posting, reversal, and adjustment protocols.
//!
//! ## Why One Transaction Per Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │               The Defect This Design Eliminates                         │
//! │                                                                         │
//! │  ❌ WRONG: separate round trips                                        │
//! │     1. INSERT ledger entry            ← committed                      │
//! │     2. (network / process failure)                                     │
//! │     3. UPDATE stock                   ← never happens                  │
//! │     Result: ledger says 3 sold, shelf count never moved                │
//! │                                                                         │
//! │  ✅ CORRECT: one write transaction                                     │
//! │     BEGIN                                                              │
//! │       check preconditions (same snapshot the mutation sees)            │
//! │       UPDATE stock (guarded)                                           │
//! │       INSERT ledger entry                                              │
//! │     COMMIT ← both effects or neither                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Operations on the same item serialize on the guarded decrement; unrelated
//! categories and items proceed in parallel on separate pool connections.
//! Transient writer conflicts (SQLite busy/locked) are retried a bounded
//! number of times before surfacing as `ConcurrentModification`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use tally_core::validation::{validate_amount_cents, validate_fund_source, validate_quantity};
use tally_core::{
    AmountRevision, LedgerEntry, LedgerError, LedgerResult, Money, ReversalRecord,
    TransactionKind, ValidationError,
};
use tally_db::repository::category::CategoryRepository;
use tally_db::repository::inventory::InventoryRepository;
use tally_db::repository::ledger::LedgerRepository;
use tally_db::{Database, DbError};

/// How many times a transient writer conflict is retried before it surfaces
/// as [`LedgerError::ConcurrentModification`].
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Maps storage failures into the domain taxonomy.
///
/// Retryable classes (busy, pool exhausted) become `ConcurrentModification`
/// so the engine's retry loop can catch them; everything else is a true
/// infrastructure failure.
pub(crate) fn map_storage(err: DbError) -> LedgerError {
    if err.is_retryable() {
        LedgerError::ConcurrentModification
    } else {
        LedgerError::Storage(err.to_string())
    }
}

// =============================================================================
// Post Request
// =============================================================================

/// A request to post one ledger entry.
///
/// ## Construction
/// Use the per-kind constructors so sale-only fields can't be forgotten:
/// ```rust
/// use tally_engine::PostRequest;
///
/// let sale = PostRequest::sale("cat-1", "item-1", 2, 598, "cash");
/// let expense = PostRequest::expense("cat-1", 4000, "bank transfer")
///     .description("storefront rent");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRequest {
    /// Category the entry belongs to.
    pub category_id: String,
    /// What kind of financial event this is.
    pub kind: TransactionKind,
    /// Event amount in cents; must be positive.
    pub amount_cents: i64,
    /// Free-text provenance (payment method, payee, ...).
    pub fund_source: String,
    /// Optional caller note.
    pub description: Option<String>,
    /// Client-supplied idempotency key. A retried post carrying the same key
    /// returns the entry the first attempt created instead of double-posting.
    pub request_id: Option<String>,
    /// Inventory item sold; required for sales, ignored otherwise.
    pub item_id: Option<String>,
    /// Units sold; required for sales, ignored otherwise.
    pub quantity: Option<i64>,
}

impl PostRequest {
    /// Builds a sale posting.
    pub fn sale(
        category_id: impl Into<String>,
        item_id: impl Into<String>,
        quantity: i64,
        amount_cents: i64,
        fund_source: impl Into<String>,
    ) -> Self {
        PostRequest {
            category_id: category_id.into(),
            kind: TransactionKind::Sale,
            amount_cents,
            fund_source: fund_source.into(),
            description: None,
            request_id: None,
            item_id: Some(item_id.into()),
            quantity: Some(quantity),
        }
    }

    /// Builds an expense posting.
    pub fn expense(
        category_id: impl Into<String>,
        amount_cents: i64,
        fund_source: impl Into<String>,
    ) -> Self {
        PostRequest {
            category_id: category_id.into(),
            kind: TransactionKind::Expense,
            amount_cents,
            fund_source: fund_source.into(),
            description: None,
            request_id: None,
            item_id: None,
            quantity: None,
        }
    }

    /// Builds a capital withdrawal posting.
    pub fn capital_withdrawal(
        category_id: impl Into<String>,
        amount_cents: i64,
        fund_source: impl Into<String>,
    ) -> Self {
        PostRequest {
            category_id: category_id.into(),
            kind: TransactionKind::CapitalWithdrawal,
            amount_cents,
            fund_source: fund_source.into(),
            description: None,
            request_id: None,
            item_id: None,
            quantity: None,
        }
    }

    /// Attaches a caller note.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches an idempotency key.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// =============================================================================
// Transaction Engine
// =============================================================================

/// The sole writer of inventory quantity and ledger rows.
///
/// Cheap to clone; all clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    db: Database,
}

impl TransactionEngine {
    /// Creates a new engine over the given database.
    pub fn new(db: Database) -> Self {
        TransactionEngine { db }
    }

    // =========================================================================
    // Post
    // =========================================================================

    /// Posts one ledger entry.
    ///
    /// ## Preconditions by kind
    /// - `Sale`: the item exists and has on-hand quantity ≥ requested at the
    ///   instant of posting
    /// - `Expense`: the category's derived profit ≥ amount
    /// - `CapitalWithdrawal`: the category's derived capital health ≥ amount
    ///
    /// ## Effect
    /// Inserts one entry; for sales, decrements stock by the requested
    /// quantity. Both mutations commit as a single atomic unit.
    ///
    /// ## Errors
    /// `InvalidAmount`, `InvalidQuantity`, `NotFound`, `InsufficientStock`,
    /// `InsufficientFunds`, `ConcurrentModification` (retries exhausted),
    /// `Storage`. No failure leaves partial state behind.
    pub async fn post(&self, request: PostRequest) -> LedgerResult<LedgerEntry> {
        // All field validation happens before any store round trip
        validate_amount_cents(request.amount_cents)?;
        validate_fund_source(&request.fund_source)?;
        if request.kind == TransactionKind::Sale {
            let quantity = request.quantity.ok_or_else(|| ValidationError::Required {
                field: "quantity".to_string(),
            })?;
            validate_quantity(quantity)?;
            if request.item_id.is_none() {
                return Err(ValidationError::Required {
                    field: "item_id".to_string(),
                }
                .into());
            }
        }

        // Idempotent replay: a retried request maps back to its entry
        if let Some(request_id) = request.request_id.as_deref() {
            if let Some(existing) = self
                .db
                .ledger()
                .get_by_request_id(request_id)
                .await
                .map_err(map_storage)?
            {
                info!(entry_id = %existing.id, request_id = %request_id, "Replaying idempotent post");
                return Ok(existing);
            }
        }

        let mut attempt = 0;
        loop {
            match self.post_once(&request).await {
                Err(LedgerError::ConcurrentModification) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, "Retrying post after writer conflict");
                }
                other => return other,
            }
        }
    }

    /// One attempt at the posting transaction.
    async fn post_once(&self, request: &PostRequest) -> LedgerResult<LedgerEntry> {
        let mut tx = self.db.begin().await.map_err(map_storage)?;

        // Category is a precondition for every kind
        let category = CategoryRepository::get_by_id_tx(&mut tx, &request.category_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| LedgerError::not_found("Category", &request.category_id))?;

        let mut entry_item_id = None;
        let mut entry_quantity = None;

        match request.kind {
            TransactionKind::Sale => {
                // Validated in post(); both are present here
                let item_id = request.item_id.as_deref().unwrap_or_default();
                let quantity = request.quantity.unwrap_or_default();

                // The guarded decrement is the check-and-mutate: zero rows
                // affected means the precondition failed and nothing changed
                let applied = InventoryRepository::try_decrement(&mut tx, item_id, quantity)
                    .await
                    .map_err(map_storage)?;

                if !applied {
                    // Read the row to tell "missing" from "short", and to
                    // report the available figure. The transaction rolls
                    // back on drop either way.
                    return match InventoryRepository::get_by_id_tx(&mut tx, item_id)
                        .await
                        .map_err(map_storage)?
                    {
                        None => Err(LedgerError::not_found("InventoryItem", item_id)),
                        Some(item) => Err(LedgerError::InsufficientStock {
                            code: item.code,
                            available: item.quantity,
                            requested: quantity,
                        }),
                    };
                }

                entry_item_id = Some(item_id.to_string());
                entry_quantity = Some(quantity);
            }

            TransactionKind::Expense => {
                let revenue =
                    LedgerRepository::sum_amount_by_kind_tx(&mut tx, &category.id, TransactionKind::Sale)
                        .await
                        .map_err(map_storage)?;
                let expenses = LedgerRepository::sum_amount_by_kind_tx(
                    &mut tx,
                    &category.id,
                    TransactionKind::Expense,
                )
                .await
                .map_err(map_storage)?;

                let profit = revenue - expenses;
                if profit < request.amount_cents {
                    return Err(LedgerError::InsufficientFunds {
                        fund: "profit",
                        available: Money::from_cents(profit),
                        requested: Money::from_cents(request.amount_cents),
                    });
                }
            }

            TransactionKind::CapitalWithdrawal => {
                let withdrawn = LedgerRepository::sum_amount_by_kind_tx(
                    &mut tx,
                    &category.id,
                    TransactionKind::CapitalWithdrawal,
                )
                .await
                .map_err(map_storage)?;

                let capital_health = category.initial_capital_cents - withdrawn;
                if capital_health < request.amount_cents {
                    return Err(LedgerError::InsufficientFunds {
                        fund: "capital health",
                        available: Money::from_cents(capital_health),
                        requested: Money::from_cents(request.amount_cents),
                    });
                }
            }
        }

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            category_id: category.id,
            item_id: entry_item_id,
            quantity: entry_quantity,
            amount_cents: request.amount_cents,
            kind: request.kind,
            fund_source: request.fund_source.trim().to_string(),
            description: request.description.clone(),
            request_id: request.request_id.clone(),
            created_at: Utc::now(),
        };

        if let Err(err) = LedgerRepository::insert_tx(&mut tx, &entry).await {
            // Two carriers of the same idempotency key raced into the insert:
            // drop our transaction and hand back the entry the winner created
            if err.is_unique_violation() {
                if let Some(request_id) = request.request_id.as_deref() {
                    drop(tx);
                    if let Some(existing) = self
                        .db
                        .ledger()
                        .get_by_request_id(request_id)
                        .await
                        .map_err(map_storage)?
                    {
                        info!(entry_id = %existing.id, request_id = %request_id, "Replaying idempotent post after insert race");
                        return Ok(existing);
                    }
                    return Err(LedgerError::ConcurrentModification);
                }
            }
            return Err(map_storage(err));
        }

        tx.commit().await.map_err(|e| map_storage(DbError::from(e)))?;

        info!(
            entry_id = %entry.id,
            category_id = %entry.category_id,
            kind = %entry.kind,
            amount = %entry.amount_cents,
            "Ledger entry posted"
        );

        Ok(entry)
    }

    // =========================================================================
    // Reverse
    // =========================================================================

    /// Reverses a posted entry.
    ///
    /// ## Effect
    /// Restores stock by the entry's recorded quantity (sales only), writes
    /// the reversal record, and deletes the entry — one atomic unit.
    ///
    /// ## Idempotency
    /// Reversing an already-reversed (non-existent) id fails with `NotFound`
    /// rather than silently succeeding, so a retried reverse is safe.
    ///
    /// ## Errors
    /// `NotFound` if the entry no longer exists; `InventoryItemMissing` if a
    /// sale's item was deleted out-of-band (stock restoration is skipped and
    /// the condition surfaced, nothing committed).
    pub async fn reverse(&self, entry_id: &str) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            match self.reverse_once(entry_id).await {
                Err(LedgerError::ConcurrentModification) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, "Retrying reverse after writer conflict");
                }
                other => return other,
            }
        }
    }

    /// One attempt at the reversal transaction.
    async fn reverse_once(&self, entry_id: &str) -> LedgerResult<()> {
        let mut tx = self.db.begin().await.map_err(map_storage)?;

        let entry = LedgerRepository::get_by_id_tx(&mut tx, entry_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| LedgerError::not_found("LedgerEntry", entry_id))?;

        if entry.is_sale() {
            // Invariant: sale entries carry item_id and a positive quantity
            let item_id = entry.item_id.as_deref().ok_or_else(|| {
                LedgerError::Storage(format!("sale entry {} has no item reference", entry.id))
            })?;
            let quantity = entry.quantity.ok_or_else(|| {
                LedgerError::Storage(format!("sale entry {} has no quantity", entry.id))
            })?;

            let restored = InventoryRepository::restore(&mut tx, item_id, quantity)
                .await
                .map_err(map_storage)?;

            if !restored {
                return Err(LedgerError::InventoryItemMissing {
                    item_id: item_id.to_string(),
                });
            }
        }

        // Reversal is a financial event of its own: snapshot before delete,
        // in the same transaction
        let record = ReversalRecord {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            category_id: entry.category_id.clone(),
            item_id: entry.item_id.clone(),
            quantity: entry.quantity,
            amount_cents: entry.amount_cents,
            kind: entry.kind,
            fund_source: entry.fund_source.clone(),
            reversed_at: Utc::now(),
        };
        LedgerRepository::insert_reversal_tx(&mut tx, &record)
            .await
            .map_err(map_storage)?;

        let deleted = LedgerRepository::delete_tx(&mut tx, entry_id)
            .await
            .map_err(map_storage)?;
        if !deleted {
            return Err(LedgerError::not_found("LedgerEntry", entry_id));
        }

        tx.commit().await.map_err(|e| map_storage(DbError::from(e)))?;

        info!(
            entry_id = %entry.id,
            category_id = %entry.category_id,
            kind = %entry.kind,
            "Ledger entry reversed"
        );

        Ok(())
    }

    // =========================================================================
    // Adjust
    // =========================================================================

    /// Corrects the monetary amount of an existing entry.
    ///
    /// Used for fixing a mis-keyed value; inventory is never touched. The
    /// superseded amount is recorded as an [`AmountRevision`] in the same
    /// atomic unit, so history stays reconstructible.
    ///
    /// ## Errors
    /// `InvalidAmount` if the new amount is not positive; `NotFound` if the
    /// entry was reversed (the row is gone).
    pub async fn adjust(&self, entry_id: &str, new_amount_cents: i64) -> LedgerResult<LedgerEntry> {
        validate_amount_cents(new_amount_cents)?;

        let mut attempt = 0;
        loop {
            match self.adjust_once(entry_id, new_amount_cents).await {
                Err(LedgerError::ConcurrentModification) if attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, "Retrying adjust after writer conflict");
                }
                other => return other,
            }
        }
    }

    /// One attempt at the adjustment transaction.
    async fn adjust_once(&self, entry_id: &str, new_amount_cents: i64) -> LedgerResult<LedgerEntry> {
        let mut tx = self.db.begin().await.map_err(map_storage)?;

        let entry = LedgerRepository::get_by_id_tx(&mut tx, entry_id)
            .await
            .map_err(map_storage)?
            .ok_or_else(|| LedgerError::not_found("LedgerEntry", entry_id))?;

        // Correcting to the current value is a no-op; don't write noise
        // into the revision trail
        if entry.amount_cents == new_amount_cents {
            return Ok(entry);
        }

        let revision = AmountRevision {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            old_amount_cents: entry.amount_cents,
            new_amount_cents,
            adjusted_at: Utc::now(),
        };

        let updated = LedgerRepository::update_amount_tx(&mut tx, entry_id, new_amount_cents)
            .await
            .map_err(map_storage)?;
        if !updated {
            return Err(LedgerError::not_found("LedgerEntry", entry_id));
        }
        LedgerRepository::insert_revision_tx(&mut tx, &revision)
            .await
            .map_err(map_storage)?;

        tx.commit().await.map_err(|e| map_storage(DbError::from(e)))?;

        info!(
            entry_id = %entry.id,
            old_amount = %entry.amount_cents,
            new_amount = %new_amount_cents,
            "Ledger entry amount adjusted"
        );

        Ok(LedgerEntry {
            amount_cents: new_amount_cents,
            ..entry
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_request_carries_item_fields() {
        let request = PostRequest::sale("cat-1", "item-1", 2, 598, "cash");
        assert_eq!(request.kind, TransactionKind::Sale);
        assert_eq!(request.item_id.as_deref(), Some("item-1"));
        assert_eq!(request.quantity, Some(2));
    }

    #[test]
    fn test_expense_request_has_no_item_fields() {
        let request = PostRequest::expense("cat-1", 4000, "bank transfer")
            .description("storefront rent")
            .request_id("req-42");
        assert_eq!(request.kind, TransactionKind::Expense);
        assert!(request.item_id.is_none());
        assert!(request.quantity.is_none());
        assert_eq!(request.request_id.as_deref(), Some("req-42"));
    }
}
