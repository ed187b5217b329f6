//! # Ledger Repository
//!
//! Database operations for ledger entries and their audit records.
//!
//! ## Entry Lifecycle in Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Ledger Entry Lifecycle                              │
//! │                                                                         │
//! │  1. POST                                                               │
//! │     └── insert_tx() → one appended row, all-or-nothing                 │
//! │                                                                         │
//! │  2. (OPTIONAL) ADJUST, zero or more times                              │
//! │     └── update_amount_tx() + insert_revision_tx()                      │
//! │         (same transaction: the correction and its audit row            │
//! │          are never observable apart)                                   │
//! │                                                                         │
//! │  3. (OPTIONAL) REVERSE, terminal                                       │
//! │     └── insert_reversal_tx() + delete_tx()                             │
//! │         (same transaction: the snapshot outlives the row)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Archive listings are ordered `created_at DESC` and paged with
//! limit/offset, per the archive views that consume them.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use chrono::{DateTime, Utc};
use tally_core::{
    AmountRevision, LedgerEntry, ReversalRecord, TransactionKind, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

const ENTRY_COLUMNS: &str = r#"
    id, category_id, item_id, quantity,
    amount_cents, kind, fund_source, description,
    request_id, created_at
"#;

// =============================================================================
// Ledger Filter
// =============================================================================

/// Predicate for archive listings.
///
/// All fields are optional; unset fields match everything. Results are
/// finite and restartable: page with `limit`/`offset`.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    /// Restrict to one category.
    pub category_id: Option<String>,
    /// Restrict to one transaction kind.
    pub kind: Option<TransactionKind>,
    /// Entries created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Entries created at or before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Page size; 0 means [`DEFAULT_PAGE_SIZE`], capped at [`MAX_PAGE_SIZE`].
    pub limit: u32,
    /// Page start.
    pub offset: u32,
}

impl LedgerFilter {
    /// Filter scoped to one category.
    pub fn for_category(category_id: impl Into<String>) -> Self {
        LedgerFilter {
            category_id: Some(category_id.into()),
            ..Default::default()
        }
    }

    /// Restricts the filter to one transaction kind.
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts the filter to entries at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Restricts the filter to entries at or before `until`.
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Sets the page.
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit.min(MAX_PAGE_SIZE)
        }
    }
}

// =============================================================================
// Ledger Repository
// =============================================================================

/// Repository for ledger database operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Reads (pool-backed)
    // =========================================================================

    /// Gets an entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets an entry by its idempotency key.
    ///
    /// ## Usage
    /// A post retry carrying the same `request_id` maps back to the entry
    /// the first attempt created.
    pub async fn get_by_request_id(&self, request_id: &str) -> DbResult<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE request_id = ?1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lists entries matching a filter, newest first.
    ///
    /// Unset filter fields match everything; `(?n IS NULL OR col = ?n)`
    /// keeps this a single static statement with optional binds.
    pub async fn list(&self, filter: &LedgerFilter) -> DbResult<Vec<LedgerEntry>> {
        debug!(?filter, "Listing ledger entries");

        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE (?1 IS NULL OR category_id = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at <= ?4)
            ORDER BY created_at DESC
            LIMIT ?5 OFFSET ?6
            "#
        ))
        .bind(&filter.category_id)
        .bind(filter.kind)
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.effective_limit())
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Sums entry amounts for one (category, kind) pair.
    ///
    /// The projector folds the summary figures out of three of these.
    pub async fn sum_amount_by_kind(
        &self,
        category_id: &str,
        kind: TransactionKind,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM ledger_entries
            WHERE category_id = ?1 AND kind = ?2
            "#,
        )
        .bind(category_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Lists amount revisions for one entry, oldest first.
    pub async fn list_revisions(&self, entry_id: &str) -> DbResult<Vec<AmountRevision>> {
        let revisions = sqlx::query_as::<_, AmountRevision>(
            r#"
            SELECT id, entry_id, old_amount_cents, new_amount_cents, adjusted_at
            FROM ledger_amount_revisions
            WHERE entry_id = ?1
            ORDER BY adjusted_at
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(revisions)
    }

    /// Lists reversal records for one category, newest first.
    pub async fn list_reversals(&self, category_id: &str) -> DbResult<Vec<ReversalRecord>> {
        let reversals = sqlx::query_as::<_, ReversalRecord>(
            r#"
            SELECT id, entry_id, category_id, item_id, quantity,
                   amount_cents, kind, fund_source, reversed_at
            FROM ledger_reversals
            WHERE category_id = ?1
            ORDER BY reversed_at DESC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reversals)
    }

    // =========================================================================
    // Transactional Mutations (engine-only)
    // =========================================================================

    /// Gets an entry inside an open transaction.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<LedgerEntry>> {
        let entry = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(entry)
    }

    /// Appends one entry.
    ///
    /// No partial writes: the insert either fully succeeds or the enclosing
    /// transaction rolls back.
    pub async fn insert_tx(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
        debug!(id = %entry.id, kind = %entry.kind, amount = %entry.amount_cents, "Appending ledger entry");

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, category_id, item_id, quantity,
                amount_cents, kind, fund_source, description,
                request_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.category_id)
        .bind(&entry.item_id)
        .bind(entry.quantity)
        .bind(entry.amount_cents)
        .bind(entry.kind)
        .bind(&entry.fund_source)
        .bind(&entry.description)
        .bind(&entry.request_id)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes an entry by ID.
    ///
    /// ## Returns
    /// * `Ok(true)` - Row deleted
    /// * `Ok(false)` - Entry no longer exists
    pub async fn delete_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rewrites an entry's amount.
    ///
    /// ## Returns
    /// * `Ok(true)` - Amount updated
    /// * `Ok(false)` - Entry no longer exists
    pub async fn update_amount_tx(
        conn: &mut SqliteConnection,
        id: &str,
        new_amount_cents: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query("UPDATE ledger_entries SET amount_cents = ?2 WHERE id = ?1")
            .bind(id)
            .bind(new_amount_cents)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sums entry amounts for one (category, kind) pair inside an open
    /// transaction.
    ///
    /// The engine's derived-balance preconditions (expense ≤ profit,
    /// withdrawal ≤ capital health) read through this so the check and the
    /// insert observe the same state.
    pub async fn sum_amount_by_kind_tx(
        conn: &mut SqliteConnection,
        category_id: &str,
        kind: TransactionKind,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM ledger_entries
            WHERE category_id = ?1 AND kind = ?2
            "#,
        )
        .bind(category_id)
        .bind(kind)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }

    /// Records an amount revision.
    pub async fn insert_revision_tx(
        conn: &mut SqliteConnection,
        revision: &AmountRevision,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_amount_revisions (
                id, entry_id, old_amount_cents, new_amount_cents, adjusted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&revision.id)
        .bind(&revision.entry_id)
        .bind(revision.old_amount_cents)
        .bind(revision.new_amount_cents)
        .bind(revision.adjusted_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Records a reversal snapshot.
    pub async fn insert_reversal_tx(
        conn: &mut SqliteConnection,
        record: &ReversalRecord,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_reversals (
                id, entry_id, category_id, item_id, quantity,
                amount_cents, kind, fund_source, reversed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&record.id)
        .bind(&record.entry_id)
        .bind(&record.category_id)
        .bind(&record.item_id)
        .bind(record.quantity)
        .bind(record.amount_cents)
        .bind(record.kind)
        .bind(&record.fund_source)
        .bind(record.reversed_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}

/// Helper to generate a new ledger entry ID.
pub fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
