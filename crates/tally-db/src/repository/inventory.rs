//! # Inventory Repository
//!
//! Database operations for stock-keeping units.
//!
//! ## The Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Mutation Strategy                              │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (races under concurrency)                   │
//! │     SELECT quantity FROM inventory_items WHERE id = ?                  │
//! │     -- another terminal sells the last unit here --                    │
//! │     UPDATE inventory_items SET quantity = 0 WHERE id = ?               │
//! │                                                                         │
//! │  ✅ CORRECT: one guarded statement                                     │
//! │     UPDATE inventory_items                                             │
//! │     SET quantity = quantity - ?2                                       │
//! │     WHERE id = ?1 AND quantity >= ?2                                   │
//! │                                                                         │
//! │  Why?                                                                   │
//! │  The check and the mutation are a single atomic step: two concurrent   │
//! │  sales of the last unit cannot both match the guard. Zero rows         │
//! │  affected means the precondition failed and nothing changed.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock mutations take a `&mut SqliteConnection` so they always run inside
//! the engine's write transaction, never as standalone round trips.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::InventoryItem;

/// Repository for inventory database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = InventoryRepository::new(pool);
///
/// // Catalog reads
/// let item = repo.get_by_code("COKE-330").await?;
///
/// // Stock mutations happen inside the engine's transaction:
/// let applied = InventoryRepository::try_decrement(&mut *tx, &item.id, 3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

const ITEM_COLUMNS: &str = r#"
    id, category_id, code, name,
    cost_price_cents, selling_price_cents,
    quantity, min_stock, max_stock,
    created_at, updated_at
"#;

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Catalog Path (non-quantity fields; out-of-core administration)
    // =========================================================================

    /// Inserts a new inventory item.
    ///
    /// ## Arguments
    /// * `item` - Item to insert (id should be generated beforehand)
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(code = %item.code, "Inserting inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, category_id, code, name,
                cost_price_cents, selling_price_cents,
                quantity, min_stock, max_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.category_id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.cost_price_cents)
        .bind(item.selling_price_cents)
        .bind(item.quantity)
        .bind(item.min_stock)
        .bind(item.max_stock)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an item's catalog fields.
    ///
    /// ## Note
    /// `quantity` is deliberately absent from the SET list: stock is owned
    /// by the transaction engine and only moves through [`try_decrement`]
    /// and [`restore`].
    ///
    /// [`try_decrement`]: InventoryRepository::try_decrement
    /// [`restore`]: InventoryRepository::restore
    pub async fn update_catalog(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, "Updating inventory item catalog fields");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                code = ?2,
                name = ?3,
                cost_price_cents = ?4,
                selling_price_cents = ?5,
                min_stock = ?6,
                max_stock = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.cost_price_cents)
        .bind(item.selling_price_cents)
        .bind(item.min_stock)
        .bind(item.max_stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", &item.id));
        }

        Ok(())
    }

    /// Gets an item by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an item by its code (SKU).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists items in a category ordered by name.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE category_id = ?1 ORDER BY name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists items at or below their reorder threshold.
    pub async fn list_low_stock(&self, category_id: &str) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM inventory_items
            WHERE category_id = ?1 AND quantity <= min_stock
            ORDER BY name
            "#
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Removes an item from the catalog.
    ///
    /// Sale history referencing the item stays in the ledger; reversing one
    /// of those sales afterwards surfaces `InventoryItemMissing` instead of
    /// silently restoring stock into a missing row.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Removing inventory item");

        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", id));
        }

        Ok(())
    }

    /// Reads the current on-hand quantity.
    ///
    /// ## Returns
    /// * `Ok(Some(quantity))` - Item exists
    /// * `Ok(None)` - Item not found
    pub async fn quantity(&self, id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM inventory_items WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(quantity)
    }

    // =========================================================================
    // Transactional Stock Path (engine-only)
    // =========================================================================

    /// Gets an item inside an open transaction.
    ///
    /// Used by the engine so precondition reads and the decrement observe
    /// the same state.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(item)
    }

    /// Conditionally decrements stock by `by` units.
    ///
    /// The check-and-mutate is one guarded statement: it matches only when
    /// `quantity >= by`, so the quantity invariant cannot be violated and
    /// two concurrent sales of the last unit cannot both succeed.
    ///
    /// ## Returns
    /// * `Ok(true)` - Decrement applied
    /// * `Ok(false)` - Item missing or insufficient stock (nothing changed;
    ///   the caller reads the row to tell the two apart and report figures)
    pub async fn try_decrement(conn: &mut SqliteConnection, id: &str, by: i64) -> DbResult<bool> {
        debug!(id = %id, by = %by, "Guarded stock decrement");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity = quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(by)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Restores stock by `by` units (reversal path).
    ///
    /// Always succeeds unless the item row itself no longer exists.
    ///
    /// ## Returns
    /// * `Ok(true)` - Restore applied
    /// * `Ok(false)` - Item row is gone (deleted out-of-band)
    pub async fn restore(conn: &mut SqliteConnection, id: &str, by: i64) -> DbResult<bool> {
        debug!(id = %id, by = %by, "Restoring stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(by)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper to generate a new inventory item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
