//! # Category Repository
//!
//! Database operations for categories (business units).
//!
//! Categories are the administrative backbone: every ledger entry and
//! inventory item references one. They are created and renamed here; the
//! capital baseline is fixed at creation and only ever read afterwards.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Category;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a new category with a fixed capital baseline.
    ///
    /// ## Arguments
    /// * `name` - Display name, unique across categories
    /// * `initial_capital_cents` - The baseline capital health starts from
    ///
    /// ## Returns
    /// The created category with generated ID.
    pub async fn create(&self, name: &str, initial_capital_cents: i64) -> DbResult<Category> {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            initial_capital_cents,
            created_at: Utc::now(),
        };

        debug!(id = %category.id, name = %category.name, "Creating category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, initial_capital_cents, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(category.initial_capital_cents)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Category))` - Category found
    /// * `Ok(None)` - Category not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, initial_capital_cents, created_at
            FROM categories
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category inside an open transaction.
    ///
    /// Used by the engine so the precondition read and the mutation observe
    /// the same state.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, initial_capital_cents, created_at
            FROM categories
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(category)
    }

    /// Lists all categories ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, initial_capital_cents, created_at
            FROM categories
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Renames a category.
    ///
    /// The only mutable field; the capital baseline never changes after
    /// creation.
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<()> {
        debug!(id = %id, name = %name, "Renaming category");

        let result = sqlx::query(
            r#"
            UPDATE categories SET name = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }

    /// Counts categories (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        let created = repo.create("Beverages", 1000_00).await.unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Beverages");
        assert_eq!(fetched.initial_capital_cents, 1000_00);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();

        repo.create("Snacks", 0).await.unwrap();
        let err = repo.create("Snacks", 0).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_rename_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.categories().rename("missing", "x").await.unwrap_err();
        assert!(matches!(err, crate::DbError::NotFound { .. }));
    }
}
