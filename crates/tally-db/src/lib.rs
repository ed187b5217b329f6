//! # tally-db: Database Layer for Tally
//!
//! This crate provides database access for the Tally bookkeeping core.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  tally-engine (post / reverse / adjust / summary)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (ledger.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ CategoryRepo  │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │◄───│ InventoryRepo │    │ ...          │  │   │
//! │  │   │ Management    │    │ LedgerRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                     SQLite Database (WAL mode)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactional Mutation Paths
//!
//! The repositories expose two kinds of methods:
//! - Pool-backed reads (`&self`) for the query façade and projector
//! - Connection-backed mutations (taking `&mut SqliteConnection`) used by the
//!   engine inside a single transaction, so a ledger insert and its stock
//!   decrement commit as one atomic unit
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (category, inventory, ledger)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/db.sqlite");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let items = db.inventory().list_by_category("cat-id").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::ledger::{LedgerFilter, LedgerRepository};
