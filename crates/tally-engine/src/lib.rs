//! # tally-engine: The Transaction Engine
//!
//! The orchestration layer of the Tally bookkeeping core: posting, reversal,
//! amount correction, summary projection, and the archive/query façade.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  Caller (out-of-scope UI / transport)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐   ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │TransactionEngine│  │SummaryProjector│   │ LedgerQuery  │  │   │
//! │  │   │  post()        │   │  summary()     │   │ list_entries │  │   │
//! │  │   │  reverse()     │   │   (derived,    │   │ item_quantity│  │   │
//! │  │   │  adjust()      │   │    read-only)  │   │ audit reads  │  │   │
//! │  │   └────────┬───────┘   └───────┬────────┘   └──────┬───────┘  │   │
//! │  │            │ one write         │ reads             │ reads     │   │
//! │  │            │ transaction       ▼                   ▼           │   │
//! │  └────────────┼──────────────────────────────────────────────────┘   │
//! │               ▼                                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          tally-db (Ledger / Inventory / Category stores)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Atomic Unit
//!
//! Every `post`, `reverse`, and `adjust` runs inside a single SQLite write
//! transaction: a ledger row never exists without its stock effect, and vice
//! versa. Callers observe operations as fully applied or fully failed, never
//! in between.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_engine::{Database, DbConfig, PostRequest, TransactionEngine};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let engine = TransactionEngine::new(db.clone());
//!
//! // Post a sale: ledger append + stock decrement, one atomic unit
//! let entry = engine
//!     .post(PostRequest::sale(&category.id, &item.id, 2, 598, "cash"))
//!     .await?;
//!
//! // Undo it: stock restore + reversal record + delete, one atomic unit
//! engine.reverse(&entry.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod projector;
pub mod query;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{PostRequest, TransactionEngine};
pub use projector::SummaryProjector;
pub use query::LedgerQuery;

// The embedded call interface is self-contained: callers get the domain
// types and the storage handle from this crate alone.
pub use tally_core::{
    AmountRevision, BusinessSummary, Category, InventoryItem, LedgerEntry, LedgerError,
    LedgerResult, Money, ReversalRecord, TransactionKind,
};
pub use tally_db::{Database, DbConfig, LedgerFilter};
