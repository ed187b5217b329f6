//! # Repository Module
//!
//! Database repository implementations for the Tally bookkeeping core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine call                                                           │
//! │       │                                                                 │
//! │       │  db.inventory().get_by_id(item_id)                             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── get_by_id(&self, id)              ← pool-backed read              │
//! │  ├── insert(&self, item)               ← catalog path                  │
//! │  ├── try_decrement(conn, id, by)       ← guarded, inside the engine's  │
//! │  └── restore(conn, id, by)               write transaction             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Transactional mutation paths take an explicit connection, so the    │
//! │    atomic unit is visible in the signature                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`category::CategoryRepository`] - Category administration and lookups
//! - [`inventory::InventoryRepository`] - Item catalog and stock mutations
//! - [`ledger::LedgerRepository`] - Entry append/delete, archive listing, sums

pub mod category;
pub mod inventory;
pub mod ledger;
