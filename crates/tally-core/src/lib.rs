//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of the Tally bookkeeping core. It contains all
//! business types and rules as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Caller (out-of-scope UI / transport layer)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ embedded call interface                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-engine                                 │   │
//! │  │    post, reverse, adjust, summary, list_entries                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │ Category  │  │   Money   │  │LedgerError│  │   rules   │  │   │
//! │  │   │LedgerEntry│  │  (cents)  │  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Category, InventoryItem, LedgerEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{LedgerError, LedgerResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted for a single sale posting
///
/// ## Business Reason
/// Prevents accidental over-selling (e.g., typing 1000 instead of 10).
/// Can be made configurable per-category in future versions.
pub const MAX_SALE_QUANTITY: i64 = 999;

/// Maximum length of the free-text fund source field
pub const MAX_FUND_SOURCE_LEN: usize = 100;

/// Default page size for ledger archive listings
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound on a single ledger archive page
///
/// ## Business Reason
/// Keeps archive reads bounded; callers page with limit/offset instead of
/// pulling the whole ledger in one query.
pub const MAX_PAGE_SIZE: u32 = 500;
