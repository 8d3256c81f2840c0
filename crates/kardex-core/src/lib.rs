//! # kardex-core: Pure Business Logic for Kardex POS
//!
//! This crate holds the value types, tags and pure rules that the inventory
//! and sales layers share. It performs no I/O; every stock mutation lives in
//! `kardex-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kardex POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          HTTP handlers / back-office views (out of tree)        │   │
//! │  │    POS cart ──► checkout ──► transfers ──► kardex report        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kardex-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ quantity  │  │   cart    │  │ sale_edit │  │   │
//! │  │   │  Location │  │ Quantity  │  │   Cart    │  │   plan    │  │   │
//! │  │   │  MoveType │  │ UnitCost  │  │ Checkout  │  │  deltas   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              kardex-db (Stock Engine + repositories)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Tags (location type, move type, ...) and persisted entities
//! - [`quantity`] - Fixed-point `Quantity` and `UnitCost`, lenient parsing
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Request-scoped POS cart and the checkout request it produces
//! - [`sale_edit`] - Per-product delta planning for editing a recorded sale
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kardex_core::{Money, Quantity};
//!
//! // User input is normalized leniently: comma decimals, garbage -> zero
//! let qty = Quantity::normalize("1,5");
//! assert_eq!(qty.milli(), 1500);
//! assert!(Quantity::normalize("abc").is_zero());
//!
//! // Line totals round half-to-even to the cent
//! let line = Money::from_cents(1099).times(qty);
//! assert_eq!(line.cents(), 1648);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod quantity;
pub mod sale_edit;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, CheckoutLine, CheckoutRequest};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::{Quantity, UnitCost};
pub use sale_edit::{plan_sale_edit, EditLine, LineChange, SaleEdit};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Default window for the kardex report when no dates are given.
pub const DEFAULT_KARDEX_DAYS: i64 = 7;

/// Row cap for the kardex report.
pub const KARDEX_LIST_LIMIT: i64 = 300;

/// Row cap for the per-location stock list.
pub const STOCK_LIST_LIMIT: i64 = 500;

/// Row cap for the transfer history view.
pub const TRANSFER_HISTORY_LIMIT: i64 = 200;

/// Longest free-text note accepted on a movement or transfer.
pub const MAX_NOTE_LEN: usize = 255;
