//! # Repository Module
//!
//! Database repository implementations for Kardex POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Transactions                        │
//! │                                                                         │
//! │  db.sales().checkout(&req)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::checkout     BEGIN IMMEDIATE on a pooled connection   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sale::checkout_in(conn, ..)  conn.begin() → SAVEPOINT                 │
//! │       │                                                                 │
//! │       ├── header insert                                                │
//! │       ├── stock::remove_stock(conn, ..)  per line (nested SAVEPOINT)   │
//! │       ├── item inserts                                                 │
//! │       └── sync::enqueue(conn, ..)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT, or roll back everything on the first error                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sale and transfer flows also have a `*_in(conn, ..)` form taking
//! `&mut SqliteConnection`, as do the Stock Engine functions in
//! [`crate::stock`], so callers holding their own transaction
//! (`Database::begin`) can compose several of them into one unit of work.
//!
//! Every multi-statement write flow opens its top-level transaction with
//! `BEGIN IMMEDIATE`. A `*_in` flow called on a bare connection falls back
//! to a deferred `BEGIN`, which under concurrent writers can fail with
//! [`DbError::Busy`](crate::DbError::Busy); wrap it in `Database::begin`.
//!
//! ## Available Repositories
//!
//! - [`CompanyRepository`](company::CompanyRepository) - Tenants
//! - [`BranchRepository`](branch::BranchRepository) - Branches and the warehouse rule
//! - [`ProductRepository`](product::ProductRepository) - Catalog and price tiers
//! - [`ClientRepository`](client::ClientRepository) - Customers
//! - [`InventoryRepository`](inventory::InventoryRepository) - Balances, kardex, receipts, adjustments
//! - [`TransferRepository`](transfer::TransferRepository) - Draft/confirm transfer documents
//! - [`SaleRepository`](sale::SaleRepository) - Checkout, edit, delete
//! - [`SyncEventRepository`](sync::SyncEventRepository) - Outbound event log

pub mod branch;
pub mod client;
pub mod company;
pub mod inventory;
pub mod product;
pub mod sale;
pub mod sync;
pub mod transfer;
