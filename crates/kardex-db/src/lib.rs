//! # kardex-db: Database Layer for Kardex POS
//!
//! SQLite persistence for the inventory core, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kardex POS Data Flow                             │
//! │                                                                         │
//! │  Route handler (validated company_id / branch_id)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kardex-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  Repositories │    │ Stock Engine  │    │  Migrations  │  │   │
//! │  │   │               │    │  (stock.rs)   │    │  (embedded)  │  │   │
//! │  │   │ SaleRepo      │───►│ add_stock     │    │ 001_initial  │  │   │
//! │  │   │ TransferRepo  │───►│ remove_stock  │    │              │  │   │
//! │  │   │ InventoryRepo │───►│ transfer_stock│    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           └────────┬───────────┘                               │   │
//! │  │                    ▼                                           │   │
//! │  │            Database (pool.rs)                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: inventories (balances) + kardex_movements (ledger)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and repository access
//! - [`config`] - `DbConfig` builder and environment loading
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`stock`] - The Stock Engine, sole writer of balances and kardex rows
//! - [`repository`] - Master data, inventory, transfers, sales, sync log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kardex_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let sale = db.sales().checkout(&request).await?;
//! let kardex = db.inventory().kardex(&KardexFilter::for_company(1)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod stock;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult};
pub use pool::Database;
pub use stock::{BalanceMismatch, StockChange, TransferChange};

// Repository re-exports for convenience
pub use repository::branch::BranchRepository;
pub use repository::client::ClientRepository;
pub use repository::company::CompanyRepository;
pub use repository::inventory::{InventoryRepository, KardexFilter, StockListRow};
pub use repository::product::ProductRepository;
pub use repository::sale::{SaleDocument, SaleRepository};
pub use repository::sync::{SyncEventRepository, SyncStatusCount};
pub use repository::transfer::{ConfirmOutcome, TransferDocument, TransferRepository};
