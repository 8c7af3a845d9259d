//! # karat-db: Database Layer for the Karat Back-Office
//!
//! SQLite persistence for the transaction and payout engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Karat Data Flow                                  │
//! │                                                                         │
//! │  Engine service (create_sale, cancel_gold_buy, ...)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     karat-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│  inventory    │    │  (embedded)  │   │   │
//! │  │   │   SqlitePool  │    │  sale         │    │  001_init    │   │   │
//! │  │   │               │    │  goldbuy      │    │              │   │   │
//! │  │   │               │    │  config       │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                      SQLite Database (WAL)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use karat_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/karat.db")).await?;
//! let sale = db.sales().get_detail("sale-id").await?;
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
pub use repository::config::ConfigRepository;
pub use repository::goldbuy::GoldBuyRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::sale::SaleRepository;
