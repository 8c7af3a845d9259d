//! # karat-core: Pure Business Logic for the Karat Back-Office
//!
//! This crate is the **heart** of the transaction and payout engine. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Karat Back-Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    karat-engine (Services)                      │   │
//! │  │    create_sale, refund_sale, add_layaway_payment, gold-buy ops  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ karat-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌───────────┐    │   │
//! │  │   │ money  │ │ totals │ │ ledger │ │ status │ │  goldbuy  │    │   │
//! │  │   └────────┘ └────────┘ └────────┘ └────────┘ └───────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    karat-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleItem, Installment, InventoryItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`totals`] - Subtotal / tax / total derivation for a sale
//! - [`ledger`] - Installment accumulation into paid/balance figures
//! - [`status`] - Sale and gold-buy state machines (pure transitions)
//! - [`goldbuy`] - Gold buy-back types and payout calculator
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
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
pub mod goldbuy;
pub mod ledger;
pub mod money;
pub mod status;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use karat_core::Money` instead of
// `use karat_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use goldbuy::{GoldBuyDetail, GoldBuyItem, GoldBuyStatus, GoldBuyTicket, GoldPricing, PayoutTotals};
pub use ledger::LedgerTotals;
pub use money::Money;
pub use totals::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of line items allowed on a single sale or ticket.
///
/// ## Business Reason
/// Prevents runaway requests and keeps receipts printable.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single sale line.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
