//! # Status Machines
//!
//! Pure transition functions for the sale and gold-buy lifecycles.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Status Machine                              │
//! │                                                                         │
//! │   creation ──┬── refund record ────────────► refunded (terminal)        │
//! │              ├── layaway, balance > 0 ─────► installment                │
//! │              ├── layaway, balance ≤ 0 ─────► paid                       │
//! │              └── non-layaway ──────────────► paid (unconditional)       │
//! │                                                                         │
//! │   installment ── payment, balance ≤ 0 ─────► paid                       │
//! │   installment ── payment, balance > 0 ─────► installment                │
//! │   any non-refunded ── refund ──────────────► refunded (terminal)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each transition is a standalone pure function so the services never
//! compare status strings inline; the enum plus these functions are the
//! single source of truth for lifecycle rules.

use crate::goldbuy::GoldBuyStatus;
use crate::money::Money;
use crate::types::SaleStatus;

// =============================================================================
// Sale Transitions
// =============================================================================

/// Derives the status of a freshly created sale.
///
/// Non-layaway sales are ALWAYS initialized to `Paid`, even when the
/// collected installments do not cover the total. That is long-observed
/// ledger behavior that reporting depends on; it is preserved here rather
/// than corrected.
pub fn derive_initial_status(is_refund: bool, is_layaway: bool, balance: Money) -> SaleStatus {
    if is_refund {
        return SaleStatus::Refunded;
    }
    if is_layaway {
        if balance.is_positive() {
            SaleStatus::Installment
        } else {
            SaleStatus::Paid
        }
    } else {
        SaleStatus::Paid
    }
}

/// Status after a layaway payment has been applied.
pub fn after_payment(balance: Money) -> SaleStatus {
    if balance.is_positive() {
        SaleStatus::Installment
    } else {
        SaleStatus::Paid
    }
}

/// Whether a sale in the given state may be refunded.
///
/// Refund is terminal: refunding twice is a state conflict.
pub fn can_refund(status: SaleStatus) -> bool {
    status != SaleStatus::Refunded
}

// =============================================================================
// Gold-Buy Transitions
// =============================================================================

/// Whether a ticket's items/pricing may still be modified.
///
/// Paid, posted, and cancelled tickets are immutable.
pub fn can_modify(status: GoldBuyStatus) -> bool {
    !matches!(
        status,
        GoldBuyStatus::Paid | GoldBuyStatus::Posted | GoldBuyStatus::Cancelled
    )
}

/// Whether a ticket may be cancelled.
pub fn can_cancel(status: GoldBuyStatus) -> bool {
    !matches!(status, GoldBuyStatus::Cancelled | GoldBuyStatus::Void)
}

// =============================================================================
// Unit Tests
// =============================================================================
