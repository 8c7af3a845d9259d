//! # Totals Calculator
//!
//! Derives subtotal, tax, and total from normalized sale lines, a
//! sale-level discount, and an explicitly supplied tax rate.
//!
//! ## Calculation
//! ```text
//! subtotal     = Σ (unit_price × quantity - line_discount)   over ALL lines
//! taxable_base = Σ (unit_price × quantity)                   over taxed lines
//! tax          = taxable_base × rate          (half-up to cents)
//! total        = subtotal - discount_total + tax
//! ```
//!
//! Note the asymmetry: line discounts reduce the subtotal but NOT the
//! taxable base. That is the observed ledger behavior this engine preserves;
//! changing it would silently re-price historical invoices.
//!
//! The tax rate is passed in by the caller (resolved from configuration at
//! the service layer) so this module stays pure and directly testable.

use serde::Serialize;

use crate::money::Money;
use crate::types::{SaleItem, TaxRate};

/// The three derived money figures for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// All-zero totals (the result for an empty line list).
    pub const fn zero() -> Self {
        SaleTotals {
            subtotal: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
        }
    }
}

/// Computes sale totals from normalized line items.
///
/// ## Edge Cases
/// - Empty item list ⇒ all outputs are zero (discount is ignored).
/// - A line with `tax_applied = false` contributes to the subtotal but not
///   to the taxable base.
///
/// ## Example
/// ```rust
/// use karat_core::money::Money;
/// use karat_core::totals::compute_totals;
/// use karat_core::types::TaxRate;
///
/// let totals = compute_totals(&[], Money::from_cents(500), TaxRate::from_bps(800));
/// assert!(totals.total.is_zero());
/// ```
pub fn compute_totals(items: &[SaleItem], discount_total: Money, rate: TaxRate) -> SaleTotals {
    if items.is_empty() {
        return SaleTotals::zero();
    }

    let mut subtotal = Money::zero();
    let mut taxable_base = Money::zero();

    for item in items {
        subtotal += item.line_net();
        if item.tax_applied {
            // Line discount intentionally not subtracted here (see module docs)
            taxable_base += item.line_gross();
        }
    }

    let tax = taxable_base.calculate_tax(rate);
    let total = subtotal - discount_total + tax;

    SaleTotals {
        subtotal,
        tax,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
