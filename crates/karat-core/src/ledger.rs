//! # Payment Ledger
//!
//! Accumulates installments into paid/balance figures.
//!
//! The ledger is recomputed over the full installment list every time it is
//! touched - both for the historical backfill (full set supplied up front)
//! and after each layaway payment. A recompute is cheap at receipt scale
//! and keeps the paid/balance columns a pure function of the rows.

use serde::Serialize;

use crate::money::Money;
use crate::types::Installment;

/// Derived ledger figures for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    /// Σ installment.amount over the current list.
    pub paid_amount: Money,
    /// max(total - paid, 0) - never negative, even when overpaid.
    pub balance_amount: Money,
}

/// Computes the ledger figures for a sale total and its installments.
///
/// ## Example
/// ```rust
/// use karat_core::ledger::compute_ledger_cents;
/// use karat_core::money::Money;
///
/// let ledger = compute_ledger_cents(Money::from_cents(49_000), &[20_000, 29_000]);
/// assert_eq!(ledger.paid_amount.cents(), 49_000);
/// assert!(ledger.balance_amount.is_zero());
/// ```
pub fn compute_ledger_cents(total: Money, amounts_cents: &[i64]) -> LedgerTotals {
    let paid_amount: Money = amounts_cents.iter().map(|c| Money::from_cents(*c)).sum();
    let balance_amount = (total - paid_amount).floor_at_zero();
    LedgerTotals {
        paid_amount,
        balance_amount,
    }
}

/// Computes the ledger figures from full installment rows.
pub fn compute_ledger(total: Money, installments: &[Installment]) -> LedgerTotals {
    let paid_amount: Money = installments.iter().map(Installment::amount).sum();
    let balance_amount = (total - paid_amount).floor_at_zero();
    LedgerTotals {
        paid_amount,
        balance_amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_installments() {
        let ledger = compute_ledger_cents(Money::from_cents(49_000), &[]);
        assert_eq!(ledger.paid_amount.cents(), 0);
        assert_eq!(ledger.balance_amount.cents(), 49_000);
    }

    /// Layaway scenario: total $490; pay $200 then $290.
    #[test]
    fn test_progressive_payments() {
        let total = Money::from_cents(49_000);

        let after_first = compute_ledger_cents(total, &[20_000]);
        assert_eq!(after_first.paid_amount.cents(), 20_000);
        assert_eq!(after_first.balance_amount.cents(), 29_000);

        let after_second = compute_ledger_cents(total, &[20_000, 29_000]);
        assert_eq!(after_second.paid_amount.cents(), 49_000);
        assert_eq!(after_second.balance_amount.cents(), 0);
    }

    #[test]
    fn test_overpayment_floors_balance_at_zero() {
        let ledger = compute_ledger_cents(Money::from_cents(10_000), &[15_000]);
        assert_eq!(ledger.paid_amount.cents(), 15_000);
        assert_eq!(ledger.balance_amount.cents(), 0);
    }

    /// Ledger consistency property: paid == Σ amounts for any sequence.
    #[test]
    fn test_paid_is_sum_of_amounts() {
        let amounts = [1, 250, 999, 42_000];
        let ledger = compute_ledger_cents(Money::from_cents(100_000), &amounts);
        assert_eq!(ledger.paid_amount.cents(), amounts.iter().sum::<i64>());
    }
}
