//! # Gold Buy-Back
//!
//! Types and payout arithmetic for precious-metal intake tickets.
//!
//! A ticket records a customer selling metal to the business. Each line
//! carries raw weights; the calculator derives fine-gold content and prices
//! it against ticket-wide live pricing:
//!
//! ```text
//! net_weight  = weight - stone_weight
//! fine_gold   = net_weight × purity
//! line_gross  = fine_gold × live_price_per_gram × buy_rate
//! line_fees   = fine_gold × refining_per_gram
//! line_payout = max(line_gross - line_fees, 0)
//!
//! ticket.gross  = Σ line_gross          (summed per line - see note)
//! ticket.fees   = test_fee + Σ line refining
//! ticket.payout = max(gross - fees, 0)
//! ```
//!
//! Gross is summed per line even though ticket-wide pricing makes that
//! mathematically equal to one ticket-level multiplication. Keep it per
//! line: per-line pricing is the expected next step and the rounding story
//! is already settled at the line boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Gold-Buy Status
// =============================================================================

/// Lifecycle of a buy ticket. Creation always starts at `Draft`.
///
/// `Paid`, `Posted`, and `Cancelled` tickets are immutable;
/// `Cancelled` and `Void` tickets cannot be cancelled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum GoldBuyStatus {
    Draft,
    Testing,
    Quoted,
    Accepted,
    Paid,
    Posted,
    Cancelled,
    Void,
}

impl Default for GoldBuyStatus {
    fn default() -> Self {
        GoldBuyStatus::Draft
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Ticket-wide pricing inputs.
///
/// Live price and fees are integer cents; the buy rate is basis points
/// (9000 = the business pays 90% of spot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldPricing {
    /// Live spot price for pure (24k) gold, cents per gram.
    pub live_price_per_gram_cents: i64,
    /// Fraction of spot offered for intake metal, in basis points.
    pub buy_rate_bps: u32,
    /// Flat assay/testing fee per ticket, cents.
    pub test_fee_cents: i64,
    /// Refining fee, cents per fine gram. Non-positive values mean no fee.
    pub refining_per_gram_cents: i64,
}

// =============================================================================
// Gold-Buy Item
// =============================================================================

/// One intake line on a buy ticket, with derived weights and money frozen
/// at computation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoldBuyItem {
    pub id: String,
    pub ticket_id: String,
    /// Free-form kind: "ring", "chain", "scrap", ...
    pub item_type: String,
    pub metal: String,
    /// Karat marking if stamped (informational; purity is authoritative).
    pub karat: Option<i64>,
    /// Metal purity as a fraction (0, 1].
    pub purity: f64,
    pub weight_grams: f64,
    pub stone_weight_grams: f64,
    /// weight - stone_weight.
    pub net_weight_grams: f64,
    /// net_weight × purity.
    pub fine_gold_grams: f64,
    pub line_fees_cents: i64,
    pub line_payout_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl GoldBuyItem {
    /// Gross value of this line at the given pricing (before fees).
    pub fn line_gross(&self, pricing: &GoldPricing) -> Money {
        line_gross(self.fine_gold_grams, pricing)
    }
}

/// Prices the fine-gold content of one line: grams × spot × buy rate,
/// rounded half-up to cents.
pub fn line_gross(fine_gold_grams: f64, pricing: &GoldPricing) -> Money {
    let spot = fine_gold_grams * pricing.live_price_per_gram_cents as f64;
    let gross = spot * pricing.buy_rate_bps as f64 / 10_000.0;
    Money::from_fractional_cents(gross)
}

/// Refining fee for a quantity of fine gold; zero when the per-gram fee is
/// non-positive.
pub fn refining_fees(fine_gold_grams: f64, pricing: &GoldPricing) -> Money {
    if pricing.refining_per_gram_cents <= 0 {
        return Money::zero();
    }
    Money::from_fractional_cents(fine_gold_grams * pricing.refining_per_gram_cents as f64)
}

// =============================================================================
// Payout Totals
// =============================================================================

/// Derived ticket-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTotals {
    pub fine_gold_grams: f64,
    pub gross: Money,
    pub fees: Money,
    pub payout: Money,
}

/// Computes ticket totals from items (each pre-carrying `fine_gold_grams`)
/// and ticket-wide pricing.
///
/// `payout = max(gross - fees, 0)` - never negative, even when the test fee
/// exceeds the value of the metal.
pub fn compute_payout(items: &[GoldBuyItem], pricing: &GoldPricing) -> PayoutTotals {
    let mut fine_gold_grams = 0.0;
    let mut gross = Money::zero();

    for item in items {
        fine_gold_grams += item.fine_gold_grams;
        gross += item.line_gross(pricing);
    }

    let fees = Money::from_cents(pricing.test_fee_cents) + refining_fees(fine_gold_grams, pricing);
    let payout = (gross - fees).floor_at_zero();

    PayoutTotals {
        fine_gold_grams,
        gross,
        fees,
        payout,
    }
}

// =============================================================================
// Gold-Buy Ticket
// =============================================================================

/// A precious-metal intake ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoldBuyTicket {
    pub id: String,
    pub ticket_number: String,
    pub status: GoldBuyStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub live_price_per_gram_cents: i64,
    pub buy_rate_bps: u32,
    pub test_fee_cents: i64,
    pub refining_per_gram_cents: i64,
    pub fine_gold_grams: f64,
    pub gross_cents: i64,
    pub fees_cents: i64,
    pub payout_cents: i64,
    /// JSON-encoded list of override reason strings.
    pub override_reasons: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoldBuyTicket {
    /// Returns the pricing block stored on the ticket.
    pub fn pricing(&self) -> GoldPricing {
        GoldPricing {
            live_price_per_gram_cents: self.live_price_per_gram_cents,
            buy_rate_bps: self.buy_rate_bps,
            test_fee_cents: self.test_fee_cents,
            refining_per_gram_cents: self.refining_per_gram_cents,
        }
    }

    /// Returns the payout as Money.
    #[inline]
    pub fn payout(&self) -> Money {
        Money::from_cents(self.payout_cents)
    }

    /// Decodes the override reason list.
    pub fn override_reason_list(&self) -> Vec<String> {
        serde_json::from_str(&self.override_reasons).unwrap_or_default()
    }
}

/// The full ticket aggregate returned by engine operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldBuyDetail {
    pub ticket: GoldBuyTicket,
    pub items: Vec<GoldBuyItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================
