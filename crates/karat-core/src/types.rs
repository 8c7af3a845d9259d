//! # Domain Types
//!
//! Core domain types for the sale/transaction ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    SaleItem     │   │   Installment   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  invoice_number │   │  sale_id (FK)   │   │  sale_id (FK)   │       │
//! │  │  status         │   │  item_type      │   │  method         │       │
//! │  │  total_cents    │   │  price snapshot │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  bps (u32)      │   │  Pending        │   │  Cash           │       │
//! │  │  800 = 8%       │   │  Installment    │   │  Card           │       │
//! │  └─────────────────┘   │  Paid           │   │  Split          │       │
//! │                        │  Refunded       │   └─────────────────┘       │
//! │                        │  Voided         │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every aggregate has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number: (invoice_number, ticket_number) - human-readable, unique

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 800 bps = 8% sales tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Normalizes a raw configuration value into a tax rate.
    ///
    /// The configuration store keeps the rate as a bare number with two
    /// historical conventions in the wild:
    /// - values above 1 are percentages (`8` means 8%)
    /// - values at or below 1 are fractions (`0.08` means 8%)
    ///
    /// Non-positive or absent values normalize to a zero rate.
    ///
    /// ## Example
    /// ```rust
    /// use karat_core::types::TaxRate;
    ///
    /// assert_eq!(TaxRate::from_raw(8.0).bps(), 800);
    /// assert_eq!(TaxRate::from_raw(0.08).bps(), 800);
    /// assert_eq!(TaxRate::from_raw(0.0).bps(), 0);
    /// ```
    pub fn from_raw(raw: f64) -> Self {
        if raw <= 0.0 {
            return TaxRate(0);
        }
        let bps = if raw > 1.0 {
            // Percentage: 8 → 8% → 800 bps
            raw * 100.0
        } else {
            // Fraction: 0.08 → 8% → 800 bps
            raw * 10_000.0
        };
        TaxRate(bps.round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Customer Info
// =============================================================================

/// Customer details captured on sales and gold-buy tickets.
///
/// Stored flattened on the owning row; this struct is the request/response
/// representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// An inventory record referenced by sale lines.
///
/// The engine never trusts caller-supplied prices for inventory lines; the
/// price snapshot is always taken from this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown on the invoice.
    pub name: String,

    /// Optional description copied onto inventory sale lines.
    pub description: Option<String>,

    /// Selling price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Whether this item has been sold.
    pub is_sold: bool,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// `Refunded` is terminal - no transition exists out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Created but not yet classified (transient default).
    Pending,
    /// Layaway with an outstanding balance.
    Installment,
    /// Fully settled (or non-layaway, which settles at checkout).
    Paid,
    /// Refunded - terminal.
    Refunded,
    /// Administratively voided.
    Voided,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

// =============================================================================
// Sale Line Kind
// =============================================================================

/// Discriminates how a sale line is priced and taxed.
///
/// `Inventory` lines snapshot price/SKU/name from the inventory record;
/// every other kind is ad-hoc and carries caller-supplied values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SaleLineKind {
    Inventory,
    Custom,
    Service,
    Grill,
    GoldBuy,
    Repair,
}

impl SaleLineKind {
    /// Inventory lines are the only kind that requires a stock reference.
    #[inline]
    pub const fn is_inventory(&self) -> bool {
        matches!(self, SaleLineKind::Inventory)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Mixed tender; cash/card breakdown carried on the installment.
    Split,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed or in-progress retail sale.
///
/// ## Invariants
/// - `total = subtotal - discount_total + tax` (cents, half-up)
/// - `paid_amount = Σ installment.amount`
/// - `balance_amount = max(total - paid_amount, 0)`
/// - layaway sales carry at least one installment
/// - once `is_refund` is set, money fields are frozen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_total_cents: i64,
    pub total_cents: i64,
    pub paid_amount_cents: i64,
    pub balance_amount_cents: i64,
    pub status: SaleStatus,
    pub is_layaway: bool,
    pub is_refund: bool,
    /// For refund records created against an earlier sale.
    pub refunded_sale_id: Option<String>,
    pub policy_title: String,
    pub policy_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the amount paid so far as Money.
    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// Returns the outstanding balance as Money.
    #[inline]
    pub fn balance_amount(&self) -> Money {
        Money::from_cents(self.balance_amount_cents)
    }

    /// Reassembles the customer view from the flattened columns.
    pub fn customer(&self) -> CustomerInfo {
        CustomerInfo {
            name: self.customer_name.clone(),
            phone: self.customer_phone.clone(),
            email: self.customer_email.clone(),
        }
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item on a sale.
///
/// Uses the snapshot pattern: inventory details (sku, name, price) are
/// frozen at the time of sale so later inventory edits never rewrite
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub item_type: SaleLineKind,
    /// Inventory reference; present only for `Inventory` lines.
    pub inventory_id: Option<String>,
    /// SKU at time of sale (frozen; inventory lines only).
    pub sku: Option<String>,
    /// Name at time of sale (frozen for inventory, caller-supplied otherwise).
    pub name: String,
    pub description: Option<String>,
    /// Unit price in cents at time of sale (frozen for inventory lines).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Discount applied to this line.
    pub discount_cents: i64,
    /// Whether this line contributes to the taxable base.
    pub tax_applied: bool,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Gross line amount before discount (unit price × quantity).
    #[inline]
    pub fn line_gross(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Net line amount after the line discount.
    #[inline]
    pub fn line_net(&self) -> Money {
        self.line_gross() - Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Installment
// =============================================================================

/// One recorded payment applied toward a sale's balance.
///
/// A layaway sale accumulates installments over time; a historical backfill
/// supplies the full sequence up front. Ordering is by insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Installment {
    pub id: String,
    pub sale_id: String,
    /// Amount paid in cents; always positive.
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// For split tender: cash portion.
    pub cash_amount_cents: Option<i64>,
    /// For split tender: card portion.
    pub card_amount_cents: Option<i64>,
    pub paid_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Installment {
    /// Returns the installment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Sale Detail
// =============================================================================

/// The full sale aggregate returned by engine operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub installments: Vec<Installment>,
}

// =============================================================================
// Unit Tests
// =============================================================================
