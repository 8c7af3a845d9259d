//! # Validation Module
//!
//! Input validation for sale and gold-buy requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service entry (karat-engine)                                  │
//! │  └── THIS MODULE: required fields, ranges, completeness                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Business rules (resolver, state machines)                     │
//! │  └── not-found / state-conflict / layaway guards                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL, UNIQUE, FK constraints, conditional updates              │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different failure class         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::goldbuy::GoldPricing;
use crate::types::CustomerInfo;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Collection Validators
// =============================================================================

/// A sale or ticket must carry at least one line, and not absurdly many.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }
    if count > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Customer Validators
// =============================================================================

/// A sale requires a customer name.
pub fn validate_customer_name(customer: &CustomerInfo) -> ValidationResult<()> {
    if customer.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }
    if customer.name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Gold intake requires complete contact details (name + phone) so the
/// payout can be traced back to a reachable seller.
pub fn validate_customer_complete(customer: &CustomerInfo) -> ValidationResult<()> {
    validate_customer_name(customer)?;
    match &customer.phone {
        Some(phone) if !phone.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::Required {
            field: "customer phone".to_string(),
        }),
    }
}

// =============================================================================
// Sale Field Validators
// =============================================================================

/// Quantity must be positive and within bounds.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Prices and discounts must be non-negative (zero is allowed).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Sales carry a policy block for receipt footers.
pub fn validate_policy_title(title: &str) -> ValidationResult<()> {
    if title.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "policy title".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Gold-Buy Validators
// =============================================================================

/// Purity is a fraction in (0, 1].
pub fn validate_purity(purity: f64) -> ValidationResult<()> {
    if !(purity > 0.0 && purity <= 1.0) {
        return Err(ValidationError::InvalidFormat {
            field: "purity".to_string(),
            reason: "must be a fraction in (0, 1]".to_string(),
        });
    }
    Ok(())
}

/// Weights must be non-negative and stones cannot outweigh the piece.
pub fn validate_weights(weight_grams: f64, stone_weight_grams: f64) -> ValidationResult<()> {
    if weight_grams <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "weight".to_string(),
        });
    }
    if stone_weight_grams < 0.0 {
        return Err(ValidationError::InvalidFormat {
            field: "stone weight".to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    if stone_weight_grams > weight_grams {
        return Err(ValidationError::InvalidFormat {
            field: "stone weight".to_string(),
            reason: "must not exceed item weight".to_string(),
        });
    }
    Ok(())
}

/// Live price and buy rate must be positive; fees must be non-negative at
/// the wire level (negative refining is tolerated downstream as "no fee").
pub fn validate_pricing(pricing: &GoldPricing) -> ValidationResult<()> {
    if pricing.live_price_per_gram_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "live price per gram".to_string(),
        });
    }
    if pricing.buy_rate_bps == 0 {
        return Err(ValidationError::MustBePositive {
            field: "buy rate".to_string(),
        });
    }
    if pricing.test_fee_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "test fee".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
