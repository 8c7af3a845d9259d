//! # Line-Item Resolver
//!
//! Normalizes caller-supplied sale lines into priced, frozen `SaleItem`
//! rows before any money math runs.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory line                                                         │
//! │    ├── requires inventoryId; missing or unknown id ⇒ NOT_FOUND          │
//! │    ├── sku / name / description / unit price SNAPSHOT from the record   │
//! │    │   (caller-supplied prices are ignored: tamper resistance)          │
//! │    └── tax_applied = true                                               │
//! │                                                                         │
//! │  ad-hoc line (custom / service / grill / gold_buy / repair)             │
//! │    ├── requires name and unit price from the caller                     │
//! │    └── tax_applied = false                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver also collects the inventory ids referenced by the sale so
//! the sale repository can mark them sold inside the same transaction.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use karat_core::validation::{validate_line_count, validate_price_cents, validate_quantity};
use karat_core::{SaleItem, SaleLineKind, ValidationError};
use karat_db::InventoryRepository;

/// One requested sale line, before resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub item_type: SaleLineKind,
    /// Required for inventory lines, ignored otherwise.
    pub inventory_id: Option<String>,
    /// Required for ad-hoc lines; ignored for inventory lines.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Required for ad-hoc lines; ignored for inventory lines.
    pub unit_price_cents: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// The resolver's output: frozen line rows plus the inventory ids they
/// reference.
#[derive(Debug)]
pub struct ResolvedLines {
    pub items: Vec<SaleItem>,
    pub inventory_ids: Vec<String>,
}

/// Resolves requested lines into `SaleItem` rows for the given sale.
pub async fn resolve_lines(
    inventory: &InventoryRepository,
    sale_id: &str,
    requests: &[SaleLineRequest],
    now: DateTime<Utc>,
) -> ApiResult<ResolvedLines> {
    validate_line_count(requests.len())?;

    let mut items = Vec::with_capacity(requests.len());
    let mut inventory_ids = Vec::new();

    for request in requests {
        validate_quantity(request.quantity)?;
        validate_price_cents("line discount", request.discount_cents)?;

        let item = if request.item_type.is_inventory() {
            // A line claiming inventory without naming a record is a failed
            // lookup, not a malformed field.
            let Some(inventory_id) = request.inventory_id.as_deref() else {
                return Err(ApiError::not_found("Inventory item", "(no reference)"));
            };

            let record = inventory
                .get_by_id(inventory_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Inventory item", inventory_id))?;

            inventory_ids.push(record.id.clone());

            SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                item_type: SaleLineKind::Inventory,
                inventory_id: Some(record.id),
                sku: Some(record.sku),
                name: record.name,
                description: record.description,
                unit_price_cents: record.price_cents,
                quantity: request.quantity,
                discount_cents: request.discount_cents,
                tax_applied: true,
                created_at: now,
            }
        } else {
            let name = match request.name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => {
                    return Err(ValidationError::Required {
                        field: "line name".to_string(),
                    }
                    .into())
                }
            };
            let unit_price_cents = request.unit_price_cents.ok_or_else(|| {
                ApiError::from(ValidationError::Required {
                    field: "unit price".to_string(),
                })
            })?;
            validate_price_cents("unit price", unit_price_cents)?;

            SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.to_string(),
                item_type: request.item_type,
                inventory_id: None,
                sku: None,
                name,
                description: request.description.clone(),
                unit_price_cents,
                quantity: request.quantity,
                discount_cents: request.discount_cents,
                tax_applied: false,
                created_at: now,
            }
        };

        items.push(item);
    }

    Ok(ResolvedLines {
        items,
        inventory_ids,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
