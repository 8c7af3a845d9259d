//! # Gold-Buy Service
//!
//! Operation surface for precious-metal intake tickets: create, update,
//! cancel, and lookups.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create / update Pipeline                          │
//! │                                                                         │
//! │  validate ─► weigh lines ─► payout calculator ─► persist ─► hook        │
//! │  (customer    (net / fine     (gross, fees,       (guarded   (fire-     │
//! │   complete,    grams per       payout ≥ 0)         UPDATE)    and-      │
//! │   pricing)     line)                                          forget)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An update reprices the ticket only when items AND pricing are both
//! supplied; partial input edits the other fields without touching the
//! frozen money figures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::{emit_quietly, EngineEvent, LoggingHook, NotificationHook};
use crate::numbers;
use karat_core::goldbuy::{compute_payout, line_gross, refining_fees};
use karat_core::status::can_modify;
use karat_core::validation::{
    validate_customer_complete, validate_line_count, validate_pricing, validate_purity,
    validate_weights,
};
use karat_core::{
    CustomerInfo, GoldBuyDetail, GoldBuyItem, GoldBuyStatus, GoldBuyTicket, GoldPricing,
};
use karat_db::Database;

// =============================================================================
// Requests
// =============================================================================

/// One piece of metal on the scale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldBuyItemRequest {
    /// Free-form kind: "ring", "chain", "scrap", ...
    pub item_type: String,
    pub metal: String,
    /// Stamped karat marking, informational only.
    pub karat: Option<i64>,
    /// Purity as a fraction in (0, 1].
    pub purity: f64,
    pub weight_grams: f64,
    #[serde(default)]
    pub stone_weight_grams: f64,
}

/// Request to open a ticket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoldBuyRequest {
    pub customer: CustomerInfo,
    pub items: Vec<GoldBuyItemRequest>,
    pub pricing: GoldPricing,
}

/// Request to amend a ticket. All fields optional; absent fields keep
/// their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoldBuyRequest {
    pub customer: Option<CustomerInfo>,
    pub status: Option<GoldBuyStatus>,
    /// Repricing inputs; both must be present for the money figures to
    /// be recomputed.
    pub items: Option<Vec<GoldBuyItemRequest>>,
    pub pricing: Option<GoldPricing>,
    /// Appended to the ticket's override audit log.
    pub override_reason: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates gold-buy operations over karat-core and karat-db.
#[derive(Clone)]
pub struct GoldBuyService {
    db: Database,
    hook: Arc<dyn NotificationHook>,
}

impl GoldBuyService {
    /// Creates a gold-buy service with the default logging hook.
    pub fn new(db: Database) -> Self {
        GoldBuyService {
            db,
            hook: Arc::new(LoggingHook),
        }
    }

    /// Replaces the notification hook.
    pub fn with_hook(mut self, hook: Arc<dyn NotificationHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Opens a ticket in `Draft`: weigh the lines, price the fine-gold
    /// content, persist ticket + lines.
    #[instrument(skip(self, request), fields(customer = %request.customer.name))]
    pub async fn create(&self, request: CreateGoldBuyRequest) -> ApiResult<GoldBuyDetail> {
        validate_line_count(request.items.len())?;
        validate_customer_complete(&request.customer)?;
        validate_pricing(&request.pricing)?;

        let now = Utc::now();
        let ticket_id = Uuid::new_v4().to_string();
        let items = build_items(&ticket_id, &request.items, &request.pricing, now)?;
        let totals = compute_payout(&items, &request.pricing);

        let ticket = GoldBuyTicket {
            id: ticket_id,
            ticket_number: numbers::ticket_number(now),
            status: GoldBuyStatus::Draft,
            customer_name: request.customer.name,
            customer_phone: request.customer.phone,
            customer_email: request.customer.email,
            live_price_per_gram_cents: request.pricing.live_price_per_gram_cents,
            buy_rate_bps: request.pricing.buy_rate_bps,
            test_fee_cents: request.pricing.test_fee_cents,
            refining_per_gram_cents: request.pricing.refining_per_gram_cents,
            fine_gold_grams: totals.fine_gold_grams,
            gross_cents: totals.gross.cents(),
            fees_cents: totals.fees.cents(),
            payout_cents: totals.payout.cents(),
            override_reasons: "[]".to_string(),
            created_at: now,
            updated_at: now,
        };

        self.db.gold_buys().insert_ticket(&ticket, &items).await?;

        info!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            payout_cents = ticket.payout_cents,
            "Gold buy created"
        );
        emit_quietly(
            self.hook.as_ref(),
            EngineEvent::GoldBuyCreated {
                ticket_id: ticket.id.clone(),
                ticket_number: ticket.ticket_number.clone(),
                payout_cents: ticket.payout_cents,
            },
        );

        self.get(&ticket.id).await
    }

    /// Amends a ticket. Finalized tickets (paid, posted, cancelled) are
    /// immutable; the repository's guarded UPDATE enforces that even under
    /// races, this method just gives the caller an early answer.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        ticket_id: &str,
        request: UpdateGoldBuyRequest,
    ) -> ApiResult<GoldBuyDetail> {
        let repo = self.db.gold_buys();
        let detail = repo
            .get_detail(ticket_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Gold buy", ticket_id))?;

        if !can_modify(detail.ticket.status) {
            return Err(ApiError::state_conflict("Gold buy cannot be modified"));
        }

        let mut ticket = detail.ticket;
        let mut items = detail.items;
        let now = Utc::now();

        if let Some(customer) = request.customer {
            validate_customer_complete(&customer)?;
            ticket.customer_name = customer.name;
            ticket.customer_phone = customer.phone;
            ticket.customer_email = customer.email;
        }
        if let Some(status) = request.status {
            ticket.status = status;
        }

        // Reprice only with a complete set of inputs; items without pricing
        // (or vice versa) leave the frozen money figures alone.
        if let (Some(item_requests), Some(pricing)) = (&request.items, &request.pricing) {
            validate_line_count(item_requests.len())?;
            validate_pricing(pricing)?;

            items = build_items(&ticket.id, item_requests, pricing, now)?;
            let totals = compute_payout(&items, pricing);

            ticket.live_price_per_gram_cents = pricing.live_price_per_gram_cents;
            ticket.buy_rate_bps = pricing.buy_rate_bps;
            ticket.test_fee_cents = pricing.test_fee_cents;
            ticket.refining_per_gram_cents = pricing.refining_per_gram_cents;
            ticket.fine_gold_grams = totals.fine_gold_grams;
            ticket.gross_cents = totals.gross.cents();
            ticket.fees_cents = totals.fees.cents();
            ticket.payout_cents = totals.payout.cents();
        }

        if let Some(reason) = request.override_reason {
            let mut reasons = ticket.override_reason_list();
            reasons.push(reason);
            ticket.override_reasons = serde_json::to_string(&reasons)
                .map_err(|e| ApiError::state_conflict(e.to_string()))?;
        }

        repo.update_ticket(&ticket, &items).await?;

        info!(ticket_id, status = ?ticket.status, "Gold buy updated");
        self.get(ticket_id).await
    }

    /// Cancels a ticket, optionally recording why.
    #[instrument(skip(self))]
    pub async fn cancel(&self, ticket_id: &str, reason: Option<&str>) -> ApiResult<GoldBuyTicket> {
        let ticket = self.db.gold_buys().mark_cancelled(ticket_id, reason).await?;

        info!(ticket_id, "Gold buy cancelled");
        emit_quietly(
            self.hook.as_ref(),
            EngineEvent::GoldBuyCancelled {
                ticket_id: ticket_id.to_string(),
            },
        );

        Ok(ticket)
    }

    /// Fetches the full ticket aggregate.
    pub async fn get(&self, ticket_id: &str) -> ApiResult<GoldBuyDetail> {
        self.db
            .gold_buys()
            .get_detail(ticket_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Gold buy", ticket_id))
    }

    /// Lists recent tickets.
    pub async fn list(&self, limit: u32) -> ApiResult<Vec<GoldBuyTicket>> {
        Ok(self.db.gold_buys().list(limit).await?)
    }
}

// =============================================================================
// Line assembly
// =============================================================================

/// Validates each requested line and derives its weights and money figures.
fn build_items(
    ticket_id: &str,
    requests: &[GoldBuyItemRequest],
    pricing: &GoldPricing,
    now: DateTime<Utc>,
) -> ApiResult<Vec<GoldBuyItem>> {
    requests
        .iter()
        .map(|request| {
            validate_purity(request.purity)?;
            validate_weights(request.weight_grams, request.stone_weight_grams)?;

            let net_weight_grams = request.weight_grams - request.stone_weight_grams;
            let fine_gold_grams = net_weight_grams * request.purity;
            let gross = line_gross(fine_gold_grams, pricing);
            let fees = refining_fees(fine_gold_grams, pricing);
            let payout = (gross - fees).floor_at_zero();

            Ok(GoldBuyItem {
                id: Uuid::new_v4().to_string(),
                ticket_id: ticket_id.to_string(),
                item_type: request.item_type.clone(),
                metal: request.metal.clone(),
                karat: request.karat,
                purity: request.purity,
                weight_grams: request.weight_grams,
                stone_weight_grams: request.stone_weight_grams,
                net_weight_grams,
                fine_gold_grams,
                line_fees_cents: fees.cents(),
                line_payout_cents: payout.cents(),
                created_at: now,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use karat_db::DbConfig;

    async fn service() -> GoldBuyService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        GoldBuyService::new(db)
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Sam Seller".to_string(),
            phone: Some("555-0101".to_string()),
            email: None,
        }
    }

    fn pricing() -> GoldPricing {
        GoldPricing {
            live_price_per_gram_cents: 6_500,
            buy_rate_bps: 9_000,
            test_fee_cents: 500,
            refining_per_gram_cents: 50,
        }
    }

    fn pure_gold(weight_grams: f64) -> GoldBuyItemRequest {
        GoldBuyItemRequest {
            item_type: "scrap".to_string(),
            metal: "gold".to_string(),
            karat: Some(24),
            purity: 1.0,
            weight_grams,
            stone_weight_grams: 0.0,
        }
    }

    /// 10g pure gold at $65/g, 90% rate, $5 test, $0.50/g refining:
    /// gross $585, fees $10, payout $575.
    #[tokio::test]
    async fn test_create_ticket_payout() {
        let service = service().await;
        let detail = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();

        assert_eq!(detail.ticket.status, GoldBuyStatus::Draft);
        assert_eq!(detail.ticket.gross_cents, 58_500);
        assert_eq!(detail.ticket.fees_cents, 1_000);
        assert_eq!(detail.ticket.payout_cents, 57_500);
        assert!(detail.ticket.ticket_number.starts_with("GB-"));
        assert_eq!(detail.items.len(), 1);
        assert!((detail.items[0].fine_gold_grams - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_requires_complete_customer_and_items() {
        let service = service().await;

        let err = service
            .create(CreateGoldBuyRequest {
                customer: CustomerInfo {
                    name: "Sam".to_string(),
                    phone: None, // phone required for payouts
                    email: None,
                },
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![],
                pricing: pricing(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_update_reprices_only_with_items_and_pricing() {
        let service = service().await;
        let detail = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();
        let id = detail.ticket.id.clone();

        // Pricing alone: money figures stay frozen.
        let mut higher = pricing();
        higher.live_price_per_gram_cents = 7_000;
        let detail = service
            .update(
                &id,
                UpdateGoldBuyRequest {
                    pricing: Some(higher),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.ticket.payout_cents, 57_500);
        assert_eq!(detail.ticket.live_price_per_gram_cents, 6_500);

        // Items + pricing: full reprice.
        let detail = service
            .update(
                &id,
                UpdateGoldBuyRequest {
                    items: Some(vec![pure_gold(20.0)]),
                    pricing: Some(pricing()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // 20g: gross 117_000, fees 500 + 1_000, payout 115_500
        assert_eq!(detail.ticket.gross_cents, 117_000);
        assert_eq!(detail.ticket.fees_cents, 1_500);
        assert_eq!(detail.ticket.payout_cents, 115_500);
        assert_eq!(detail.items.len(), 1);
    }

    #[tokio::test]
    async fn test_finalized_ticket_rejects_update() {
        let service = service().await;
        let detail = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();
        let id = detail.ticket.id.clone();

        service
            .update(
                &id,
                UpdateGoldBuyRequest {
                    status: Some(GoldBuyStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .update(
                &id,
                UpdateGoldBuyRequest {
                    status: Some(GoldBuyStatus::Draft),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert!(err.message.contains("cannot be modified"));
    }

    #[tokio::test]
    async fn test_cancel_records_reason_and_is_terminal() {
        let service = service().await;
        let detail = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();
        let id = detail.ticket.id.clone();

        let cancelled = service
            .cancel(&id, Some("customer declined quote"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, GoldBuyStatus::Cancelled);
        assert_eq!(
            cancelled.override_reason_list(),
            vec!["customer declined quote".to_string()]
        );

        let err = service.cancel(&id, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);

        let err = service.cancel("ghost", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_appends_override_reason() {
        let service = service().await;
        let detail = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(10.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();

        let detail = service
            .update(
                &detail.ticket.id,
                UpdateGoldBuyRequest {
                    override_reason: Some("manager approved rate bump".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            detail.ticket.override_reason_list(),
            vec!["manager approved rate bump".to_string()]
        );
    }

    #[tokio::test]
    async fn test_bad_weights_rejected() {
        let service = service().await;
        let mut heavy_stone = pure_gold(5.0);
        heavy_stone.stone_weight_grams = 6.0;

        let err = service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![heavy_stone],
                pricing: pricing(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_list_tickets() {
        let service = service().await;
        service
            .create(CreateGoldBuyRequest {
                customer: customer(),
                items: vec![pure_gold(1.0)],
                pricing: pricing(),
            })
            .await
            .unwrap();

        let tickets = service.list(10).await.unwrap();
        assert_eq!(tickets.len(), 1);
    }
}
