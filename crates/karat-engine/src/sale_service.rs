//! # Sale Service
//!
//! The sale-side operation surface: create, refund, layaway payments, and
//! historical backfill.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        create_sale Pipeline                             │
//! │                                                                         │
//! │  validate ─► resolve lines ─► totals ─► ledger ─► status ─► persist     │
//! │  (input)     (inventory       (tax      (paid/    (state    (ONE tx,    │
//! │               snapshot)        rate)     balance)  machine)  mark sold) │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                             notification hook           │
//! │                                             (fire-and-forget)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tax rate is read from configuration here and passed into the pure
//! calculator; karat-core never touches storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::{emit_quietly, EngineEvent, LoggingHook, NotificationHook};
use crate::numbers;
use crate::resolver::{resolve_lines, SaleLineRequest};
use karat_core::ledger::compute_ledger;
use karat_core::status::{after_payment, derive_initial_status};
use karat_core::totals::compute_totals;
use karat_core::validation::{
    validate_customer_name, validate_policy_title, validate_price_cents,
};
use karat_core::{
    CoreError, CustomerInfo, Installment, Money, PaymentMethod, Sale, SaleDetail, SaleStatus,
    TaxRate, ValidationError,
};
use karat_db::Database;

// =============================================================================
// Requests
// =============================================================================

/// One payment to record against a sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub method: PaymentMethod,
    /// Split tender: cash portion.
    pub cash_amount_cents: Option<i64>,
    /// Split tender: card portion.
    pub card_amount_cents: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    /// When the payment happened; defaults to now. Historical backfills
    /// supply real past dates.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Request to create a sale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub customer: CustomerInfo,
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount_total_cents: i64,
    #[serde(default)]
    pub is_layaway: bool,
    /// Payments collected at the counter. Layaway requires at least one.
    #[serde(default)]
    pub payments: Vec<PaymentRequest>,
    pub policy_title: String,
    pub policy_description: Option<String>,
    /// Set when this record is a refund issued against an earlier sale.
    #[serde(default)]
    pub is_refund: bool,
    pub refunded_sale_id: Option<String>,
}

/// Request to backfill a layaway sale that predates the system.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalLayawayRequest {
    pub customer: CustomerInfo,
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount_total_cents: i64,
    /// The original sale date; becomes the record's created_at.
    pub sale_date: DateTime<Utc>,
    /// Full payment history, oldest first. At least one required.
    pub payments: Vec<PaymentRequest>,
    pub policy_title: String,
    pub policy_description: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates sale operations over karat-core and karat-db.
#[derive(Clone)]
pub struct SaleService {
    db: Database,
    hook: Arc<dyn NotificationHook>,
}

impl SaleService {
    /// Creates a sale service with the default logging hook.
    pub fn new(db: Database) -> Self {
        SaleService {
            db,
            hook: Arc::new(LoggingHook),
        }
    }

    /// Replaces the notification hook.
    pub fn with_hook(mut self, hook: Arc<dyn NotificationHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Creates a sale: resolve lines, derive money figures and status, then
    /// persist sale + items + installments + inventory sold-flags in one
    /// transaction.
    #[instrument(skip(self, request), fields(customer = %request.customer.name))]
    pub async fn create_sale(&self, request: CreateSaleRequest) -> ApiResult<SaleDetail> {
        let now = Utc::now();
        self.create_sale_at(request, now, now).await
    }

    /// Backfills a layaway sale with its full payment history. The record
    /// is dated at the original sale date, not at entry time.
    #[instrument(skip(self, request), fields(customer = %request.customer.name))]
    pub async fn create_historical_layaway(
        &self,
        request: HistoricalLayawayRequest,
    ) -> ApiResult<SaleDetail> {
        if request.payments.is_empty() {
            return Err(ValidationError::Empty {
                field: "payments".to_string(),
            }
            .into());
        }

        let sale_date = request.sale_date;
        let create = CreateSaleRequest {
            customer: request.customer,
            items: request.items,
            discount_total_cents: request.discount_total_cents,
            is_layaway: true,
            payments: request.payments,
            policy_title: request.policy_title,
            policy_description: request.policy_description,
            is_refund: false,
            refunded_sale_id: None,
        };
        self.create_sale_at(create, sale_date, Utc::now()).await
    }

    /// Shared create path. `created_at` is the business date of the sale;
    /// `now` stamps child rows without an explicit date of their own.
    async fn create_sale_at(
        &self,
        request: CreateSaleRequest,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<SaleDetail> {
        validate_customer_name(&request.customer)?;
        validate_policy_title(&request.policy_title)?;
        validate_price_cents("discount total", request.discount_total_cents)?;
        if request.is_layaway && request.payments.is_empty() {
            return Err(ValidationError::Empty {
                field: "payments".to_string(),
            }
            .into());
        }

        let sale_id = Uuid::new_v4().to_string();
        let resolved =
            resolve_lines(&self.db.inventory(), &sale_id, &request.items, now).await?;

        let rate = self.current_tax_rate().await?;
        let totals = compute_totals(
            &resolved.items,
            Money::from_cents(request.discount_total_cents),
            rate,
        );

        let installments = build_installments(&sale_id, &request.payments, now)?;
        let ledger = compute_ledger(totals.total, &installments);
        let status =
            derive_initial_status(request.is_refund, request.is_layaway, ledger.balance_amount);

        let sale = Sale {
            id: sale_id.clone(),
            invoice_number: numbers::invoice_number(created_at),
            customer_name: request.customer.name,
            customer_phone: request.customer.phone,
            customer_email: request.customer.email,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_total_cents: request.discount_total_cents,
            total_cents: totals.total.cents(),
            paid_amount_cents: ledger.paid_amount.cents(),
            balance_amount_cents: ledger.balance_amount.cents(),
            status,
            is_layaway: request.is_layaway,
            is_refund: request.is_refund,
            refunded_sale_id: request.refunded_sale_id,
            policy_title: request.policy_title,
            policy_description: request.policy_description,
            created_at,
            updated_at: now,
        };

        self.db
            .sales()
            .insert_sale(&sale, &resolved.items, &installments, &resolved.inventory_ids)
            .await?;

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            total_cents = sale.total_cents,
            status = ?sale.status,
            "Sale created"
        );
        emit_quietly(
            self.hook.as_ref(),
            EngineEvent::SaleCompleted {
                sale_id: sale.id.clone(),
                invoice_number: sale.invoice_number.clone(),
                total_cents: sale.total_cents,
            },
        );

        self.get_sale(&sale.id).await
    }

    /// Refunds a sale. The storage-level conditional update makes this
    /// idempotency-safe: a second refund surfaces as a state conflict.
    #[instrument(skip(self))]
    pub async fn refund_sale(&self, sale_id: &str) -> ApiResult<Sale> {
        self.db.sales().mark_refunded(sale_id).await?;

        info!(sale_id, "Sale refunded");
        emit_quietly(
            self.hook.as_ref(),
            EngineEvent::SaleRefunded {
                sale_id: sale_id.to_string(),
            },
        );

        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", sale_id))
    }

    /// Records one payment against a layaway sale and recomputes the
    /// ledger over the full installment list.
    #[instrument(skip(self, payment))]
    pub async fn add_layaway_payment(
        &self,
        sale_id: &str,
        payment: PaymentRequest,
    ) -> ApiResult<SaleDetail> {
        let sales = self.db.sales();
        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

        if !sale.is_layaway {
            return Err(CoreError::NotLayaway {
                sale_id: sale_id.to_string(),
            }
            .into());
        }
        if sale.status == SaleStatus::Refunded || sale.is_refund {
            // Money fields are frozen on refunded records.
            return Err(ApiError::state_conflict("Sale is refunded; payments are closed"));
        }
        if payment.amount_cents <= 0 {
            return Err(CoreError::InvalidAmount {
                cents: payment.amount_cents,
            }
            .into());
        }

        let now = Utc::now();
        let installment = build_installment(sale_id, &payment, now);
        sales.add_installment(&installment).await?;

        let installments = sales.get_installments(sale_id).await?;
        let ledger = compute_ledger(sale.total(), &installments);
        let status = after_payment(ledger.balance_amount);
        sales
            .update_ledger(
                sale_id,
                ledger.paid_amount.cents(),
                ledger.balance_amount.cents(),
                status,
            )
            .await?;

        info!(
            sale_id,
            amount_cents = payment.amount_cents,
            balance_cents = ledger.balance_amount.cents(),
            status = ?status,
            "Layaway payment recorded"
        );
        emit_quietly(
            self.hook.as_ref(),
            EngineEvent::PaymentReceived {
                sale_id: sale_id.to_string(),
                amount_cents: payment.amount_cents,
                balance_cents: ledger.balance_amount.cents(),
            },
        );

        self.get_sale(sale_id).await
    }

    /// Fetches the full sale aggregate.
    pub async fn get_sale(&self, sale_id: &str) -> ApiResult<SaleDetail> {
        self.db
            .sales()
            .get_detail(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", sale_id))
    }

    /// Lists recent sales.
    pub async fn list_sales(&self, limit: u32) -> ApiResult<Vec<Sale>> {
        Ok(self.db.sales().list(limit).await?)
    }

    /// Resolves the configured tax rate; absent configuration means no tax.
    async fn current_tax_rate(&self) -> ApiResult<TaxRate> {
        let raw = self.db.config().get_tax_rate().await?;
        Ok(raw.map(TaxRate::from_raw).unwrap_or_else(TaxRate::zero))
    }
}

// =============================================================================
// Installment assembly
// =============================================================================

fn build_installments(
    sale_id: &str,
    payments: &[PaymentRequest],
    now: DateTime<Utc>,
) -> ApiResult<Vec<Installment>> {
    payments
        .iter()
        .map(|payment| {
            if payment.amount_cents <= 0 {
                return Err(CoreError::InvalidAmount {
                    cents: payment.amount_cents,
                }
                .into());
            }
            Ok(build_installment(sale_id, payment, now))
        })
        .collect()
}

fn build_installment(sale_id: &str, payment: &PaymentRequest, now: DateTime<Utc>) -> Installment {
    Installment {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.to_string(),
        amount_cents: payment.amount_cents,
        method: payment.method,
        cash_amount_cents: payment.cash_amount_cents,
        card_amount_cents: payment.card_amount_cents,
        paid_at: payment.paid_at.unwrap_or(now),
        due_date: payment.due_date,
        created_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use karat_core::{InventoryItem, SaleLineKind};
    use karat_db::DbConfig;

    /// Makes service logs visible under `RUST_LOG=debug cargo test`.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn service_with_stock() -> SaleService {
        init_tracing();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.config().set_tax_rate(8.0).await.unwrap();
        let now = Utc::now();
        db.inventory()
            .insert(&InventoryItem {
                id: "inv1".to_string(),
                sku: "RING-1".to_string(),
                name: "Gold ring".to_string(),
                description: None,
                price_cents: 50_000,
                is_sold: false,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        SaleService::new(db)
    }

    fn inventory_line() -> SaleLineRequest {
        SaleLineRequest {
            item_type: SaleLineKind::Inventory,
            inventory_id: Some("inv1".to_string()),
            name: None,
            description: None,
            unit_price_cents: None,
            quantity: 1,
            discount_cents: 0,
        }
    }

    fn cash(amount_cents: i64) -> PaymentRequest {
        PaymentRequest {
            amount_cents,
            method: PaymentMethod::Cash,
            cash_amount_cents: None,
            card_amount_cents: None,
            due_date: None,
            paid_at: None,
        }
    }

    fn request(is_layaway: bool, payments: Vec<PaymentRequest>) -> CreateSaleRequest {
        CreateSaleRequest {
            customer: CustomerInfo {
                name: "Jo Smith".to_string(),
                phone: Some("555-0100".to_string()),
                email: None,
            },
            items: vec![inventory_line()],
            discount_total_cents: 5_000,
            is_layaway,
            payments,
            policy_title: "All sales final".to_string(),
            policy_description: None,
            is_refund: false,
            refunded_sale_id: None,
        }
    }

    /// $500 ring, $50 discount, 8% tax: subtotal $500, tax $40, total $490.
    #[tokio::test]
    async fn test_create_sale_money_figures() {
        let service = service_with_stock().await;
        let detail = service.create_sale(request(false, vec![])).await.unwrap();

        assert_eq!(detail.sale.subtotal_cents, 50_000);
        assert_eq!(detail.sale.tax_cents, 4_000);
        assert_eq!(detail.sale.total_cents, 49_000);
        // Non-layaway initializes to paid regardless of collected payments.
        assert_eq!(detail.sale.status, SaleStatus::Paid);
        assert!(detail.sale.invoice_number.starts_with("INV-"));

        // The ring is now sold.
        let ring = service
            .db
            .inventory()
            .get_by_id("inv1")
            .await
            .unwrap()
            .unwrap();
        assert!(ring.is_sold);
    }

    /// Layaway lifecycle: $490 total, deposit $200, then pay $290.
    #[tokio::test]
    async fn test_layaway_payment_progression() {
        let service = service_with_stock().await;
        let detail = service
            .create_sale(request(true, vec![cash(20_000)]))
            .await
            .unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Installment);
        assert_eq!(detail.sale.paid_amount_cents, 20_000);
        assert_eq!(detail.sale.balance_amount_cents, 29_000);

        let detail = service
            .add_layaway_payment(&detail.sale.id, cash(29_000))
            .await
            .unwrap();
        assert_eq!(detail.sale.status, SaleStatus::Paid);
        assert_eq!(detail.sale.paid_amount_cents, 49_000);
        assert_eq!(detail.sale.balance_amount_cents, 0);
        assert_eq!(detail.installments.len(), 2);
    }

    #[tokio::test]
    async fn test_layaway_requires_initial_payment() {
        let service = service_with_stock().await;
        let err = service.create_sale(request(true, vec![])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_refund_is_terminal() {
        let service = service_with_stock().await;
        let detail = service.create_sale(request(false, vec![])).await.unwrap();

        let refunded = service.refund_sale(&detail.sale.id).await.unwrap();
        assert_eq!(refunded.status, SaleStatus::Refunded);
        assert!(refunded.is_refund);

        let err = service.refund_sale(&detail.sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert!(err.message.contains("already refunded"));

        let err = service.refund_sale("ghost").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_payment_guards() {
        let service = service_with_stock().await;

        // Unknown sale
        let err = service
            .add_layaway_payment("ghost", cash(100))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        // Non-layaway sale
        let detail = service.create_sale(request(false, vec![])).await.unwrap();
        let err = service
            .add_layaway_payment(&detail.sale.id, cash(100))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotLayaway);
    }

    #[tokio::test]
    async fn test_payment_amount_must_be_positive() {
        let service = service_with_stock().await;
        let detail = service
            .create_sale(request(true, vec![cash(20_000)]))
            .await
            .unwrap();

        let err = service
            .add_layaway_payment(&detail.sale.id, cash(0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);

        let err = service
            .add_layaway_payment(&detail.sale.id, cash(-500))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);
    }

    #[tokio::test]
    async fn test_refunded_layaway_rejects_payments() {
        let service = service_with_stock().await;
        let detail = service
            .create_sale(request(true, vec![cash(20_000)]))
            .await
            .unwrap();

        service.refund_sale(&detail.sale.id).await.unwrap();
        let err = service
            .add_layaway_payment(&detail.sale.id, cash(100))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
    }

    #[tokio::test]
    async fn test_historical_backfill() {
        let service = service_with_stock().await;
        let sale_date: DateTime<Utc> = "2024-03-01T15:00:00Z".parse().unwrap();

        let mut first = cash(20_000);
        first.paid_at = Some("2024-03-01T15:05:00Z".parse().unwrap());
        let mut second = cash(29_000);
        second.paid_at = Some("2024-04-01T10:00:00Z".parse().unwrap());

        let detail = service
            .create_historical_layaway(HistoricalLayawayRequest {
                customer: CustomerInfo {
                    name: "Jo Smith".to_string(),
                    phone: None,
                    email: None,
                },
                items: vec![inventory_line()],
                discount_total_cents: 5_000,
                sale_date,
                payments: vec![first, second],
                policy_title: "All sales final".to_string(),
                policy_description: None,
            })
            .await
            .unwrap();

        assert_eq!(detail.sale.created_at, sale_date);
        assert!(detail.sale.is_layaway);
        // Fully paid by the backfilled history
        assert_eq!(detail.sale.status, SaleStatus::Paid);
        assert_eq!(detail.sale.balance_amount_cents, 0);
        assert_eq!(detail.installments.len(), 2);
        assert!(detail.sale.invoice_number.starts_with("INV-20240301-"));

        // Backfill with no payments is rejected.
        let err = service
            .create_historical_layaway(HistoricalLayawayRequest {
                customer: CustomerInfo {
                    name: "Jo".to_string(),
                    phone: None,
                    email: None,
                },
                items: vec![],
                discount_total_cents: 0,
                sale_date,
                payments: vec![],
                policy_title: "t".to_string(),
                policy_description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_missing_tax_rate_means_no_tax() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = SaleService::new(db);

        let detail = service
            .create_sale(CreateSaleRequest {
                customer: CustomerInfo {
                    name: "Jo".to_string(),
                    phone: None,
                    email: None,
                },
                items: vec![SaleLineRequest {
                    item_type: SaleLineKind::Service,
                    inventory_id: None,
                    name: Some("Polishing".to_string()),
                    description: None,
                    unit_price_cents: Some(2_500),
                    quantity: 1,
                    discount_cents: 0,
                }],
                discount_total_cents: 0,
                is_layaway: false,
                payments: vec![cash(2_500)],
                policy_title: "t".to_string(),
                policy_description: None,
                is_refund: false,
                refunded_sale_id: None,
            })
            .await
            .unwrap();

        assert_eq!(detail.sale.tax_cents, 0);
        assert_eq!(detail.sale.total_cents, 2_500);
    }

    #[tokio::test]
    async fn test_selling_same_item_twice_conflicts() {
        let service = service_with_stock().await;
        service.create_sale(request(false, vec![])).await.unwrap();

        let err = service.create_sale(request(false, vec![])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
    }

    #[tokio::test]
    async fn test_list_sales() {
        let service = service_with_stock().await;
        service.create_sale(request(false, vec![])).await.unwrap();

        let sales = service.list_sales(10).await.unwrap();
        assert_eq!(sales.len(), 1);
    }
}
