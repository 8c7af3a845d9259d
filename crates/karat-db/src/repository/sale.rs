//! # Sale Repository
//!
//! Database operations for sales, line items, and installments.
//!
//! ## Sale Lifecycle (storage view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                              │
//! │     └── insert_sale() → ONE transaction:                                │
//! │           sale row + item rows + installment rows + sold-marking        │
//! │           (an already-sold inventory line rolls the whole sale back)    │
//! │                                                                         │
//! │  2. LAYAWAY PAYMENTS                                                    │
//! │     └── add_installment() + update_ledger()                             │
//! │                                                                         │
//! │  3. (TERMINAL) REFUND                                                   │
//! │     └── mark_refunded() → single conditional UPDATE;                    │
//! │         the WHERE clause is the idempotency guard                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::InventoryRepository;
use karat_core::{Installment, Sale, SaleDetail, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = "id, invoice_number, customer_name, customer_phone, customer_email, \
     subtotal_cents, tax_cents, discount_total_cents, total_cents, \
     paid_amount_cents, balance_amount_cents, status, is_layaway, is_refund, \
     refunded_sale_id, policy_title, policy_description, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, item_type, inventory_id, sku, name, description, \
     unit_price_cents, quantity, discount_cents, tax_applied, created_at";

const INSTALLMENT_COLUMNS: &str = "id, sale_id, amount_cents, method, cash_amount_cents, \
     card_amount_cents, paid_at, due_date, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a complete sale aggregate in one transaction.
    ///
    /// The sold-flag update for referenced inventory runs INSIDE the same
    /// transaction as the sale write: either the sale commits with its
    /// items marked sold, or nothing is written. If another sale already
    /// claimed one of the items (`bulk_mark_sold_tx` flips fewer rows than
    /// requested) the transaction rolls back with a conflict.
    pub async fn insert_sale(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        installments: &[Installment],
        sold_inventory_ids: &[String],
    ) -> DbResult<()> {
        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO sales ( \
                 id, invoice_number, customer_name, customer_phone, customer_email, \
                 subtotal_cents, tax_cents, discount_total_cents, total_cents, \
                 paid_amount_cents, balance_amount_cents, status, is_layaway, is_refund, \
                 refunded_sale_id, policy_title, policy_description, created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(&sale.customer_email)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_total_cents)
        .bind(sale.total_cents)
        .bind(sale.paid_amount_cents)
        .bind(sale.balance_amount_cents)
        .bind(sale.status)
        .bind(sale.is_layaway)
        .bind(sale.is_refund)
        .bind(&sale.refunded_sale_id)
        .bind(&sale.policy_title)
        .bind(&sale.policy_description)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO sale_items ( \
                     id, sale_id, item_type, inventory_id, sku, name, description, \
                     unit_price_cents, quantity, discount_cents, tax_applied, created_at \
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(item.item_type)
            .bind(&item.inventory_id)
            .bind(&item.sku)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.discount_cents)
            .bind(item.tax_applied)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for installment in installments {
            insert_installment(&mut tx, installment).await?;
        }

        let flipped = InventoryRepository::bulk_mark_sold_tx(&mut tx, sold_inventory_ids).await?;
        if flipped != sold_inventory_ids.len() as u64 {
            // Dropping the transaction rolls everything back.
            return Err(DbError::conflict(
                "Inventory item already sold by another sale",
            ));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in insertion order.
    ///
    /// Ordered by rowid: timestamps collide when a whole sale is written in
    /// one transaction, and UUIDs sort randomly.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all installments for a sale, in insertion order.
    pub async fn get_installments(&self, sale_id: &str) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments \
             WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Gets the full aggregate for a sale.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;
        let installments = self.get_installments(id).await?;
        Ok(Some(SaleDetail {
            sale,
            items,
            installments,
        }))
    }

    /// Lists recent sales (newest first).
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Appends one installment.
    pub async fn add_installment(&self, installment: &Installment) -> DbResult<()> {
        debug!(
            sale_id = %installment.sale_id,
            amount = %installment.amount_cents,
            "Recording installment"
        );

        let mut tx = self.pool.begin().await?;
        insert_installment(&mut tx, installment).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Writes recomputed ledger figures and status back to the sale row.
    ///
    /// Guarded on `status != 'refunded'`: refund terminality holds even when
    /// a payment races the refund past the service-layer check.
    pub async fn update_ledger(
        &self,
        sale_id: &str,
        paid_amount_cents: i64,
        balance_amount_cents: i64,
        status: SaleStatus,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sales SET \
                 paid_amount_cents = ?2, \
                 balance_amount_cents = ?3, \
                 status = ?4, \
                 updated_at = ?5 \
             WHERE id = ?1 AND status != 'refunded'",
        )
        .bind(sale_id)
        .bind(paid_amount_cents)
        .bind(balance_amount_cents)
        .bind(status)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(sale_id).await? {
                None => Err(DbError::not_found("Sale", sale_id)),
                Some(_) => Err(DbError::conflict("Sale is refunded; ledger is frozen")),
            };
        }

        Ok(())
    }

    /// Marks a sale refunded with a single conditional UPDATE.
    ///
    /// The `status != 'refunded'` guard is the refund-idempotency
    /// invariant, enforced atomically by the database: two concurrent
    /// refund calls cannot both succeed.
    pub async fn mark_refunded(&self, sale_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sales SET \
                 status = 'refunded', \
                 is_refund = 1, \
                 updated_at = ?2 \
             WHERE id = ?1 AND status != 'refunded'",
        )
        .bind(sale_id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing sale from one already refunded.
            return match self.get_by_id(sale_id).await? {
                None => Err(DbError::not_found("Sale", sale_id)),
                Some(_) => Err(DbError::conflict("Sale already refunded")),
            };
        }

        Ok(())
    }
}

/// Shared INSERT used by both the create transaction and add_installment.
async fn insert_installment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    installment: &Installment,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO installments ( \
             id, sale_id, amount_cents, method, cash_amount_cents, \
             card_amount_cents, paid_at, due_date, created_at \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&installment.id)
    .bind(&installment.sale_id)
    .bind(installment.amount_cents)
    .bind(installment.method)
    .bind(installment.cash_amount_cents)
    .bind(installment.card_amount_cents)
    .bind(installment.paid_at)
    .bind(installment.due_date)
    .bind(installment.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use karat_core::{InventoryItem, PaymentMethod, SaleLineKind};

    fn sale(id: &str, total_cents: i64, is_layaway: bool) -> Sale {
        let now = Utc::now();
        Sale {
            id: id.to_string(),
            invoice_number: format!("INV-{id}"),
            customer_name: "Jo Smith".to_string(),
            customer_phone: Some("555-0100".to_string()),
            customer_email: None,
            subtotal_cents: total_cents,
            tax_cents: 0,
            discount_total_cents: 0,
            total_cents,
            paid_amount_cents: 0,
            balance_amount_cents: total_cents,
            status: if is_layaway {
                SaleStatus::Installment
            } else {
                SaleStatus::Paid
            },
            is_layaway,
            is_refund: false,
            refunded_sale_id: None,
            policy_title: "All sales final".to_string(),
            policy_description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn item(id: &str, sale_id: &str, inventory_id: Option<&str>) -> SaleItem {
        SaleItem {
            id: id.to_string(),
            sale_id: sale_id.to_string(),
            item_type: if inventory_id.is_some() {
                SaleLineKind::Inventory
            } else {
                SaleLineKind::Custom
            },
            inventory_id: inventory_id.map(str::to_string),
            sku: inventory_id.map(|_| "SKU-1".to_string()),
            name: "Line".to_string(),
            description: None,
            unit_price_cents: 50_000,
            quantity: 1,
            discount_cents: 0,
            tax_applied: inventory_id.is_some(),
            created_at: Utc::now(),
        }
    }

    fn installment(id: &str, sale_id: &str, amount_cents: i64) -> Installment {
        let now = Utc::now();
        Installment {
            id: id.to_string(),
            sale_id: sale_id.to_string(),
            amount_cents,
            method: PaymentMethod::Cash,
            cash_amount_cents: None,
            card_amount_cents: None,
            paid_at: now,
            due_date: None,
            created_at: now,
        }
    }

    fn stock(id: &str) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            name: "Stock".to_string(),
            description: None,
            price_cents: 50_000,
            is_sold: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_detail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        let s = sale("s1", 49_000, true);
        let items = vec![item("i1", "s1", None)];
        let installments = vec![installment("p1", "s1", 20_000)];

        repo.insert_sale(&s, &items, &installments, &[]).await.unwrap();

        let detail = repo.get_detail("s1").await.unwrap().unwrap();
        assert_eq!(detail.sale.invoice_number, "INV-s1");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.installments.len(), 1);
        assert_eq!(detail.installments[0].amount_cents, 20_000);

        assert!(repo.get_detail("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_marks_inventory_sold_atomically() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.inventory().insert(&stock("inv1")).await.unwrap();

        let repo = db.sales();
        let s = sale("s1", 50_000, false);
        let items = vec![item("i1", "s1", Some("inv1"))];
        repo.insert_sale(&s, &items, &[], &["inv1".to_string()])
            .await
            .unwrap();

        assert!(db.inventory().get_by_id("inv1").await.unwrap().unwrap().is_sold);

        // A second sale over the same item must roll back entirely.
        let s2 = sale("s2", 50_000, false);
        let items2 = vec![item("i2", "s2", Some("inv1"))];
        let err = repo
            .insert_sale(&s2, &items2, &[], &["inv1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(repo.get_by_id("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_refunded_is_idempotent_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.insert_sale(&sale("s1", 10_000, false), &[item("i1", "s1", None)], &[], &[])
            .await
            .unwrap();

        repo.mark_refunded("s1").await.unwrap();
        let refunded = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(refunded.status, SaleStatus::Refunded);
        assert!(refunded.is_refund);

        // Second refund fails with a conflict mentioning "already refunded".
        let err = repo.mark_refunded("s1").await.unwrap_err();
        assert!(err.to_string().contains("already refunded"));

        // Missing sale fails with not-found instead.
        let err = repo.mark_refunded("ghost").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_installments_keep_insertion_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        // A backfill writes the whole history with one timestamp; ids sort
        // against insertion order on purpose here.
        let now = Utc::now();
        let mut first = installment("z-first", "s1", 20_000);
        first.created_at = now;
        let mut second = installment("a-second", "s1", 29_000);
        second.created_at = now;

        repo.insert_sale(
            &sale("s1", 49_000, true),
            &[item("i1", "s1", None)],
            &[first, second],
            &[],
        )
        .await
        .unwrap();

        let amounts: Vec<i64> = repo
            .get_installments("s1")
            .await
            .unwrap()
            .iter()
            .map(|i| i.amount_cents)
            .collect();
        assert_eq!(amounts, vec![20_000, 29_000]);
    }

    #[tokio::test]
    async fn test_update_ledger_cannot_unfreeze_refunded_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.insert_sale(&sale("s1", 10_000, true), &[item("i1", "s1", None)], &[], &[])
            .await
            .unwrap();
        repo.mark_refunded("s1").await.unwrap();

        let err = repo
            .update_ledger("s1", 10_000, 0, SaleStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let sale = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Refunded);
    }

    #[tokio::test]
    async fn test_update_ledger() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.sales();

        repo.insert_sale(&sale("s1", 49_000, true), &[item("i1", "s1", None)], &[], &[])
            .await
            .unwrap();

        repo.add_installment(&installment("p1", "s1", 20_000))
            .await
            .unwrap();
        repo.update_ledger("s1", 20_000, 29_000, SaleStatus::Installment)
            .await
            .unwrap();

        let updated = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(updated.paid_amount_cents, 20_000);
        assert_eq!(updated.balance_amount_cents, 29_000);
        assert_eq!(updated.status, SaleStatus::Installment);
    }
}
