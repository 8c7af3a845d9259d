//! # Gold-Buy Repository
//!
//! Database operations for precious-metal intake tickets.
//!
//! ## Guarded Writes
//! Ticket mutations are conditional UPDATEs keyed on status:
//! - `update_ticket` only touches tickets that are still modifiable
//!   (not paid, posted, or cancelled)
//! - `mark_cancelled` only fires once (not already cancelled or void)
//!
//! A guard that matches zero rows surfaces as `DbError::Conflict` (or
//! `NotFound` when the ticket does not exist at all), so two operators
//! racing over the same ticket cannot both win.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use karat_core::{GoldBuyDetail, GoldBuyItem, GoldBuyTicket};

const TICKET_COLUMNS: &str = "id, ticket_number, status, customer_name, customer_phone, \
     customer_email, live_price_per_gram_cents, buy_rate_bps, test_fee_cents, \
     refining_per_gram_cents, fine_gold_grams, gross_cents, fees_cents, payout_cents, \
     override_reasons, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, ticket_id, item_type, metal, karat, purity, weight_grams, \
     stone_weight_grams, net_weight_grams, fine_gold_grams, line_fees_cents, \
     line_payout_cents, created_at";

/// Repository for gold-buy ticket database operations.
#[derive(Debug, Clone)]
pub struct GoldBuyRepository {
    pool: SqlitePool,
}

impl GoldBuyRepository {
    /// Creates a new GoldBuyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GoldBuyRepository { pool }
    }

    /// Persists a new ticket with its intake lines in one transaction.
    pub async fn insert_ticket(
        &self,
        ticket: &GoldBuyTicket,
        items: &[GoldBuyItem],
    ) -> DbResult<()> {
        debug!(id = %ticket.id, ticket_number = %ticket.ticket_number, "Inserting gold-buy ticket");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO gold_buy_tickets ( \
                 id, ticket_number, status, customer_name, customer_phone, customer_email, \
                 live_price_per_gram_cents, buy_rate_bps, test_fee_cents, \
                 refining_per_gram_cents, fine_gold_grams, gross_cents, fees_cents, \
                 payout_cents, override_reasons, created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&ticket.id)
        .bind(&ticket.ticket_number)
        .bind(ticket.status)
        .bind(&ticket.customer_name)
        .bind(&ticket.customer_phone)
        .bind(&ticket.customer_email)
        .bind(ticket.live_price_per_gram_cents)
        .bind(ticket.buy_rate_bps)
        .bind(ticket.test_fee_cents)
        .bind(ticket.refining_per_gram_cents)
        .bind(ticket.fine_gold_grams)
        .bind(ticket.gross_cents)
        .bind(ticket.fees_cents)
        .bind(ticket.payout_cents)
        .bind(&ticket.override_reasons)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a ticket by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<GoldBuyTicket>> {
        let ticket = sqlx::query_as::<_, GoldBuyTicket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM gold_buy_tickets WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Gets all intake lines for a ticket, in insertion order (rowid:
    /// lines written in one transaction share a timestamp).
    pub async fn get_items(&self, ticket_id: &str) -> DbResult<Vec<GoldBuyItem>> {
        let items = sqlx::query_as::<_, GoldBuyItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM gold_buy_items \
             WHERE ticket_id = ?1 ORDER BY rowid"
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the full ticket aggregate.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<GoldBuyDetail>> {
        let Some(ticket) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;
        Ok(Some(GoldBuyDetail { ticket, items }))
    }

    /// Lists recent tickets (newest first).
    pub async fn list(&self, limit: u32) -> DbResult<Vec<GoldBuyTicket>> {
        let tickets = sqlx::query_as::<_, GoldBuyTicket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM gold_buy_tickets ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Rewrites a ticket (customer, pricing, totals, status, override log)
    /// and replaces its intake lines, in one transaction.
    ///
    /// The UPDATE is guarded on status: paid, posted, and cancelled tickets
    /// are immutable. A guard miss on an existing ticket is a conflict.
    pub async fn update_ticket(
        &self,
        ticket: &GoldBuyTicket,
        items: &[GoldBuyItem],
    ) -> DbResult<()> {
        debug!(id = %ticket.id, "Updating gold-buy ticket");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE gold_buy_tickets SET \
                 status = ?2, \
                 customer_name = ?3, \
                 customer_phone = ?4, \
                 customer_email = ?5, \
                 live_price_per_gram_cents = ?6, \
                 buy_rate_bps = ?7, \
                 test_fee_cents = ?8, \
                 refining_per_gram_cents = ?9, \
                 fine_gold_grams = ?10, \
                 gross_cents = ?11, \
                 fees_cents = ?12, \
                 payout_cents = ?13, \
                 override_reasons = ?14, \
                 updated_at = ?15 \
             WHERE id = ?1 AND status NOT IN ('paid', 'posted', 'cancelled')",
        )
        .bind(&ticket.id)
        .bind(ticket.status)
        .bind(&ticket.customer_name)
        .bind(&ticket.customer_phone)
        .bind(&ticket.customer_email)
        .bind(ticket.live_price_per_gram_cents)
        .bind(ticket.buy_rate_bps)
        .bind(ticket.test_fee_cents)
        .bind(ticket.refining_per_gram_cents)
        .bind(ticket.fine_gold_grams)
        .bind(ticket.gross_cents)
        .bind(ticket.fees_cents)
        .bind(ticket.payout_cents)
        .bind(&ticket.override_reasons)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Re-check through the same transaction (the pool may be at its
            // single-connection minimum in tests).
            return match fetch_status(&mut tx, &ticket.id).await? {
                None => Err(DbError::not_found("Gold buy", &ticket.id)),
                Some(_) => Err(DbError::conflict("Gold buy cannot be modified")),
            };
        }

        sqlx::query("DELETE FROM gold_buy_items WHERE ticket_id = ?1")
            .bind(&ticket.id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Cancels a ticket with a single conditional UPDATE, appending an
    /// optional override reason to the ticket's audit log.
    ///
    /// Already-cancelled and void tickets are rejected with a conflict.
    pub async fn mark_cancelled(&self, id: &str, reason: Option<&str>) -> DbResult<GoldBuyTicket> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE gold_buy_tickets SET \
                 status = 'cancelled', \
                 updated_at = ?2 \
             WHERE id = ?1 AND status NOT IN ('cancelled', 'void')",
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return match fetch_status(&mut tx, id).await? {
                None => Err(DbError::not_found("Gold buy", id)),
                Some(_) => Err(DbError::conflict("Gold buy already cancelled or void")),
            };
        }

        if let Some(reason) = reason {
            let stored: String =
                sqlx::query_scalar("SELECT override_reasons FROM gold_buy_tickets WHERE id = ?1")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;

            let mut reasons: Vec<String> = serde_json::from_str(&stored).unwrap_or_default();
            reasons.push(reason.to_string());
            let encoded = serde_json::to_string(&reasons)
                .map_err(|e| DbError::Internal(e.to_string()))?;

            sqlx::query("UPDATE gold_buy_tickets SET override_reasons = ?2 WHERE id = ?1")
                .bind(id)
                .bind(encoded)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Gold buy", id))
    }
}

/// Existence probe used when a guarded UPDATE matched no rows.
async fn fetch_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: &str,
) -> DbResult<Option<String>> {
    let status = sqlx::query_scalar("SELECT status FROM gold_buy_tickets WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(status)
}

/// Shared INSERT used by the create and update transactions.
async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &GoldBuyItem,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO gold_buy_items ( \
             id, ticket_id, item_type, metal, karat, purity, weight_grams, \
             stone_weight_grams, net_weight_grams, fine_gold_grams, \
             line_fees_cents, line_payout_cents, created_at \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&item.id)
    .bind(&item.ticket_id)
    .bind(&item.item_type)
    .bind(&item.metal)
    .bind(item.karat)
    .bind(item.purity)
    .bind(item.weight_grams)
    .bind(item.stone_weight_grams)
    .bind(item.net_weight_grams)
    .bind(item.fine_gold_grams)
    .bind(item.line_fees_cents)
    .bind(item.line_payout_cents)
    .bind(item.created_at)
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
    use karat_core::GoldBuyStatus;

    fn ticket(id: &str, status: GoldBuyStatus) -> GoldBuyTicket {
        let now = Utc::now();
        GoldBuyTicket {
            id: id.to_string(),
            ticket_number: format!("GB-{id}"),
            status,
            customer_name: "Sam Seller".to_string(),
            customer_phone: Some("555-0101".to_string()),
            customer_email: None,
            live_price_per_gram_cents: 6_500,
            buy_rate_bps: 9_000,
            test_fee_cents: 500,
            refining_per_gram_cents: 50,
            fine_gold_grams: 10.0,
            gross_cents: 58_500,
            fees_cents: 1_000,
            payout_cents: 57_500,
            override_reasons: "[]".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn intake_line(id: &str, ticket_id: &str) -> GoldBuyItem {
        GoldBuyItem {
            id: id.to_string(),
            ticket_id: ticket_id.to_string(),
            item_type: "scrap".to_string(),
            metal: "gold".to_string(),
            karat: Some(24),
            purity: 1.0,
            weight_grams: 10.0,
            stone_weight_grams: 0.0,
            net_weight_grams: 10.0,
            fine_gold_grams: 10.0,
            line_fees_cents: 500,
            line_payout_cents: 58_000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_detail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.gold_buys();

        repo.insert_ticket(&ticket("t1", GoldBuyStatus::Draft), &[intake_line("g1", "t1")])
            .await
            .unwrap();

        let detail = repo.get_detail("t1").await.unwrap().unwrap();
        assert_eq!(detail.ticket.payout_cents, 57_500);
        assert_eq!(detail.items.len(), 1);
        assert!((detail.items[0].fine_gold_grams - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_update_replaces_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.gold_buys();

        repo.insert_ticket(&ticket("t1", GoldBuyStatus::Draft), &[intake_line("g1", "t1")])
            .await
            .unwrap();

        let mut updated = ticket("t1", GoldBuyStatus::Quoted);
        updated.payout_cents = 60_000;
        repo.update_ticket(&updated, &[intake_line("g2", "t1"), intake_line("g3", "t1")])
            .await
            .unwrap();

        let detail = repo.get_detail("t1").await.unwrap().unwrap();
        assert_eq!(detail.ticket.status, GoldBuyStatus::Quoted);
        assert_eq!(detail.ticket.payout_cents, 60_000);
        assert_eq!(detail.items.len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejected_once_paid() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.gold_buys();

        repo.insert_ticket(&ticket("t1", GoldBuyStatus::Paid), &[])
            .await
            .unwrap();

        let err = repo
            .update_ticket(&ticket("t1", GoldBuyStatus::Paid), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be modified"));

        // Missing ticket is not-found, not a conflict.
        let err = repo
            .update_ticket(&ticket("ghost", GoldBuyStatus::Draft), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_fires_once_and_logs_reason() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.gold_buys();

        repo.insert_ticket(&ticket("t1", GoldBuyStatus::Quoted), &[])
            .await
            .unwrap();

        let cancelled = repo
            .mark_cancelled("t1", Some("customer walked out"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, GoldBuyStatus::Cancelled);
        assert_eq!(
            cancelled.override_reason_list(),
            vec!["customer walked out".to_string()]
        );

        let err = repo.mark_cancelled("t1", None).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }
}
