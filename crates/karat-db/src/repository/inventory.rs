//! # Inventory Repository
//!
//! Database operations for inventory records.
//!
//! The interesting operation is `bulk_mark_sold`: the sold flag is set with
//! a single conditional UPDATE (`... AND is_sold = 0`) so the database - not
//! a read-then-write in application code - decides who wins when two sales
//! race over the same item.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;
use karat_core::InventoryItem;

const SELECT_COLUMNS: &str = "id, sku, name, description, price_cents, \
     is_sold, is_active, created_at, updated_at";

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets an inventory item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an inventory item by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_items WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts an inventory record.
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, sku = %item.sku, "Inserting inventory item");

        sqlx::query(
            "INSERT INTO inventory_items ( \
                 id, sku, name, description, price_cents, \
                 is_sold, is_active, created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_cents)
        .bind(item.is_sold)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists active, unsold items (newest first).
    pub async fn list_available(&self, limit: u32) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {SELECT_COLUMNS} FROM inventory_items \
             WHERE is_active = 1 AND is_sold = 0 \
             ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Marks the given items sold with one conditional bulk UPDATE, inside
    /// the caller's transaction.
    ///
    /// ## Returns
    /// The number of rows actually flipped. A caller that passed N ids and
    /// got back fewer than N raced another sale over at least one item and
    /// should roll the transaction back.
    pub async fn bulk_mark_sold_tx(
        tx: &mut Transaction<'_, Sqlite>,
        ids: &[String],
    ) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        debug!(count = ids.len(), "Marking inventory items sold");

        // sqlx has no array binding for SQLite; build the placeholder list.
        let placeholders = (2..ids.len() + 2)
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE inventory_items SET is_sold = 1, updated_at = ?1 \
             WHERE id IN ({placeholders}) AND is_sold = 0"
        );

        let mut query = sqlx::query(&sql).bind(Utc::now());
        for id in ids {
            query = query.bind(id);
        }

        let result = query.execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
