//! # Config Repository
//!
//! Key/value application configuration. The one key the engine depends on
//! is `tax_rate`, stored in whatever unit the operator typed (percent or
//! fraction); karat-core's `TaxRate::from_raw` normalizes it at read time.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;

/// Configuration key for the sales tax rate.
pub const TAX_RATE_KEY: &str = "tax_rate";

/// Repository for application configuration.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    /// Creates a new ConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Gets a configuration value by key.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM app_config WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Sets a configuration value (insert or overwrite).
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key, value, "Setting config value");

        sqlx::query(
            "INSERT INTO app_config (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads the stored tax rate as a raw number, if one is configured.
    ///
    /// An unparseable value is treated as unset (and logged) rather than
    /// failing every sale.
    pub async fn get_tax_rate(&self) -> DbResult<Option<f64>> {
        let Some(raw) = self.get(TAX_RATE_KEY).await? else {
            return Ok(None);
        };

        match raw.trim().parse::<f64>() {
            Ok(rate) => Ok(Some(rate)),
            Err(_) => {
                warn!(value = %raw, "Stored tax rate is not a number, ignoring");
                Ok(None)
            }
        }
    }

    /// Stores the tax rate.
    pub async fn set_tax_rate(&self, rate: f64) -> DbResult<()> {
        self.set(TAX_RATE_KEY, &rate.to_string()).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.config();

        assert!(repo.get("store_name").await.unwrap().is_none());

        repo.set("store_name", "Karat & Co").await.unwrap();
        assert_eq!(
            repo.get("store_name").await.unwrap().as_deref(),
            Some("Karat & Co")
        );

        // Overwrite
        repo.set("store_name", "Karat Jewelers").await.unwrap();
        assert_eq!(
            repo.get("store_name").await.unwrap().as_deref(),
            Some("Karat Jewelers")
        );
    }

    #[tokio::test]
    async fn test_tax_rate_roundtrip_and_bad_value() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.config();

        assert!(repo.get_tax_rate().await.unwrap().is_none());

        repo.set_tax_rate(8.0).await.unwrap();
        assert_eq!(repo.get_tax_rate().await.unwrap(), Some(8.0));

        repo.set(TAX_RATE_KEY, "eight percent").await.unwrap();
        assert!(repo.get_tax_rate().await.unwrap().is_none());
    }
}
