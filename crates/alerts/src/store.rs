//! SQLite store for alert thresholds and fired-state.

use coinwatch_core::{AlertThreshold, ChangeWindow, ThresholdKey};
use compact_str::CompactString;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Alert for {coin} over {window} already exists")]
    DuplicateThreshold { coin: String, window: ChangeWindow },
    #[error("No alert for {coin} over {window}")]
    ThresholdNotFound { coin: String, window: ChangeWindow },
    #[error("Corrupt row: {0}")]
    Decode(String),
}

/// Threshold store backed by SQLite.
///
/// The only shared mutable resource in the process; SQLite serializes the
/// writes, last write wins.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

type ThresholdRow = (i64, String, String, f64, bool);

impl Store {
    /// Connect to SQLite at the given URL (`sqlite::memory:` for tests).
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_thresholds (
                user_id INTEGER NOT NULL,
                coin_symbol TEXT NOT NULL,
                window TEXT NOT NULL,
                percent_trigger REAL NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, coin_symbol, window)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Fired-state rows persist the hysteresis flag across restarts.
        // A row present means "fired", absence means "armed".
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fired_state (
                user_id INTEGER NOT NULL,
                coin_symbol TEXT NOT NULL,
                window TEXT NOT NULL,
                fired_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, coin_symbol, window)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_thresholds_by_coin
            ON alert_thresholds(coin_symbol, enabled)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new threshold.
    pub async fn add(&self, threshold: &AlertThreshold) -> Result<(), StoreError> {
        let existing = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM alert_thresholds
            WHERE user_id = ? AND coin_symbol = ? AND window = ?
            "#,
        )
        .bind(threshold.user_id)
        .bind(threshold.coin_symbol.as_str())
        .bind(threshold.window.as_str())
        .fetch_one(&self.pool)
        .await?;

        if existing > 0 {
            return Err(StoreError::DuplicateThreshold {
                coin: threshold.coin_symbol.to_string(),
                window: threshold.window,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO alert_thresholds (user_id, coin_symbol, window, percent_trigger, enabled)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(threshold.user_id)
        .bind(threshold.coin_symbol.as_str())
        .bind(threshold.window.as_str())
        .bind(threshold.percent_trigger)
        .bind(threshold.enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a threshold and its fired-state row.
    pub async fn remove(&self, key: &ThresholdKey) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM alert_thresholds
            WHERE user_id = ? AND coin_symbol = ? AND window = ?
            "#,
        )
        .bind(key.user_id)
        .bind(key.coin_symbol.as_str())
        .bind(key.window.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ThresholdNotFound {
                coin: key.coin_symbol.to_string(),
                window: key.window,
            });
        }

        self.clear_fired(key).await?;
        Ok(())
    }

    /// All thresholds owned by a user, ordered by coin then window.
    pub async fn list(&self, user_id: i64) -> Result<Vec<AlertThreshold>, StoreError> {
        let rows = sqlx::query_as::<_, ThresholdRow>(
            r#"
            SELECT user_id, coin_symbol, window, percent_trigger, enabled
            FROM alert_thresholds
            WHERE user_id = ?
            ORDER BY coin_symbol, window
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_threshold).collect()
    }

    /// Enabled thresholds across all users for one coin.
    pub async fn thresholds_for_coin(
        &self,
        coin_symbol: &str,
    ) -> Result<Vec<AlertThreshold>, StoreError> {
        let rows = sqlx::query_as::<_, ThresholdRow>(
            r#"
            SELECT user_id, coin_symbol, window, percent_trigger, enabled
            FROM alert_thresholds
            WHERE coin_symbol = ? AND enabled = 1
            ORDER BY user_id, window
            "#,
        )
        .bind(coin_symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_threshold).collect()
    }

    /// Pause or resume a threshold.
    pub async fn set_enabled(&self, key: &ThresholdKey, enabled: bool) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE alert_thresholds SET enabled = ?
            WHERE user_id = ? AND coin_symbol = ? AND window = ?
            "#,
        )
        .bind(enabled)
        .bind(key.user_id)
        .bind(key.coin_symbol.as_str())
        .bind(key.window.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ThresholdNotFound {
                coin: key.coin_symbol.to_string(),
                window: key.window,
            });
        }

        Ok(())
    }

    /// Whether the threshold's last crossing has already been notified.
    pub async fn is_fired(&self, key: &ThresholdKey) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM fired_state
            WHERE user_id = ? AND coin_symbol = ? AND window = ?
            "#,
        )
        .bind(key.user_id)
        .bind(key.coin_symbol.as_str())
        .bind(key.window.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Mark a threshold as fired. Idempotent.
    pub async fn mark_fired(&self, key: &ThresholdKey) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fired_state (user_id, coin_symbol, window)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, coin_symbol, window)
            DO UPDATE SET fired_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key.user_id)
        .bind(key.coin_symbol.as_str())
        .bind(key.window.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Re-arm a threshold. Idempotent.
    pub async fn clear_fired(&self, key: &ThresholdKey) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM fired_state
            WHERE user_id = ? AND coin_symbol = ? AND window = ?
            "#,
        )
        .bind(key.user_id)
        .bind(key.coin_symbol.as_str())
        .bind(key.window.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Distinct coin symbols with at least one enabled threshold.
    pub async fn watched_coins(&self) -> Result<Vec<CompactString>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT coin_symbol FROM alert_thresholds WHERE enabled = 1 ORDER BY coin_symbol",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CompactString::from).collect())
    }
}

fn decode_threshold(
    (user_id, coin_symbol, window, percent_trigger, enabled): ThresholdRow,
) -> Result<AlertThreshold, StoreError> {
    let window = window
        .parse::<ChangeWindow>()
        .map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(AlertThreshold {
        user_id,
        coin_symbol: CompactString::from(coin_symbol),
        window,
        percent_trigger,
        enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn memory_store() -> Store {
        Store::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn add_and_list() {
        let store = memory_store().await;
        store
            .add(&AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(42, "ETH", ChangeWindow::Hour1, -2.5))
            .await
            .unwrap();

        let listed = store.list(42).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].coin_symbol, "BTC");
        assert_eq!(listed[1].coin_symbol, "ETH");
        assert_eq!(listed[1].percent_trigger, -2.5);

        assert!(store.list(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let store = memory_store().await;
        let threshold = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        store.add(&threshold).await.unwrap();

        // Same key with a different trigger is still a duplicate
        let again = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 9.0);
        match store.add(&again).await {
            Err(StoreError::DuplicateThreshold { coin, window }) => {
                assert_eq!(coin, "BTC");
                assert_eq!(window, ChangeWindow::Hour24);
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }

        // Different window is a different threshold
        store
            .add(&AlertThreshold::new(42, "BTC", ChangeWindow::Day7, 5.0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let store = memory_store().await;
        let key = ThresholdKey::new(42, "BTC", ChangeWindow::Hour24);
        assert!(matches!(
            store.remove(&key).await,
            Err(StoreError::ThresholdNotFound { .. })
        ));

        store
            .add(&AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store.remove(&key).await.unwrap();
        assert!(store.list(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_clears_fired_state() {
        let store = memory_store().await;
        let threshold = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        let key = threshold.key();

        store.add(&threshold).await.unwrap();
        store.mark_fired(&key).await.unwrap();
        assert!(store.is_fired(&key).await.unwrap());

        store.remove(&key).await.unwrap();
        assert!(!store.is_fired(&key).await.unwrap());
    }

    #[tokio::test]
    async fn fired_state_round_trip() {
        let store = memory_store().await;
        let key = ThresholdKey::new(42, "BTC", ChangeWindow::Hour24);

        assert!(!store.is_fired(&key).await.unwrap());
        store.mark_fired(&key).await.unwrap();
        store.mark_fired(&key).await.unwrap(); // idempotent
        assert!(store.is_fired(&key).await.unwrap());

        // Keyed per window
        let other = ThresholdKey::new(42, "BTC", ChangeWindow::Day7);
        assert!(!store.is_fired(&other).await.unwrap());

        store.clear_fired(&key).await.unwrap();
        assert!(!store.is_fired(&key).await.unwrap());
    }

    #[tokio::test]
    async fn thresholds_for_coin_skips_disabled() {
        let store = memory_store().await;
        store
            .add(&AlertThreshold::new(1, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(2, "BTC", ChangeWindow::Day7, 10.0))
            .await
            .unwrap();

        store
            .set_enabled(&ThresholdKey::new(2, "BTC", ChangeWindow::Day7), false)
            .await
            .unwrap();

        let active = store.thresholds_for_coin("BTC").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, 1);
    }

    #[tokio::test]
    async fn set_enabled_missing_is_not_found() {
        let store = memory_store().await;
        let key = ThresholdKey::new(42, "BTC", ChangeWindow::Hour24);
        assert!(matches!(
            store.set_enabled(&key, false).await,
            Err(StoreError::ThresholdNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn watched_coins_deduplicates() {
        let store = memory_store().await;
        store
            .add(&AlertThreshold::new(1, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(2, "BTC", ChangeWindow::Hour1, 1.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(1, "ETH", ChangeWindow::Day30, 20.0))
            .await
            .unwrap();

        let coins = store.watched_coins().await.unwrap();
        assert_eq!(coins, vec!["BTC", "ETH"]);
    }
}
