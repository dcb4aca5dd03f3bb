mod model;

pub use model::{DailyCount, HealthStatus, HitResult, Stats};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::utils::{day_key, iso_timestamp};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const CREATE_METRICS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        hits INTEGER NOT NULL DEFAULT 0
    )
"#;

/// 基于 SQLite 的按天访问计数
///
/// 每个 UTC 日期对应 `metrics` 表中的一行，记录访问是一条 upsert 语句，
/// 并发写入不会丢失计数
#[derive(Clone)]
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// 打开数据库文件，不存在时创建文件和表结构
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_METRICS_TABLE).execute(&pool).await?;

        tracing::info!(path = %config.path.display(), "Metrics store opened");
        Ok(Self { pool })
    }

    pub async fn record_hit(&self) -> Result<HitResult> {
        self.record_hit_at(Utc::now()).await
    }

    /// 按 `now` 所在的 UTC 日期计一次访问
    pub async fn record_hit_at(&self, now: DateTime<Utc>) -> Result<HitResult> {
        let today = day_key(now);

        sqlx::query(
            r#"
            INSERT INTO metrics (date, hits) VALUES (?, 1)
            ON CONFLICT(date) DO UPDATE SET hits = hits + 1
            "#,
        )
        .bind(&today)
        .execute(&self.pool)
        .await?;

        let total_hits = self.total_hits().await?;
        tracing::trace!(date = %today, total_hits, "Hit recorded");

        Ok(HitResult {
            success: true,
            total_hits,
        })
    }

    pub async fn get_stats(&self) -> Result<Stats> {
        let rows = sqlx::query_as::<_, DailyCount>(
            "SELECT date, hits FROM metrics ORDER BY date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Stats::from_rows(rows))
    }

    /// 删除所有按天计数
    pub async fn reset(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM metrics")
            .execute(&self.pool)
            .await?;
        tracing::info!(rows = result.rows_affected(), "Metrics reset");
        Ok(())
    }

    pub fn health_check(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            timestamp: iso_timestamp(Utc::now()),
        }
    }

    /// 等待进行中的查询结束并关闭所有连接
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Metrics store closed");
    }

    async fn total_hits(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(hits), 0) FROM metrics")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn open_store() -> (MetricsStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("data").join("metrics.db"),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        };
        let store = MetricsStore::open(&config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_empty_store_has_no_stats() {
        let (store, _dir) = open_store().await;

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_hits, 0);
        assert!(stats.by_date.is_empty());
    }

    #[tokio::test]
    async fn test_record_hit_counts_per_day() {
        let (store, _dir) = open_store().await;
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let today = day_key(now);

        for expected in 1..=3 {
            let result = store.record_hit_at(now).await.unwrap();
            assert!(result.success);
            assert_eq!(result.total_hits, expected);
        }

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.by_date.len(), 1);
        assert_eq!(stats.by_date.get(&today), Some(&3));
    }

    #[tokio::test]
    async fn test_hits_are_split_by_utc_day() {
        let (store, _dir) = open_store().await;
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        store.record_hit_at(late).await.unwrap();
        store.record_hit_at(late).await.unwrap();
        let result = store.record_hit_at(early).await.unwrap();
        assert_eq!(result.total_hits, 3);

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.by_date.get("2024-03-01"), Some(&2));
        assert_eq!(stats.by_date.get("2024-03-02"), Some(&1));
        assert_eq!(stats.total_hits, 3);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (store, _dir) = open_store().await;

        store.record_hit().await.unwrap();
        store.record_hit().await.unwrap();
        store.reset().await.unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_hits, 0);
        assert!(stats.by_date.is_empty());

        let result = store.record_hit().await.unwrap();
        assert_eq!(result.total_hits, 1);
    }

    #[tokio::test]
    async fn test_counts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("metrics.db"),
            ..DatabaseConfig::default()
        };

        let store = MetricsStore::open(&config).await.unwrap();
        store.record_hit().await.unwrap();
        store.record_hit().await.unwrap();
        store.close().await;

        let reopened = MetricsStore::open(&config).await.unwrap();
        let stats = reopened.get_stats().await.unwrap();
        assert_eq!(stats.total_hits, 2);
        reopened.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_hits_are_not_lost() {
        let (store, _dir) = open_store().await;
        const HITS: i64 = 64;

        let handles: Vec<_> = (0..HITS)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record_hit().await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total_hits, HITS);
        assert_eq!(stats.by_date.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let (store, _dir) = open_store().await;
        store.close().await;

        assert!(matches!(
            store.record_hit().await,
            Err(StoreError::Database(_))
        ));
        assert!(store.get_stats().await.is_err());
        assert!(store.reset().await.is_err());
    }

    #[tokio::test]
    async fn test_health_check_is_independent_of_storage() {
        let (store, _dir) = open_store().await;
        store.close().await;

        let health = store.health_check();
        assert_eq!(health.status, "ok");
        assert!(DateTime::parse_from_rfc3339(&health.timestamp).is_ok());
    }
}
