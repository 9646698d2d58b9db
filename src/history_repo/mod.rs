// SQLite traffic history: one append-only table of per-service deltas.

pub mod aggregation;

use crate::models::{BucketedHistory, HistoryRange, HistoryRecord};
use aggregation::BucketRow;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct HistoryRepo {
    pool: SqlitePool,
}

impl HistoryRepo {
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self { pool })
    }

    /// Creates the history table and indexes. Safe to call repeatedly.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS traffic_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                name TEXT NOT NULL,
                upload INTEGER NOT NULL,
                download INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_traffic_created_at ON traffic_history(created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_traffic_created_at_name ON traffic_history(created_at, name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends all records in one transaction.
    #[instrument(skip(self, records), fields(repo = "history", operation = "append_records", records_count = records.len()))]
    pub async fn append_records(&self, records: &[HistoryRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in records {
            sqlx::query(
                "INSERT INTO traffic_history (created_at, name, upload, download) VALUES ($1, $2, $3, $4)",
            )
            .bind(r.timestamp)
            .bind(&r.name)
            .bind(i64::try_from(r.upload).unwrap_or(i64::MAX))
            .bind(i64::try_from(r.download).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Summed deltas per (bucket, service) for records with created_at > `start_ms`.
    #[instrument(skip(self), fields(repo = "history", operation = "aggregate_since"))]
    pub async fn aggregate_since(
        &self,
        start_ms: i64,
        bucket_format: &str,
    ) -> anyhow::Result<Vec<BucketRow>> {
        let rows = sqlx::query(aggregation::BUCKETED_TOTALS_SQL)
            .bind(bucket_format)
            .bind(start_ms)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let upload: i64 = row.try_get("upload")?;
            let download: i64 = row.try_get("download")?;
            out.push(BucketRow {
                bucket: row.try_get("bucket")?,
                name: row.try_get("name")?,
                upload: upload.max(0) as u64,
                download: download.max(0) as u64,
            });
        }
        Ok(out)
    }

    /// Bucketed history for `range`, ending now.
    pub async fn history(&self, range: HistoryRange) -> anyhow::Result<BucketedHistory> {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis() as i64;
        self.history_at(range, now_ms).await
    }

    /// Bucketed history for `range`, ending at `now_ms`.
    pub async fn history_at(
        &self,
        range: HistoryRange,
        now_ms: i64,
    ) -> anyhow::Result<BucketedHistory> {
        let start = aggregation::window_start(range, now_ms);
        let rows = self.aggregate_since(start, range.bucket_format()).await?;
        Ok(aggregation::fold_rows(rows))
    }

    /// Raw records in ascending time order (diagnostics and tests).
    pub async fn records_since(&self, start_ms: i64) -> anyhow::Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT created_at, name, upload, download FROM traffic_history
             WHERE created_at > $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(start_ms)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let upload: i64 = row.try_get("upload")?;
            let download: i64 = row.try_get("download")?;
            out.push(HistoryRecord {
                timestamp: row.try_get("created_at")?,
                name: row.try_get("name")?,
                upload: upload.max(0) as u64,
                download: download.max(0) as u64,
            });
        }
        Ok(out)
    }

    pub async fn record_count(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM traffic_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Close the pool; later calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
