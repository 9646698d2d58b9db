// Time-bucket grouping of archived deltas. SQLite does the GROUP BY; this module
// owns the bucket SQL and folds grouped rows into the nested response map.

use crate::models::{BucketedHistory, HistoryRange, TrafficTotals};

/// Grouped sums per (local-time bucket, service) for records newer than `$2`.
/// `$1` is the strftime pattern for the bucket label.
pub(super) const BUCKETED_TOTALS_SQL: &str = r#"
    SELECT strftime($1, created_at / 1000, 'unixepoch', 'localtime') AS bucket,
           name,
           SUM(upload) AS upload,
           SUM(download) AS download
    FROM traffic_history
    WHERE created_at > $2
    GROUP BY bucket, name
    ORDER BY bucket ASC, name ASC
"#;

/// One grouped row as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRow {
    pub bucket: String,
    pub name: String,
    pub upload: u64,
    pub download: u64,
}

/// Exclusive lower bound of the query window.
pub fn window_start(range: HistoryRange, now_ms: i64) -> i64 {
    now_ms - range.window_ms()
}

/// Nest rows as bucket -> service -> totals. Repeated keys are summed.
pub fn fold_rows(rows: impl IntoIterator<Item = BucketRow>) -> BucketedHistory {
    let mut out = BucketedHistory::new();
    for row in rows {
        let totals: &mut TrafficTotals = out
            .entry(row.bucket)
            .or_default()
            .entry(row.name)
            .or_default();
        totals.upload = totals.upload.saturating_add(row.upload);
        totals.download = totals.download.saturating_add(row.download);
    }
    out
}
