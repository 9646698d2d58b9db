// Background archiver: every interval, persist per-service deltas since the last cycle.
// The baseline advances every cycle, including cycles whose write failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TrafficError;
use crate::history_repo::HistoryRepo;
use crate::models::{HistoryRecord, ServiceStat};
use crate::stats_store::StatsStore;
use tracing::{debug, instrument, warn};

/// Last-archived cumulative (upload, download) per service.
#[derive(Debug, Default)]
pub struct ArchiveBaselines {
    baselines: HashMap<String, (u64, u64)>,
}

impl ArchiveBaselines {
    pub fn get(&self, name: &str) -> Option<(u64, u64)> {
        self.baselines.get(name).copied()
    }

    /// Deltas for every service with new traffic, stamped `now_ms`. Advances all baselines.
    /// A counter below its baseline yields 0 for that direction.
    pub fn take_deltas(&mut self, snapshot: &[ServiceStat], now_ms: i64) -> Vec<HistoryRecord> {
        let mut out = Vec::new();
        for s in snapshot {
            let (base_up, base_down) = self.baselines.get(&s.name).copied().unwrap_or((0, 0));
            let upload = s.upload_bytes.saturating_sub(base_up);
            let download = s.download_bytes.saturating_sub(base_down);
            if upload > 0 || download > 0 {
                out.push(HistoryRecord {
                    timestamp: now_ms,
                    name: s.name.clone(),
                    upload,
                    download,
                });
            }
            self.baselines
                .insert(s.name.clone(), (s.upload_bytes, s.download_bytes));
        }
        out
    }
}

pub struct HistoryArchiver {
    store: Arc<StatsStore>,
    repo: Arc<HistoryRepo>,
    baselines: ArchiveBaselines,
}

impl HistoryArchiver {
    pub fn new(store: Arc<StatsStore>, repo: Arc<HistoryRepo>) -> Self {
        Self {
            store,
            repo,
            baselines: ArchiveBaselines::default(),
        }
    }

    pub fn baselines(&self) -> &ArchiveBaselines {
        &self.baselines
    }

    /// One archive cycle. Returns the number of records written.
    #[instrument(skip(self), fields(operation = "archive"))]
    pub async fn archive_once(&mut self) -> Result<usize, TrafficError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let snapshot = self.store.snapshot();
        let records = self.baselines.take_deltas(&snapshot, now_ms);
        if records.is_empty() {
            return Ok(0);
        }
        self.repo
            .append_records(&records)
            .await
            .map_err(TrafficError::PersistenceUnavailable)?;
        Ok(records.len())
    }
}

/// Spawns the archive loop. Write failures lose that interval and the loop continues.
pub fn spawn(mut archiver: HistoryArchiver, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut cycle: u64 = 0;
        loop {
            tick.tick().await;
            cycle += 1;
            match archiver.archive_once().await {
                Ok(0) => {}
                Ok(n) => debug!(cycle, records = n, "history archived"),
                Err(e) => warn!(cycle, error = %e, "archive cycle dropped"),
            }
        }
    })
}
