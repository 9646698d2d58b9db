// Bridge-mode attribution: periodic per-container RX/TX counters turned into deltas.

use crate::docker_repo::{ContainerInfo, ContainerRuntime, NetworkCounters};
use crate::error::TrafficError;
use crate::models::NetworkMode;
use crate::stats_store::{Credit, StatsStore};
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info, instrument, warn};

/// Last cumulative reading for one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub rx: u64,
    pub tx: u64,
}

impl From<NetworkCounters> for Baseline {
    fn from(c: NetworkCounters) -> Self {
        Self {
            rx: c.rx_bytes,
            tx: c.tx_bytes,
        }
    }
}

/// What one reading did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// First reading for this container; baseline recorded, nothing credited.
    Established,
    Applied { download: u64, upload: u64 },
    /// A counter went backwards (container restart); contribution discarded.
    CounterReset,
    /// The name belongs to a host-mode service; nothing credited.
    Conflict,
}

/// Per-cycle tally, logged at debug.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub containers: usize,
    pub applied: usize,
    pub resets: usize,
    pub skipped: usize,
}

pub struct CounterPoller<R> {
    runtime: R,
    store: Arc<StatsStore>,
    baselines: HashMap<String, Baseline>,
}

impl<R: ContainerRuntime> CounterPoller<R> {
    pub fn new(runtime: R, store: Arc<StatsStore>) -> Self {
        Self {
            runtime,
            store,
            baselines: HashMap::new(),
        }
    }

    pub fn baseline(&self, name: &str) -> Option<Baseline> {
        self.baselines.get(name).copied()
    }

    /// Fold one reading into the baseline cache and credit the delta.
    /// The baseline is overwritten with `reading` in every case.
    pub fn apply_reading(&mut self, name: &str, reading: NetworkCounters) -> PollOutcome {
        let current = Baseline::from(reading);
        let Some(previous) = self.baselines.insert(name.to_string(), current) else {
            return PollOutcome::Established;
        };

        let (Some(download), Some(upload)) = (
            current.rx.checked_sub(previous.rx),
            current.tx.checked_sub(previous.tx),
        ) else {
            info!(
                service = %name,
                previous_rx = previous.rx,
                previous_tx = previous.tx,
                rx = current.rx,
                tx = current.tx,
                "counter reset detected; discarding this cycle"
            );
            return PollOutcome::CounterReset;
        };

        match self.store.credit(name, NetworkMode::Bridge, upload, download) {
            Credit::Applied => PollOutcome::Applied { download, upload },
            Credit::Rejected { .. } => PollOutcome::Conflict,
        }
    }

    /// One polling cycle. Fails only when the runtime cannot enumerate containers.
    #[instrument(skip(self), fields(operation = "poll_counters"))]
    pub async fn poll_once(&mut self) -> Result<CycleSummary, TrafficError> {
        let containers: Vec<ContainerInfo> = self
            .runtime
            .list_running()
            .await?
            .into_iter()
            .filter(|c| NetworkMode::from_docker(&c.network_mode) == NetworkMode::Bridge)
            .collect();

        for c in &containers {
            self.store.ensure(&c.name, NetworkMode::Bridge);
        }

        let runtime = &self.runtime;
        let readings = join_all(containers.iter().map(|c| runtime.network_counters(c))).await;

        let mut summary = CycleSummary {
            containers: containers.len(),
            ..Default::default()
        };
        for (c, reading) in containers.iter().zip(readings) {
            match reading {
                Ok(Some(counters)) => match self.apply_reading(&c.name, counters) {
                    PollOutcome::Applied { .. } => summary.applied += 1,
                    PollOutcome::CounterReset => summary.resets += 1,
                    PollOutcome::Established | PollOutcome::Conflict => {}
                },
                Ok(None) => {
                    debug!(service = %c.name, "no network stats yet; skipping");
                    summary.skipped += 1;
                }
                Err(e) => {
                    debug!(service = %c.name, error = %e, "stats fetch failed; skipping");
                    summary.skipped += 1;
                }
            }
        }

        // Gone containers start from a fresh baseline if they come back.
        let running: HashSet<&str> = containers.iter().map(|c| c.name.as_str()).collect();
        self.baselines.retain(|name, _| running.contains(name.as_str()));

        Ok(summary)
    }
}

/// Spawns the polling loop. Runtime failures skip the cycle; the loop never exits.
pub fn spawn<R>(mut poller: CounterPoller<R>, interval_secs: u64) -> tokio::task::JoinHandle<()>
where
    R: ContainerRuntime + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut cycle: u64 = 0;
        loop {
            tick.tick().await;
            cycle += 1;
            match poller.poll_once().await {
                Ok(summary) => debug!(cycle, ?summary, "polling cycle complete"),
                Err(e) => warn!(cycle, error = %e, operation = "poll_counters", "polling cycle skipped"),
            }
        }
    })
}
