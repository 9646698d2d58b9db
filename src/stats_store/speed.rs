// Per-service bytes/s derived from consecutive counter samples.

use super::StatsStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant, interval};

#[derive(Default)]
pub struct SpeedSampler {
    previous: HashMap<String, (u64, u64)>,
    last_sample: Option<Instant>,
}

impl SpeedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample now; the elapsed time is measured from the previous call.
    pub fn sample(&mut self, store: &StatsStore) {
        let now = Instant::now();
        let elapsed = self.last_sample.map(|t| now.duration_since(t));
        self.last_sample = Some(now);
        self.sample_with_elapsed(store, elapsed);
    }

    /// Rates are only written once a previous sample exists and time has passed.
    pub fn sample_with_elapsed(&mut self, store: &StatsStore, elapsed: Option<Duration>) {
        let snapshot = store.snapshot();
        let secs = elapsed.map(|d| d.as_secs_f64()).filter(|s| *s > 0.0);

        let mut speeds = HashMap::with_capacity(snapshot.len());
        for s in &snapshot {
            let current = (s.download_bytes, s.upload_bytes);
            if let (Some(secs), Some(&(prev_down, prev_up))) = (secs, self.previous.get(&s.name)) {
                let down = current.0.saturating_sub(prev_down) as f64 / secs;
                let up = current.1.saturating_sub(prev_up) as f64 / secs;
                speeds.insert(s.name.clone(), (down, up));
            }
            self.previous.insert(s.name.clone(), current);
        }
        if !speeds.is_empty() {
            store.set_speeds(&speeds);
        }
    }
}

pub fn spawn_speed_sampler(
    store: Arc<StatsStore>,
    sample_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(sample_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut sampler = SpeedSampler::new();
        loop {
            tick.tick().await;
            sampler.sample(&store);
        }
    })
}
