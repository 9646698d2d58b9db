// Shared per-service counters. One mutex covers every read-modify-write.

mod speed;

pub use speed::{SpeedSampler, spawn_speed_sampler};

use crate::models::{NetworkMode, ServiceStat};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of crediting bytes to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credit {
    Applied,
    /// The service exists under the other network mode; nothing was added.
    Rejected { existing: NetworkMode },
}

#[derive(Default)]
struct Inner {
    services: HashMap<String, ServiceStat>,
    /// (name, attempted mode) pairs already reported, so a conflict is logged once.
    reported_conflicts: HashSet<(String, NetworkMode)>,
}

impl Inner {
    /// True the first time this (name, attempted mode) pair is seen.
    fn note_conflict(&mut self, name: &str, attempted: NetworkMode) -> bool {
        self.reported_conflicts.insert((name.to_string(), attempted))
    }
}

fn warn_conflict(name: &str, existing: NetworkMode, attempted: NetworkMode) {
    tracing::warn!(
        service = %name,
        existing = ?existing,
        attempted = ?attempted,
        "service already attributed under another network mode; ignoring"
    );
}

#[derive(Default)]
pub struct StatsStore {
    inner: Mutex<Inner>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay consistent after a panic elsewhere; each update is a single add.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the service under `mode` if absent. Returns the mode it is recorded under.
    /// Asking for the other mode on an existing service is reported like a rejected credit.
    pub fn ensure(&self, name: &str, mode: NetworkMode) -> NetworkMode {
        let (existing, first_report) = {
            let mut inner = self.lock();
            let existing = inner
                .services
                .entry(name.to_string())
                .or_insert_with(|| ServiceStat::new(name, mode))
                .network_mode;
            let first = existing != mode && inner.note_conflict(name, mode);
            (existing, first)
        };
        if first_report {
            warn_conflict(name, existing, mode);
        }
        existing
    }

    /// Add bytes to a service on behalf of the engine owning `mode`.
    /// A service first seen under the other mode is left untouched.
    pub fn credit(&self, name: &str, mode: NetworkMode, upload: u64, download: u64) -> Credit {
        let (credit, first_report) = {
            let mut inner = self.lock();
            let stat = inner
                .services
                .entry(name.to_string())
                .or_insert_with(|| ServiceStat::new(name, mode));
            if stat.network_mode == mode {
                stat.upload_bytes = stat.upload_bytes.saturating_add(upload);
                stat.download_bytes = stat.download_bytes.saturating_add(download);
                (Credit::Applied, false)
            } else {
                let existing = stat.network_mode;
                let first = inner.note_conflict(name, mode);
                (Credit::Rejected { existing }, first)
            }
        };
        if first_report && let Credit::Rejected { existing } = credit {
            warn_conflict(name, existing, mode);
        }
        credit
    }

    /// Copy of one service, if known.
    pub fn get(&self, name: &str) -> Option<ServiceStat> {
        self.lock().services.get(name).cloned()
    }

    /// Copy of every service, sorted by name.
    pub fn snapshot(&self) -> Vec<ServiceStat> {
        let mut out: Vec<ServiceStat> = self.lock().services.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Overwrite the derived rates; names not present in the store are ignored.
    pub(crate) fn set_speeds(&self, speeds: &HashMap<String, (f64, f64)>) {
        let mut inner = self.lock();
        for (name, (speed_in, speed_out)) in speeds {
            if let Some(stat) = inner.services.get_mut(name) {
                stat.speed_in = *speed_in;
                stat.speed_out = *speed_out;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
