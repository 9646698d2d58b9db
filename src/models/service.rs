// Per-service traffic counters

use serde::{Deserialize, Serialize};

/// How a service is attached to the network; decides which engine may credit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Shares the host stack; measured by packet capture on known ports.
    Host,
    /// Isolated container network; measured by runtime interface counters.
    Bridge,
}

impl NetworkMode {
    /// Classify a Docker `HostConfig.NetworkMode` string.
    pub fn from_docker(s: &str) -> Self {
        if s.eq_ignore_ascii_case("host") {
            NetworkMode::Host
        } else {
            NetworkMode::Bridge
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStat {
    pub name: String,
    pub network_mode: NetworkMode,
    pub upload_bytes: u64,
    pub download_bytes: u64,
    /// Download rate in bytes/s over the last speed sample.
    #[serde(default)]
    pub speed_in: f64,
    /// Upload rate in bytes/s over the last speed sample.
    #[serde(default)]
    pub speed_out: f64,
}

impl ServiceStat {
    pub fn new(name: impl Into<String>, network_mode: NetworkMode) -> Self {
        Self {
            name: name.into(),
            network_mode,
            upload_bytes: 0,
            download_bytes: 0,
            speed_in: 0.0,
            speed_out: 0.0,
        }
    }
}
