use crate::capture::PortRegistry;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub capture: CaptureConfig,
    pub polling: PollingConfig,
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
    /// Port registry for host-mode services.
    #[serde(default = "default_host_services")]
    pub host_services: Vec<HostServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interface to bind the link-layer capture to (e.g. "eth0").
    pub interface: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Must be coarser than polling.interval_secs.
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedConfig {
    pub sample_interval_secs: u64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostServiceConfig {
    pub port: u16,
    pub name: String,
}

pub fn default_host_services() -> Vec<HostServiceConfig> {
    [
        (8096, "Emby"),
        (8920, "Emby (HTTPS)"),
        (10308, "trafficd"),
        (80, "Nginx (Web)"),
        (443, "Nginx (SSL)"),
    ]
    .into_iter()
    .map(|(port, name)| HostServiceConfig {
        port,
        name: name.to_string(),
    })
    .collect()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn port_registry(&self) -> PortRegistry {
        PortRegistry::new(
            self.host_services
                .iter()
                .map(|h| (h.port, h.name.clone())),
        )
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            !self.capture.enabled || !self.capture.interface.is_empty(),
            "capture.interface must be non-empty when capture is enabled"
        );
        anyhow::ensure!(
            self.polling.interval_secs > 0,
            "polling.interval_secs must be > 0, got {}",
            self.polling.interval_secs
        );
        anyhow::ensure!(
            self.archive.interval_secs > 0,
            "archive.interval_secs must be > 0, got {}",
            self.archive.interval_secs
        );
        anyhow::ensure!(
            self.archive.interval_secs > self.polling.interval_secs,
            "archive.interval_secs ({}) must be greater than polling.interval_secs ({})",
            self.archive.interval_secs,
            self.polling.interval_secs
        );
        anyhow::ensure!(
            self.speed.sample_interval_secs > 0,
            "speed.sample_interval_secs must be > 0, got {}",
            self.speed.sample_interval_secs
        );
        let mut seen = HashSet::new();
        for h in &self.host_services {
            anyhow::ensure!(h.port > 0, "host_services.port must be > 0");
            anyhow::ensure!(
                !h.name.trim().is_empty(),
                "host_services.name must be non-empty (port {})",
                h.port
            );
            anyhow::ensure!(
                seen.insert(h.port),
                "host_services.port {} is listed more than once",
                h.port
            );
        }
        Ok(())
    }
}
