// Container runtime access. The polling engine only sees the ContainerRuntime trait;
// DockerRepo is the bollard implementation.

mod stats;

pub use stats::NetworkCounters;

use crate::error::TrafficError;
use bollard::Docker;
use bollard::query_parameters::{ListContainersOptions, StatsOptions};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// A running container as seen by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    /// Declared network mode, e.g. "host", "bridge", "default", "container:<id>".
    pub network_mode: String,
}

pub trait ContainerRuntime: Send + Sync {
    fn list_running(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, TrafficError>> + Send;

    /// One point-in-time reading; `Ok(None)` when the container has no network stats yet.
    fn network_counters(
        &self,
        container: &ContainerInfo,
    ) -> impl Future<Output = anyhow::Result<Option<NetworkCounters>>> + Send;
}

impl<T: ContainerRuntime> ContainerRuntime for Arc<T> {
    fn list_running(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, TrafficError>> + Send {
        (**self).list_running()
    }

    fn network_counters(
        &self,
        container: &ContainerInfo,
    ) -> impl Future<Output = anyhow::Result<Option<NetworkCounters>>> + Send {
        (**self).network_counters(container)
    }
}

/// Docker over the default unix socket. The client is created on first use and
/// retried on later calls if that fails.
#[derive(Default)]
pub struct DockerRepo {
    docker: Mutex<Option<Docker>>,
}

impl DockerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect eagerly; fails when the socket settings are unusable.
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self {
            docker: Mutex::new(Some(docker)),
        })
    }

    fn client(&self) -> Result<Docker, TrafficError> {
        let mut guard = self.docker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(docker) = guard.as_ref() {
            return Ok(docker.clone());
        }
        let docker = Docker::connect_with_unix_defaults()
            .map_err(|e| TrafficError::RuntimeUnavailable(e.to_string()))?;
        *guard = Some(docker.clone());
        Ok(docker)
    }
}

impl ContainerRuntime for DockerRepo {
    async fn list_running(&self) -> Result<Vec<ContainerInfo>, TrafficError> {
        let docker = self.client()?;

        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);
        let filter = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        let containers = docker
            .list_containers(Some(filter))
            .await
            .map_err(|e| TrafficError::RuntimeUnavailable(e.to_string()))?;

        let out = containers
            .into_iter()
            .map(|c| {
                let id = c.id.unwrap_or_default();
                let name = c
                    .names
                    .as_ref()
                    .and_then(|n| n.first())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| id.clone());
                let network_mode = c
                    .host_config
                    .and_then(|h| h.network_mode)
                    .unwrap_or_default();
                ContainerInfo {
                    id,
                    name,
                    network_mode,
                }
            })
            .collect();
        Ok(out)
    }

    async fn network_counters(
        &self,
        container: &ContainerInfo,
    ) -> anyhow::Result<Option<NetworkCounters>> {
        let docker = self.client()?;
        let options = StatsOptions {
            stream: false,
            one_shot: true,
            ..Default::default()
        };
        let mut stream = docker.stats(&container.id, Some(options));
        match stream.next().await {
            Some(Ok(s)) => Ok(stats::network_counters(&s)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}
