// Reduce a Docker stats response to cumulative RX/TX byte counters.

use bollard::models::ContainerStatsResponse;

/// Cumulative bytes across every interface of one container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Sum RX/TX over all interfaces. `None` when the runtime reports no network section
/// (container just started, or `--network none`).
pub(crate) fn network_counters(s: &ContainerStatsResponse) -> Option<NetworkCounters> {
    let networks = s.networks.as_ref()?;
    if networks.is_empty() {
        return None;
    }
    let mut out = NetworkCounters::default();
    for v in networks.values() {
        out.rx_bytes = out.rx_bytes.saturating_add(v.rx_bytes.unwrap_or(0));
        out.tx_bytes = out.tx_bytes.saturating_add(v.tx_bytes.unwrap_or(0));
    }
    Some(out)
}
