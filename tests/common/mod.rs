// Shared test helpers: frame builders, scripted container runtime, temp history repo
#![allow(dead_code)]

use pnet_packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet_packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet_packet::ipv4::MutableIpv4Packet;
use pnet_packet::tcp::MutableTcpPacket;
use pnet_packet::udp::MutableUdpPacket;
use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;
use trafficd::docker_repo::{ContainerInfo, ContainerRuntime, NetworkCounters};
use trafficd::error::TrafficError;
use trafficd::history_repo::HistoryRepo;

const ETH_LEN: usize = 14;
const IPV4_LEN: usize = 20;

fn ipv4_frame(protocol: IpNextHeaderProtocol, total_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; total_len];
    {
        let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
        eth.set_ethertype(EtherTypes::Ipv4);
    }
    {
        let mut ip = MutableIpv4Packet::new(&mut buf[ETH_LEN..]).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_ttl(64);
        ip.set_total_length((total_len - ETH_LEN) as u16);
        ip.set_next_level_protocol(protocol);
    }
    buf
}

/// Ethernet/IPv4/TCP frame of exactly `total_len` bytes (>= 54).
pub fn tcp_frame(src_port: u16, dst_port: u16, total_len: usize) -> Vec<u8> {
    let mut buf = ipv4_frame(IpNextHeaderProtocols::Tcp, total_len);
    {
        let mut tcp = MutableTcpPacket::new(&mut buf[ETH_LEN + IPV4_LEN..]).unwrap();
        tcp.set_source(src_port);
        tcp.set_destination(dst_port);
        tcp.set_data_offset(5);
    }
    buf
}

/// Ethernet/IPv4/UDP frame of exactly `total_len` bytes (>= 42).
pub fn udp_frame(src_port: u16, dst_port: u16, total_len: usize) -> Vec<u8> {
    let mut buf = ipv4_frame(IpNextHeaderProtocols::Udp, total_len);
    {
        let mut udp = MutableUdpPacket::new(&mut buf[ETH_LEN + IPV4_LEN..]).unwrap();
        udp.set_source(src_port);
        udp.set_destination(dst_port);
        udp.set_length((total_len - ETH_LEN - IPV4_LEN) as u16);
    }
    buf
}

/// IPv4 frame carrying ICMP.
pub fn icmp_frame(total_len: usize) -> Vec<u8> {
    ipv4_frame(IpNextHeaderProtocols::Icmp, total_len)
}

/// Non-IPv4 frame (IPv6 ethertype).
pub fn ipv6_frame(total_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; total_len];
    let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
    eth.set_ethertype(EtherTypes::Ipv6);
    drop(eth);
    buf
}

/// What the fake runtime answers for one container's counters.
#[derive(Debug, Clone)]
pub enum Reading {
    Counters(u64, u64),
    NoStats,
    Fails,
}

/// Container runtime driven by the test: set containers and readings between cycles.
#[derive(Default)]
pub struct FakeRuntime {
    pub containers: Mutex<Option<Vec<ContainerInfo>>>,
    pub readings: Mutex<HashMap<String, Reading>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` makes list_running fail as if the daemon were down.
    pub fn set_containers(&self, containers: Option<Vec<(&str, &str)>>) {
        let list = containers.map(|v| {
            v.into_iter()
                .map(|(name, mode)| ContainerInfo {
                    id: format!("id-{}", name),
                    name: name.to_string(),
                    network_mode: mode.to_string(),
                })
                .collect()
        });
        *self.containers.lock().unwrap() = list;
    }

    pub fn set_reading(&self, name: &str, reading: Reading) {
        self.readings
            .lock()
            .unwrap()
            .insert(name.to_string(), reading);
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn list_running(&self) -> Result<Vec<ContainerInfo>, TrafficError> {
        self.containers
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TrafficError::RuntimeUnavailable("daemon down".into()))
    }

    async fn network_counters(
        &self,
        container: &ContainerInfo,
    ) -> anyhow::Result<Option<NetworkCounters>> {
        let reading = self.readings.lock().unwrap().get(&container.name).cloned();
        match reading {
            Some(Reading::Counters(rx, tx)) => Ok(Some(NetworkCounters {
                rx_bytes: rx,
                tx_bytes: tx,
            })),
            Some(Reading::Fails) => anyhow::bail!("no such container"),
            Some(Reading::NoStats) | None => Ok(None),
        }
    }
}

/// Connected + initialized repo in a temp dir. Keep the TempDir alive.
pub async fn temp_repo() -> (TempDir, HistoryRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap()).await.unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}
