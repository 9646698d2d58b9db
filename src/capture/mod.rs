// Host-mode attribution: raw link-layer capture matched against known ports.
// Reads block, so the loop runs on a blocking thread.

pub mod frame;
pub mod ports;

pub use frame::{FrameOutcome, ParsedFrame, Transport, parse_frame};
pub use ports::PortRegistry;

use crate::error::TrafficError;
use crate::models::NetworkMode;
use crate::stats_store::StatsStore;
use pnet_datalink::{Channel, DataLinkReceiver};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate limit for read-error warnings.
const READ_ERROR_WARN_INTERVAL: Duration = Duration::from_secs(60);
/// Pause after a failed read so a broken handle does not spin the thread.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);
/// Receive buffer per frame: a full 64 KiB GRO/TSO aggregate plus its Ethernet header.
/// Anything smaller truncates large frames and undercounts their length.
pub const CAPTURE_BUFFER_SIZE: usize = 65536 + 14;

fn channel_config() -> pnet_datalink::Config {
    pnet_datalink::Config {
        read_buffer_size: CAPTURE_BUFFER_SIZE,
        ..Default::default()
    }
}

/// Blocking source of raw frames.
pub trait FrameSource {
    /// Next frame. `UnexpectedEof` means the source is closed for good.
    fn next_frame(&mut self) -> io::Result<&[u8]>;
}

/// AF_PACKET handle bound to one interface.
pub struct LinkCapture {
    rx: Box<dyn DataLinkReceiver>,
}

impl LinkCapture {
    pub fn open(interface: &str) -> Result<Self, TrafficError> {
        let unavailable = |reason: String| TrafficError::CaptureUnavailable {
            interface: interface.to_string(),
            reason,
        };
        let iface = pnet_datalink::interfaces()
            .into_iter()
            .find(|i| i.name == interface)
            .ok_or_else(|| unavailable("no such interface".into()))?;

        match pnet_datalink::channel(&iface, channel_config()) {
            Ok(Channel::Ethernet(_tx, rx)) => Ok(Self { rx }),
            Ok(_) => Err(unavailable("unsupported channel type".into())),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(unavailable(format!(
                "{} (requires CAP_NET_RAW or a privileged container)",
                e
            ))),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }
}

impl FrameSource for LinkCapture {
    fn next_frame(&mut self) -> io::Result<&[u8]> {
        self.rx.next()
    }
}

pub struct CaptureEngine {
    registry: PortRegistry,
    store: Arc<StatsStore>,
}

impl CaptureEngine {
    pub fn new(registry: PortRegistry, store: Arc<StatsStore>) -> Self {
        Self { registry, store }
    }

    /// Parse one frame and credit matching host services.
    /// Destination port match counts as download, source port match as upload;
    /// when both match, the frame is counted in both directions.
    pub fn process_frame(&self, frame: &[u8]) -> FrameOutcome {
        let outcome = parse_frame(frame);
        if let FrameOutcome::Parsed(p) = outcome {
            if let Some(name) = self.registry.resolve(p.dst_port) {
                self.store.credit(name, NetworkMode::Host, 0, p.length);
            }
            if let Some(name) = self.registry.resolve(p.src_port) {
                self.store.credit(name, NetworkMode::Host, p.length, 0);
            }
        }
        outcome
    }

    /// Consume frames until the source closes. Under a live capture this never returns.
    pub fn run<S: FrameSource>(&self, mut source: S) {
        let mut last_warn: Option<Instant> = None;
        loop {
            match source.next_frame() {
                Ok(frame) => {
                    self.process_frame(frame);
                }
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    tracing::info!("capture source closed");
                    return;
                }
                Err(e) => {
                    if last_warn.is_none_or(|t| t.elapsed() >= READ_ERROR_WARN_INTERVAL) {
                        tracing::warn!(error = %e, operation = "capture_read", "frame read failed");
                        last_warn = Some(Instant::now());
                    }
                    std::thread::sleep(READ_ERROR_BACKOFF);
                }
            }
        }
    }
}

/// Open `interface` and run the engine on a blocking thread.
/// If the handle cannot be opened the task logs and ends; nothing else is affected.
pub fn spawn(interface: String, engine: CaptureEngine) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let source = match LinkCapture::open(&interface) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = "open_capture",
                    "packet capture disabled; host-mode services will not be counted"
                );
                return;
            }
        };
        tracing::info!(
            interface = %interface,
            ports = engine.registry.len(),
            "capturing host-mode traffic"
        );
        engine.run(source);
    })
}
