// Failure classes of the accounting engines. None of these stop the process.

#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    /// Capture handle could not be opened; only host-mode attribution stops.
    #[error("capture unavailable on {interface}: {reason}")]
    CaptureUnavailable { interface: String, reason: String },
    /// Container runtime unreachable or enumeration failed; the cycle is skipped.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    /// History store write failed; the cycle is skipped.
    #[error("history store unavailable: {0}")]
    PersistenceUnavailable(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrafficError>;
