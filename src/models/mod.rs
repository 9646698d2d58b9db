// Domain models

mod history;
mod service;

pub use history::{BucketedHistory, HistoryRange, HistoryRecord, TrafficTotals};
pub use service::{NetworkMode, ServiceStat};
