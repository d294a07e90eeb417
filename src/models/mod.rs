// Domain models: inventory, metrics, services, discovery audit, inbound payload

mod discovery;
mod metrics;
mod payload;
mod server;
mod service;

pub use discovery::{BatchReport, DiscoveryResult, OpenPort};
pub use metrics::{Band, MetricBands, MetricSample};
pub use payload::{
    CapacitySection, CpuSection, DiscoveryPayload, DiskSection, OsSection, PayloadError,
    usage_percent,
};
pub use server::{NewServer, Server, ServerDetail, ServerStatus, Tag};
pub use service::{ObservedService, ServiceRecord};
