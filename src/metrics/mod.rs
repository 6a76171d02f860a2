pub mod collector;
pub mod exposition;
pub mod self_metrics;

pub use collector::{ProbeCollector, Scrape};
pub use exposition::{DescriptorView, LatencySample, METRIC_HELP, METRIC_NAME};
pub use self_metrics::ExporterMetrics;
