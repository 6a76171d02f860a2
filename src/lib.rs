//! CCM latency exporter.
//!
//! On every scrape, reads the latest probe documents for each configured
//! origin from the measurement store and exposes one timestamped gauge per
//! measurement in the Prometheus text format.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod seed;
pub mod server;
pub mod store;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Runs one store pass per request; holds no scrape-to-scrape state.
    pub collector: Arc<metrics::ProbeCollector>,

    /// Upper bound for a collection pass when the scraper sends no timeout.
    pub scrape_timeout: Duration,
}
