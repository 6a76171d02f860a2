use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tokio::time::Instant as Deadline;
use tracing::{error, info};

use super::exposition::{latency_family, samples_from, LatencySample};
use super::ExporterMetrics;
use crate::error::{CollectError, StoreError};
use crate::store::{AllData, ProbeSource};

/// Pull-based collector for probe latency.
///
/// Holds no per-scrape state: every `collect` and `describe` call runs a
/// fresh pass against the store, so concurrent scrapes never share
/// mutable data.
pub struct ProbeCollector {
    source: ProbeSource,
    metrics: Arc<ExporterMetrics>,
}

/// Output of one collection pass.
#[derive(Debug, Clone)]
pub struct Scrape {
    pub samples: Vec<LatencySample>,
}

impl Scrape {
    pub fn families(&self) -> Vec<MetricFamily> {
        latency_family(&self.samples).into_iter().collect()
    }
}

impl ProbeCollector {
    pub fn new(source: ProbeSource, metrics: Arc<ExporterMetrics>) -> Self {
        Self { source, metrics }
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Every descriptor the store currently yields, regenerated on each call.
    pub async fn describe(&self, deadline: Deadline) -> Result<Vec<Desc>, CollectError> {
        let data = self
            .source
            .query_all_data(Utc::now().timestamp(), deadline)
            .await?;
        let samples = samples_from(&data).map_err(CollectError::Descriptor)?;
        Ok(samples.into_iter().map(|s| s.desc).collect())
    }

    pub async fn collect(&self, deadline: Deadline) -> Result<Scrape, CollectError> {
        self.collect_at(Utc::now(), deadline).await
    }

    /// One pass for the window ending at `now`.
    pub async fn collect_at(&self, now: DateTime<Utc>, deadline: Deadline) -> Result<Scrape, CollectError> {
        let timer = Instant::now();
        self.metrics.scrapes.inc();

        let result = self
            .source
            .query_all_data(now.timestamp(), deadline)
            .await
            .map_err(CollectError::from)
            .and_then(|data| self.flatten(&data));

        let elapsed = timer.elapsed();
        self.metrics.scrape_duration.observe(elapsed.as_secs_f64());

        let samples = match result {
            Ok(samples) => samples,
            Err(e) => {
                self.metrics
                    .scrape_errors
                    .with_label_values(&[error_kind(&e)])
                    .inc();
                error!(error = %e, elapsed = ?elapsed, "probe collection failed");
                return Err(e);
            }
        };

        info!(
            elapsed = ?elapsed,
            date_utc = %now.format("%Y/%m/%dT%H:%M:%S"),
            samples = samples.len(),
            "CCM metrics collected"
        );

        Ok(Scrape { samples })
    }

    fn flatten(&self, data: &AllData) -> Result<Vec<LatencySample>, CollectError> {
        samples_from(data).map_err(CollectError::Descriptor)
    }
}

fn error_kind(e: &CollectError) -> &'static str {
    match e {
        CollectError::Store(StoreError::Timeout { .. }) => "store_timeout",
        CollectError::Store(_) => "store_unavailable",
        CollectError::Descriptor(_) => "descriptor",
        CollectError::Encode(_) => "encode",
    }
}
