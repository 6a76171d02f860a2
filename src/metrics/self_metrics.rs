use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Operational metrics about the exporter itself.
///
/// Held in a private registry so several exporters (or tests) can coexist
/// in one process.
pub struct ExporterMetrics {
    registry: Registry,
    pub scrapes: IntCounter,
    pub scrape_errors: IntCounterVec,
    pub scrape_duration: Histogram,
    pub decode_mismatches: IntCounterVec,
    pub origin_query_failures: IntCounterVec,
}

impl ExporterMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let scrapes = IntCounter::new(
            "ccm_exporter_scrapes_total",
            "Collection passes started",
        )?;
        let scrape_errors = IntCounterVec::new(
            Opts::new(
                "ccm_exporter_scrape_errors_total",
                "Collection passes that failed, by kind",
            ),
            &["kind"],
        )?;
        let scrape_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ccm_exporter_scrape_duration_seconds",
                "Wall-clock time of one collection pass",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let decode_mismatches = IntCounterVec::new(
            Opts::new(
                "ccm_exporter_decode_mismatches_total",
                "Stored document fields that were missing or mistyped",
            ),
            &["field"],
        )?;
        let origin_query_failures = IntCounterVec::new(
            Opts::new(
                "ccm_exporter_origin_query_failures_total",
                "Per-origin store queries that failed or timed out",
            ),
            &["origin"],
        )?;

        registry.register(Box::new(scrapes.clone()))?;
        registry.register(Box::new(scrape_errors.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(decode_mismatches.clone()))?;
        registry.register(Box::new(origin_query_failures.clone()))?;

        Ok(Self {
            registry,
            scrapes,
            scrape_errors,
            scrape_duration,
            decode_mismatches,
            origin_query_failures,
        })
    }

    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}
