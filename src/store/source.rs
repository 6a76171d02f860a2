use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::{decode_probe_group, AllData, DocumentStore, ProbeGroup, QueryWindow};
use crate::config::OriginTarget;
use crate::error::StoreError;
use crate::metrics::ExporterMetrics;

/// Data source adapter: one call, one time-bounded query per configured origin.
pub struct ProbeSource {
    store: Arc<dyn DocumentStore>,
    targets: Vec<OriginTarget>,
    lookback_secs: i64,
    op_timeout: Duration,
    metrics: Arc<ExporterMetrics>,
}

impl ProbeSource {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        targets: Vec<OriginTarget>,
        lookback_secs: i64,
        op_timeout: Duration,
        metrics: Arc<ExporterMetrics>,
    ) -> Self {
        Self {
            store,
            targets,
            lookback_secs,
            op_timeout,
            metrics,
        }
    }

    /// Query every origin for the window ending at `now` (Unix seconds).
    ///
    /// Only an unreachable store is an error. Anything that goes wrong for a
    /// single origin is logged and yields an empty group in that origin's slot.
    pub async fn query_all_data(&self, now: i64, deadline: Instant) -> Result<AllData, StoreError> {
        let ping_deadline = self.bound(deadline);
        timeout_at(ping_deadline, self.store.ping())
            .await
            .map_err(|_| StoreError::Timeout {
                op: "ping",
                elapsed: self.op_timeout,
            })??;

        let window = QueryWindow::ending_at(now, self.lookback_secs);
        let groups = join_all(
            self.targets
                .iter()
                .map(|target| self.query_origin(target, window, deadline)),
        )
        .await;

        Ok(AllData { groups })
    }

    async fn query_origin(&self, target: &OriginTarget, window: QueryWindow, deadline: Instant) -> ProbeGroup {
        let origin = target.origin.as_str();

        let raw = match timeout_at(self.bound(deadline), self.store.first_in_window(origin, window)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(origin, start = window.start, end = window.end, "no document in window");
                return ProbeGroup::default();
            }
            Ok(Err(e)) => {
                warn!(origin, error = %e, "origin query failed");
                self.metrics.origin_query_failures.with_label_values(&[origin]).inc();
                return ProbeGroup::default();
            }
            Err(_) => {
                warn!(origin, "origin query hit the scrape deadline");
                self.metrics.origin_query_failures.with_label_values(&[origin]).inc();
                return ProbeGroup::default();
            }
        };

        let outcome = decode_probe_group(&raw, &target.probes);
        for issue in &outcome.issues {
            warn!(origin, field = issue.field(), %issue, "document decode mismatch");
            self.metrics
                .decode_mismatches
                .with_label_values(&[issue.field()])
                .inc();
        }
        if outcome.group.is_empty() {
            debug!(origin, "document carried no configured probe");
        }
        outcome.group
    }

    /// The earlier of the caller's deadline and one store operation timeout.
    fn bound(&self, deadline: Instant) -> Instant {
        deadline.min(Instant::now() + self.op_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeTarget;
    use crate::store::MemoryDocumentStore;
    use async_trait::async_trait;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn target(origin: &str) -> OriginTarget {
        OriginTarget {
            origin: origin.into(),
            probes: vec![ProbeTarget {
                source: "amazon".into(),
                gateway: "Amazon".into(),
                target_url: "useast1-public-ubiservices.ubi.com".into(),
            }],
        }
    }

    fn document(origin: &str, ts: i64, latency: f64) -> String {
        json!({
            "isp": origin,
            "clientutc": ts as f64,
            "sensorData": { "amazon": { "status": "ok", "latency": latency, "result": [] } }
        })
        .to_string()
    }

    fn source(store: Arc<dyn DocumentStore>, origins: &[&str]) -> (ProbeSource, Arc<ExporterMetrics>) {
        let metrics = Arc::new(ExporterMetrics::new().unwrap());
        let src = ProbeSource::new(
            store,
            origins.iter().map(|o| target(o)).collect(),
            180,
            Duration::from_millis(200),
            metrics.clone(),
        );
        (src, metrics)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn one_group_per_origin_in_config_order() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert("b", NOW - 10, document("b", NOW - 10, 7.0));
        store.insert("a", NOW - 20, document("a", NOW - 20, 3.0));
        let (src, _) = source(store, &["a", "b", "c"]);

        let data = src.query_all_data(NOW, far_deadline()).await.unwrap();
        assert_eq!(data.groups.len(), 3);
        assert_eq!(data.groups[0].origin, "a");
        assert_eq!(data.groups[0].measurements[0].latency, 3.0);
        assert_eq!(data.groups[1].origin, "b");
        assert_eq!(data.groups[2], ProbeGroup::default());
    }

    #[tokio::test]
    async fn window_excludes_181_seconds_back() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert("a", NOW - 181, document("a", NOW - 181, 1.0));
        let (src, _) = source(store.clone(), &["a"]);

        let data = src.query_all_data(NOW, far_deadline()).await.unwrap();
        assert_eq!(data.measurement_count(), 0);

        store.insert("a", NOW - 180, document("a", NOW - 180, 2.0));
        let data = src.query_all_data(NOW, far_deadline()).await.unwrap();
        assert_eq!(data.groups[0].client_utc, NOW - 180);
        assert_eq!(data.groups[0].measurements[0].latency, 2.0);
    }

    #[tokio::test]
    async fn unreachable_store_is_propagated() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_reachable(false);
        let (src, _) = source(store, &["a"]);

        let err = src.query_all_data(NOW, far_deadline()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn decode_mismatches_are_counted() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert("a", NOW, json!({ "clientutc": "soon", "sensorData": {} }).to_string());
        let (src, metrics) = source(store, &["a"]);

        let data = src.query_all_data(NOW, far_deadline()).await.unwrap();
        assert_eq!(data.groups[0].client_utc, 0);
        assert_eq!(metrics.decode_mismatches.with_label_values(&["isp"]).get(), 1);
        assert_eq!(metrics.decode_mismatches.with_label_values(&["clientutc"]).get(), 1);
        assert_eq!(
            metrics.decode_mismatches.with_label_values(&["sensorData.amazon"]).get(),
            1
        );
    }

    /// Answers ping immediately but never finishes a query.
    struct StalledStore;

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn first_in_window(&self, _: &str, _: QueryWindow) -> Result<Option<String>, StoreError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_query_degrades_to_empty_group() {
        let (src, metrics) = source(Arc::new(StalledStore), &["a"]);

        let started = Instant::now();
        let data = src
            .query_all_data(NOW, Instant::now() + Duration::from_millis(50))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(data.groups, vec![ProbeGroup::default()]);
        assert_eq!(metrics.origin_query_failures.with_label_values(&["a"]).get(), 1);
    }
}
