//! Full scrape path: memory store -> adapter -> collector -> /metrics handler.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use tower::ServiceExt;

use ccm_exporter::config::{OriginTarget, ProbeTarget};
use ccm_exporter::handlers::metrics::{descriptors, scrape};
use ccm_exporter::metrics::{ExporterMetrics, ProbeCollector};
use ccm_exporter::store::{DocumentStore, MemoryDocumentStore, ProbeSource};
use ccm_exporter::{server, AppState};

fn state_over(store: Arc<MemoryDocumentStore>, targets: Vec<OriginTarget>) -> Arc<AppState> {
    let metrics = Arc::new(ExporterMetrics::new().unwrap());
    let source = ProbeSource::new(
        store as Arc<dyn DocumentStore>,
        targets,
        180,
        Duration::from_secs(1),
        metrics.clone(),
    );
    Arc::new(AppState {
        collector: Arc::new(ProbeCollector::new(source, metrics)),
        scrape_timeout: Duration::from_secs(5),
    })
}

fn document(origin: &str, ts: i64, latency: f64) -> String {
    json!({
        "isp": origin,
        "clientutc": ts as f64,
        "sensorData": {
            "amazon": {
                "status": "ok",
                "latency": latency,
                "url": "",
                "serverlocation": "",
                "start": 0.0,
                "params": "",
                "result": [],
                "type": "mtr"
            }
        }
    })
    .to_string()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn scrape_exposes_recent_probe_with_client_timestamp() {
    let store = Arc::new(MemoryDocumentStore::new());
    // Recent enough to fall inside the live window.
    let ts = chrono::Utc::now().timestamp() - 30;
    store.insert("Hong Kong UBISOFT", ts, document("Hong Kong UBISOFT", ts, 42.5));
    let state = state_over(store, vec![OriginTarget::default()]);

    let response = scrape(State(state), HeaderMap::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "{content_type}");

    let text = body_text(response).await;
    let expected = format!(
        r#"CCM_Latency{{domain="useast1-public-ubiservices.ubi.com",gateway="Amazon",isp="Hong Kong UBISOFT"}} 42.5 {}"#,
        ts * 1000
    );
    assert!(text.contains(&expected), "{text}");
    assert!(text.contains("ccm_exporter_scrapes_total 1"), "{text}");
}

#[tokio::test]
async fn empty_store_yields_well_formed_payload() {
    let store = Arc::new(MemoryDocumentStore::new());
    let state = state_over(store, vec![OriginTarget::default()]);

    let response = scrape(State(state), HeaderMap::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(!text.contains("CCM_Latency"), "{text}");
    assert!(text.contains("ccm_exporter_scrape_duration_seconds"), "{text}");
}

#[tokio::test]
async fn unreachable_store_returns_503_and_recovers() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.set_reachable(false);
    let state = state_over(store.clone(), vec![OriginTarget::default()]);

    let Err(err) = scrape(State(state.clone()), HeaderMap::new()).await else {
        panic!("scrape should fail while the store is down");
    };
    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

    store.set_reachable(true);
    let response = scrape(State(state), HeaderMap::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn descriptors_reflect_each_origin_and_probe() {
    let store = Arc::new(MemoryDocumentStore::new());
    let ts = chrono::Utc::now().timestamp() - 5;
    store.insert("Hong Kong UBISOFT", ts, document("Hong Kong UBISOFT", ts, 10.0));
    store.insert("Singapore Singtel", ts, document("Singapore Singtel", ts, 20.0));

    let targets = vec![
        OriginTarget::default(),
        OriginTarget {
            origin: "Singapore Singtel".into(),
            probes: vec![ProbeTarget {
                source: "amazon".into(),
                gateway: "Amazon".into(),
                target_url: "apsoutheast1-public-ubiservices.ubi.com".into(),
            }],
        },
    ];
    let state = state_over(store, targets);

    let views = descriptors(State(state), HeaderMap::new()).await.unwrap().0;
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].labels["isp"], "Hong Kong UBISOFT");
    assert_eq!(views[1].labels["domain"], "apsoutheast1-public-ubiservices.ubi.com");
}

#[tokio::test]
async fn router_serves_metrics_without_extra_headers() {
    let store = Arc::new(MemoryDocumentStore::new());
    let app = server::create_router(
        state_over(store, vec![OriginTarget::default()]),
        Duration::from_secs(5),
    );

    let request = Request::builder()
        .uri("/metrics")
        .header("X-Prometheus-Scrape-Timeout-Seconds", "10")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-Response-Time-Us").is_none());
    assert!(response.headers().get("Server-Timing").is_none());
}
