use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::info;

use crate::config::OriginTarget;
use crate::error::StoreError;
use crate::store::RedisDocumentStore;

// ─── Constants ───────────────────────────────────────────────────

/// Latency range for synthetic probes, in milliseconds.
const LATENCY_MS: std::ops::Range<f64> = 15.0..180.0;

static STATUSES: &[&str] = &["ok", "ok", "ok", "ok", "timeout"];

// ─── Public entry point ──────────────────────────────────────────

/// Write `count` synthetic documents per origin, spaced `interval_secs`
/// apart and ending at `now`, so a fresh store has something to scrape.
pub async fn seed(
    store: &RedisDocumentStore,
    targets: &[OriginTarget],
    now: i64,
    count: usize,
    interval_secs: i64,
) -> Result<usize, StoreError> {
    let start = Instant::now();
    // Deterministic RNG so re-runs produce the same data.
    let mut rng = StdRng::seed_from_u64(42);
    let mut written = 0;

    for target in targets {
        for i in 0..count {
            let client_utc = now - (count - 1 - i) as i64 * interval_secs;
            let doc = synthetic_document(target, client_utc, &mut rng);
            store.insert(&target.origin, client_utc, &doc.to_string()).await?;
            written += 1;
        }
    }

    info!(
        documents = written,
        origins = targets.len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "seed complete"
    );
    Ok(written)
}

/// One stored document with a sub-document per configured probe source.
pub fn synthetic_document(target: &OriginTarget, client_utc: i64, rng: &mut StdRng) -> Value {
    let mut sensor = Map::new();
    for probe in &target.probes {
        let status = STATUSES[rng.gen_range(0..STATUSES.len())];
        let latency = (rng.gen_range(LATENCY_MS) * 10.0).round() / 10.0;
        sensor.insert(
            probe.source.clone(),
            json!({
                "status": status,
                "latency": latency,
                "url": "",
                "serverlocation": "",
                "start": client_utc as f64,
                "params": "-r -c 10",
                "result": [],
                "type": "mtr",
            }),
        );
    }

    json!({
        "isp": target.origin,
        "clientutc": client_utc as f64,
        "sensorData": sensor,
    })
}
