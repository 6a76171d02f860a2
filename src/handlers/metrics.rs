use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::CollectError;
use crate::metrics::exposition::{content_type, encode_text};
use crate::metrics::DescriptorView;
use crate::AppState;

use super::AppError;

/// Sent by Prometheus with every scrape.
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// Headroom left for encoding and transfer after the store work.
const SCRAPE_TIMEOUT_OFFSET: Duration = Duration::from_millis(500);

// ─── GET /metrics ────────────────────────────────────────────────

pub async fn scrape(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let deadline = Instant::now() + scrape_budget(&headers, state.scrape_timeout);

    let scrape = state.collector.collect(deadline).await?;

    let mut families = scrape.families();
    families.extend(state.collector.metrics().gather());
    let body = encode_text(&families).map_err(CollectError::Encode)?;

    Ok(([(header::CONTENT_TYPE, content_type())], body).into_response())
}

// ─── GET /descriptors ────────────────────────────────────────────

pub async fn descriptors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DescriptorView>>, AppError> {
    let deadline = Instant::now() + scrape_budget(&headers, state.scrape_timeout);
    let descs = state.collector.describe(deadline).await?;
    Ok(Json(descs.iter().map(DescriptorView::from).collect()))
}

/// The scraper's own timeout minus headroom, capped by the configured limit.
fn scrape_budget(headers: &HeaderMap, configured: Duration) -> Duration {
    headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(|secs| Duration::from_secs_f64(secs).saturating_sub(SCRAPE_TIMEOUT_OFFSET))
        .filter(|d| !d.is_zero())
        .map_or(configured, |d| d.min(configured))
}
