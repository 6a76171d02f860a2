use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::debug;

/// Logs method, path, status and wall time for every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let response = next.run(req).await;

    debug!(
        status = response.status().as_u16(),
        %method,
        %path,
        elapsed = ?start.elapsed(),
        "request served"
    );

    response
}
