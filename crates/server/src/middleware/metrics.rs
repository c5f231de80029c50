//! Prometheus metrics collection middleware
//!
//! Records `http_requests_total` (counter) and `http_request_duration_seconds`
//! (histogram) for every request, with method/path/status labels.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Whether `seg` looks like an identifier rather than a route word
fn is_identifier(seg: &str) -> bool {
    uuid::Uuid::try_parse(seg).is_ok() || seg.bytes().any(|b| b.is_ascii_digit())
}

/// Normalize request paths to avoid high-cardinality labels.
///
/// FHIR ids, patient ids and other identifiers become `:id`.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let after = |word: &str| i > 0 && segments[i - 1] == word;
            // ["", "api", "fhir", type, id, ...]
            let fhir_id = i == 4 && segments.get(2) == Some(&"fhir");
            let named_id = after("patients") || after("connections") || after("catalog");
            if fhir_id || named_id || is_identifier(seg) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count and duration metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}
