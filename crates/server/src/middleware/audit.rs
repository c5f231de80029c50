//! Audit trail for mutations

use std::sync::Arc;

use axum::{body::Body, extract::Request, http::Method, middleware::Next, response::Response};
use chrono::Utc;
use uuid::Uuid;

use super::request_id::RequestId;
use crate::audit::{AuditEvent, AuditLog};

/// Optional header naming the acting user
pub const ACTOR_HEADER: &str = "X-User-Id";

/// Record every POST, PUT and DELETE, with its final status, in the audit
/// log and on the `audit` tracing target
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    if !matches!(method, Method::POST | Method::PUT | Method::DELETE) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from);
    let log = request.extensions().get::<Arc<AuditLog>>().cloned();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        target: "audit",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = %status,
        actor = actor.as_deref().unwrap_or("-"),
        "Mutation request"
    );

    if let Some(log) = log {
        log.record(AuditEvent {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            request_id,
            method: method.to_string(),
            path,
            status,
            actor,
        });
    }

    response
}
