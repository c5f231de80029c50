use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use emr_core::Envelope;
use serde::Deserialize;

use crate::error::ApiQuery;
use crate::state::AppState;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize, Default)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// GET /api/audit - newest first
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> impl IntoResponse {
    let events = state.audit.recent(query.limit.unwrap_or(DEFAULT_LIMIT));
    let total = state.audit.len() as u32;
    Json(Envelope::with_total(events, Some(total)))
}
