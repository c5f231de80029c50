//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    fhir: &'static str,
    store: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reasons: Vec<String>,
}

/// GET /health - upstream FHIR reachability and local store connectivity
pub async fn check(State(state): State<AppState>) -> impl IntoResponse {
    let (fhir, store) = tokio::join!(state.fhir.ping(), state.store.ping());
    let mut reasons = Vec::new();

    let fhir = match fhir {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!(error = %e, "Health check: FHIR server unreachable");
            reasons.push(format!("FHIR server: {}", e));
            "down"
        }
    };
    let store = match store {
        Ok(()) => state.store.backend(),
        Err(e) => {
            tracing::error!(error = %e, "Health check: store unavailable");
            reasons.push(format!("Store: {}", e));
            "down"
        }
    };

    let status = if reasons.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if reasons.is_empty() { "healthy" } else { "unhealthy" },
            fhir,
            store,
            reasons,
        }),
    )
}
