pub mod ai;
pub mod audit;
pub mod cds;
pub mod ehr;
pub mod fhir;
pub mod health;
pub mod medications;
pub mod metrics;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Routes under `/api` that require the API key
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/fhir/{type}", get(fhir::search).post(fhir::create))
        .route(
            "/fhir/{type}/{id}",
            get(fhir::read).put(fhir::update).delete(fhir::delete),
        )
        .route("/patients/{id}/summary", get(fhir::patient_summary))
        .nest("/cds", cds_routes())
        .nest("/ai", ai_routes())
        .route("/ehr/connections", get(ehr::list).post(ehr::create))
        .route(
            "/ehr/connections/{id}",
            get(ehr::get).delete(ehr::delete),
        )
        .route("/ehr/connections/{id}/authorize", get(ehr::authorize))
        .route("/medications/catalog", get(medications::search))
        .route(
            "/medications/catalog/{ndc}",
            get(medications::get)
                .put(medications::upsert)
                .delete(medications::delete),
        )
        .route("/audit", get(audit::list))
}

/// Routes the EHR redirects the browser to; no API key is presented there
pub fn ehr_public_routes() -> Router<AppState> {
    Router::new().route("/ehr/callback", get(ehr::callback))
}

fn cds_routes() -> Router<AppState> {
    Router::new()
        .route("/patients/{id}/sepsis", get(cds::patient_sepsis))
        .route("/patients/{id}/risk-scores", get(cds::patient_risk_scores))
        .route("/patients/{id}/care-gaps", get(cds::patient_care_gaps))
        .route("/patients/{id}/interactions", get(cds::patient_interactions))
        .route("/sepsis", post(cds::sepsis))
        .route("/fall-risk", post(cds::fall_risk))
        .route("/readmission-risk", post(cds::readmission_risk))
        .route("/interactions", post(cds::interactions))
}

fn ai_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transcribe",
            post(ai::transcribe).layer(DefaultBodyLimit::max(ai::MAX_AUDIO_BYTES)),
        )
        .route("/scribe", post(ai::scribe))
        .route("/diagnose", post(ai::diagnose))
        .route("/risk-summary", post(ai::risk_summary))
}
