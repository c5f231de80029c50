//! AI assist endpoints

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;
use emr_core::Envelope;
use emr_core::cds::sepsis::SepsisAssessment;
use serde::{Deserialize, Serialize};

use super::cds::{RiskScores, risk_scores_for_patient, sepsis_for_patient};
use super::fhir::check_id;
use crate::ai::assist::{self, Differential, describe_patient};
use crate::ai::LlmProvider;
use crate::error::{ApiJson, AppError};
use crate::fhir::patient_data::PatientSnapshot;
use crate::state::AppState;

/// Largest audio upload accepted for transcription
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

const DEFAULT_AUDIO_TYPE: &str = "audio/webm";

fn provider(state: &AppState) -> Result<&LlmProvider, AppError> {
    state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("AI assistant is not configured".to_string()))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}

#[derive(Serialize)]
pub struct Transcript {
    pub text: String,
}

/// POST /api/ai/transcribe - raw audio body
pub async fn transcribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let provider = provider(&state)?;
    if body.is_empty() {
        return Err(AppError::BadRequest("Audio body is empty".to_string()));
    }
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("audio/") || v.starts_with("video/"))
        .unwrap_or(DEFAULT_AUDIO_TYPE);

    tracing::info!(bytes = body.len(), mime = %mime, "Transcribing audio");
    let text = provider.transcribe(body.to_vec(), mime).await?;
    Ok(Json(Envelope::ok(Transcript { text })))
}

#[derive(Deserialize)]
pub struct ScribeRequest {
    pub transcript: String,
}

/// POST /api/ai/scribe
pub async fn scribe(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ScribeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = provider(&state)?;
    let transcript = required("transcript", &request.transcript)?;
    let note = assist::soap_note(provider, transcript).await?;
    Ok(Json(Envelope::ok(note)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnoseRequest {
    pub symptoms: String,
    pub context: Option<String>,
    pub patient_id: Option<String>,
}

/// POST /api/ai/diagnose
pub async fn diagnose(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DiagnoseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = provider(&state)?;
    let symptoms = required("symptoms", &request.symptoms)?;

    let patient_summary = match request.patient_id.as_deref() {
        Some(id) => {
            check_id(id)?;
            let snapshot = PatientSnapshot::fetch(&state.fhir, id).await?;
            Some(describe_patient(&snapshot, Utc::now().date_naive()))
        }
        None => None,
    };

    let differentials: Vec<Differential> = assist::differential_diagnosis(
        provider,
        symptoms,
        request.context.as_deref(),
        patient_summary.as_deref(),
    )
    .await?;
    Ok(Json(Envelope::ok(differentials)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummaryRequest {
    pub patient_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub sepsis: SepsisAssessment,
    pub risk_scores: RiskScores,
    pub narrative: String,
    pub model: String,
}

/// POST /api/ai/risk-summary
pub async fn risk_summary(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RiskSummaryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = provider(&state)?;
    let id = required("patientId", &request.patient_id)?;
    check_id(id)?;

    let (snapshot, sepsis, risk_scores) = tokio::try_join!(
        PatientSnapshot::fetch(&state.fhir, id),
        sepsis_for_patient(&state.fhir, id),
        risk_scores_for_patient(&state.fhir, id),
    )?;

    let scores = serde_json::json!({
        "sepsis": &sepsis,
        "riskScores": &risk_scores,
    });
    let narrative = assist::risk_narrative(
        provider,
        &scores,
        &describe_patient(&snapshot, Utc::now().date_naive()),
    )
    .await?;

    Ok(Json(Envelope::ok(RiskSummary {
        sepsis,
        risk_scores,
        narrative,
        model: provider.model().to_string(),
    })))
}
