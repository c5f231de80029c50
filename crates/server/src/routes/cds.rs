//! Clinical decision support endpoints

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use emr_core::cds::care_gaps::{CareGap, CareGapContext, ClinicalEvent, evaluate_care_gaps};
use emr_core::cds::fall::{FallRiskResult, MorseInput, morse_fall_scale, morse_input_from_fhir};
use emr_core::cds::interactions::{
    AllergyInput, InteractionReport, MedicationInput, check_all_interactions,
};
use emr_core::cds::readmission::{
    CharlsonResult, LaceInput, ReadmissionRiskResult, charlson_index, lace_index,
    lace_input_from_fhir,
};
use emr_core::cds::sepsis::{QsofaInput, SepsisAssessment, assess_sepsis, qsofa};
use emr_core::cds::vitals::latest_vitals;
use emr_core::extract::{
    allergy_substances, is_active_medication, medication_name, parse_fhir_date, patient_gender,
};
use emr_core::{Envelope, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::fhir::check_id;
use crate::error::{ApiJson, ApiQuery, AppError};
use crate::fhir::FhirClient;
use crate::fhir::patient_data::{search_for_patient, vital_sign_observations};
use crate::state::AppState;

/// GET /api/cds/patients/{id}/sepsis
pub async fn patient_sepsis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_id(&id)?;
    Ok(Json(Envelope::ok(sepsis_for_patient(&state.fhir, &id).await?)))
}

/// POST /api/cds/sepsis
pub async fn sepsis(ApiJson(input): ApiJson<QsofaInput>) -> impl IntoResponse {
    Json(Envelope::ok(qsofa(&input)))
}

pub(crate) async fn sepsis_for_patient(
    fhir: &FhirClient,
    patient_id: &str,
) -> Result<SepsisAssessment, AppError> {
    let observations = vital_sign_observations(fhir, patient_id).await?;
    Ok(assess_sepsis(latest_vitals(&observations)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallRisk {
    pub input: MorseInput,
    #[serde(flatten)]
    pub result: FallRiskResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadmissionRisk {
    /// `None` without a finished inpatient stay to score
    pub input: Option<LaceInput>,
    pub result: Option<ReadmissionRiskResult>,
    pub charlson: CharlsonResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScores {
    pub fall_risk: FallRisk,
    pub readmission_risk: ReadmissionRisk,
}

pub(crate) async fn risk_scores_for_patient(
    fhir: &FhirClient,
    patient_id: &str,
) -> Result<RiskScores, AppError> {
    let (conditions, medications, encounters) = tokio::try_join!(
        search_for_patient(fhir, ResourceType::Condition, patient_id, &[]),
        search_for_patient(fhir, ResourceType::MedicationRequest, patient_id, &[]),
        search_for_patient(
            fhir,
            ResourceType::Encounter,
            patient_id,
            &[("_sort", "-date")]
        ),
    )?;

    let fall_input = morse_input_from_fhir(&conditions, &medications);
    let lace_input = lace_input_from_fhir(&encounters, &conditions);

    Ok(RiskScores {
        fall_risk: FallRisk {
            result: morse_fall_scale(&fall_input),
            input: fall_input,
        },
        readmission_risk: ReadmissionRisk {
            result: lace_input.as_ref().map(lace_index),
            input: lace_input,
            charlson: charlson_index(&conditions),
        },
    })
}

/// GET /api/cds/patients/{id}/risk-scores
pub async fn patient_risk_scores(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_id(&id)?;
    Ok(Json(Envelope::ok(risk_scores_for_patient(&state.fhir, &id).await?)))
}

/// POST /api/cds/fall-risk
pub async fn fall_risk(ApiJson(input): ApiJson<MorseInput>) -> impl IntoResponse {
    Json(Envelope::ok(morse_fall_scale(&input)))
}

/// POST /api/cds/readmission-risk
pub async fn readmission_risk(ApiJson(input): ApiJson<LaceInput>) -> impl IntoResponse {
    Json(Envelope::ok(lace_index(&input)))
}

#[derive(Debug, Deserialize, Default)]
pub struct CareGapParams {
    #[serde(default)]
    pub include_satisfied: bool,
}

/// GET /api/cds/patients/{id}/care-gaps
pub async fn patient_care_gaps(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<CareGapParams>,
) -> Result<impl IntoResponse, AppError> {
    check_id(&id)?;
    let fhir = &state.fhir;
    let (patient, conditions, procedures, immunizations, reports, labs) = tokio::try_join!(
        fhir.read(ResourceType::Patient, &id),
        search_for_patient(fhir, ResourceType::Condition, &id, &[]),
        search_for_patient(fhir, ResourceType::Procedure, &id, &[]),
        search_for_patient(fhir, ResourceType::Immunization, &id, &[]),
        search_for_patient(fhir, ResourceType::DiagnosticReport, &id, &[]),
        search_for_patient(
            fhir,
            ResourceType::Observation,
            &id,
            &[("category", "laboratory")]
        ),
    )?;

    let birth_date = patient
        .get("birthDate")
        .and_then(|b| b.as_str())
        .and_then(parse_fhir_date)
        .ok_or_else(|| {
            AppError::BadRequest("Patient has no birthDate; care gaps need an age".to_string())
        })?;

    let events: Vec<ClinicalEvent> = [procedures, immunizations, reports, labs]
        .iter()
        .flatten()
        .filter_map(ClinicalEvent::from_resource)
        .collect();

    let ctx = CareGapContext {
        birth_date,
        gender: patient_gender(&patient),
        conditions: &conditions,
        events: &events,
    };
    let gaps: Vec<CareGap> =
        evaluate_care_gaps(&ctx, Utc::now().date_naive(), params.include_satisfied);
    Ok(Json(Envelope::ok(gaps)))
}

fn resource_id(resource: &JsonValue) -> Option<String> {
    resource.get("id").and_then(|v| v.as_str()).map(String::from)
}

pub(crate) async fn interactions_for_patient(
    fhir: &FhirClient,
    patient_id: &str,
) -> Result<InteractionReport, AppError> {
    let (medication_requests, allergy_resources) = tokio::try_join!(
        search_for_patient(
            fhir,
            ResourceType::MedicationRequest,
            patient_id,
            &[("status", "active")]
        ),
        search_for_patient(fhir, ResourceType::AllergyIntolerance, patient_id, &[]),
    )?;

    let medications: Vec<MedicationInput> = medication_requests
        .iter()
        .filter(|m| is_active_medication(m))
        .filter_map(|m| {
            medication_name(m).map(|name| MedicationInput {
                id: resource_id(m),
                name,
            })
        })
        .collect();

    let allergies: Vec<AllergyInput> = allergy_resources
        .iter()
        .flat_map(|a| {
            allergy_substances(a)
                .into_iter()
                .map(move |substance| AllergyInput {
                    id: resource_id(a),
                    substance,
                })
        })
        .collect();

    Ok(check_all_interactions(&medications, &allergies))
}

/// GET /api/cds/patients/{id}/interactions
pub async fn patient_interactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_id(&id)?;
    Ok(Json(Envelope::ok(interactions_for_patient(&state.fhir, &id).await?)))
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    #[serde(default)]
    pub medications: Vec<MedicationInput>,
    #[serde(default)]
    pub allergies: Vec<AllergyInput>,
}

/// POST /api/cds/interactions
pub async fn interactions(ApiJson(request): ApiJson<InteractionRequest>) -> impl IntoResponse {
    Json(Envelope::ok(check_all_interactions(
        &request.medications,
        &request.allergies,
    )))
}
