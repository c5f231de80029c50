//! FHIR proxy handlers and the patient summary

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use emr_core::cds::vitals::{VitalSigns, latest_vitals};
use emr_core::extract::{is_active_condition, is_active_medication};
use emr_core::resource::{is_valid_id, prepare_body};
use emr_core::{Envelope, ResourceType};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{ApiJson, ApiQuery, AppError};
use crate::fhir::patient_data::PatientSnapshot;
use crate::state::AppState;

pub const DEFAULT_COUNT: u32 = 50;
pub const MAX_COUNT: u32 = 500;
pub const DEFAULT_SORT: &str = "-_lastUpdated";

/// Parse the `{type}` path segment; unknown types are 404
pub(crate) fn resource_type(name: &str) -> Result<ResourceType, AppError> {
    Ok(name.parse::<ResourceType>()?)
}

pub(crate) fn check_id(id: &str) -> Result<(), AppError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid resource id: {}", id)))
    }
}

/// Apply the `_count` and `_sort` defaults to a client query, keeping every
/// other parameter (repeats included) in order
pub fn search_params(params: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(params.len() + 2);
    let mut has_count = false;
    let mut has_sort = false;

    for (name, value) in params {
        match name.as_str() {
            "_count" => {
                if has_count {
                    continue;
                }
                has_count = true;
                let count = value
                    .trim()
                    .parse::<u32>()
                    .map(|n| n.min(MAX_COUNT))
                    .unwrap_or(DEFAULT_COUNT);
                out.push((name, count.to_string()));
            }
            "_sort" => {
                has_sort = true;
                out.push((name, value));
            }
            _ => out.push((name, value)),
        }
    }

    if !has_count {
        out.push(("_count".to_string(), DEFAULT_COUNT.to_string()));
    }
    if !has_sort {
        out.push(("_sort".to_string(), DEFAULT_SORT.to_string()));
    }
    out
}

/// GET /api/fhir/{type}
pub async fn search(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let resource_type = resource_type(&type_name)?;
    let bundle = state
        .fhir
        .search(resource_type, &search_params(params))
        .await?;
    let total = bundle.total;
    Ok(Json(Envelope::with_total(bundle.into_resources(), total)))
}

/// GET /api/fhir/{type}/{id}
pub async fn read(
    State(state): State<AppState>,
    Path((type_name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let resource_type = resource_type(&type_name)?;
    check_id(&id)?;
    let resource = state.fhir.read(resource_type, &id).await?;
    Ok(Json(Envelope::ok(resource)))
}

/// POST /api/fhir/{type}
pub async fn create(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
    ApiJson(body): ApiJson<JsonValue>,
) -> Result<impl IntoResponse, AppError> {
    let resource_type = resource_type(&type_name)?;
    let body = prepare_body(resource_type, None, body)?;
    let created = state.fhir.create(resource_type, &body).await?;
    tracing::info!(
        resource_type = %resource_type,
        id = created.get("id").and_then(|v| v.as_str()).unwrap_or("-"),
        "Created resource"
    );
    Ok((StatusCode::CREATED, Json(Envelope::ok(created))))
}

/// PUT /api/fhir/{type}/{id}
pub async fn update(
    State(state): State<AppState>,
    Path((type_name, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<JsonValue>,
) -> Result<impl IntoResponse, AppError> {
    let resource_type = resource_type(&type_name)?;
    check_id(&id)?;
    let body = prepare_body(resource_type, Some(&id), body)?;
    let updated = state.fhir.update(resource_type, &id, &body).await?;
    Ok(Json(Envelope::ok(updated)))
}

/// DELETE /api/fhir/{type}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path((type_name, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let resource_type = resource_type(&type_name)?;
    check_id(&id)?;
    state.fhir.delete(resource_type, &id).await?;
    Ok(Json(Envelope::ok(JsonValue::Null)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient: JsonValue,
    pub conditions: Vec<JsonValue>,
    pub medications: Vec<JsonValue>,
    pub allergies: Vec<JsonValue>,
    pub vitals: VitalSigns,
}

impl From<PatientSnapshot> for PatientSummary {
    fn from(snapshot: PatientSnapshot) -> Self {
        Self {
            vitals: latest_vitals(&snapshot.vital_observations),
            patient: snapshot.patient,
            conditions: snapshot
                .conditions
                .into_iter()
                .filter(is_active_condition)
                .collect(),
            medications: snapshot
                .medications
                .into_iter()
                .filter(is_active_medication)
                .collect(),
            allergies: snapshot.allergies,
        }
    }
}

/// GET /api/patients/{id}/summary
pub async fn patient_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_id(&id)?;
    let snapshot = PatientSnapshot::fetch(&state.fhir, &id).await?;
    Ok(Json(Envelope::ok(PatientSummary::from(snapshot))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn adds_count_and_sort_defaults() {
        let params = search_params(pairs(&[("name", "smith")]));
        assert_eq!(
            params,
            pairs(&[("name", "smith"), ("_count", "50"), ("_sort", "-_lastUpdated")])
        );
    }

    #[test]
    fn caps_count_and_keeps_client_sort() {
        let params = search_params(pairs(&[("_count", "10000"), ("_sort", "birthdate")]));
        assert_eq!(params, pairs(&[("_count", "500"), ("_sort", "birthdate")]));
    }

    #[test]
    fn invalid_count_falls_back_to_default() {
        let params = search_params(pairs(&[("_count", "lots")]));
        assert_eq!(params[0], ("_count".to_string(), "50".to_string()));
    }

    #[test]
    fn keeps_repeated_parameters() {
        let params = search_params(pairs(&[("date", "ge2024-01-01"), ("date", "lt2025-01-01")]));
        assert_eq!(params.iter().filter(|(k, _)| k == "date").count(), 2);
    }
}
