//! Patient-scoped fetches shared by the summary, CDS and AI routes

use emr_core::ResourceType;
use emr_core::cds::vitals::{LOINC_GCS_TOTAL, LOINC_WBC};
use serde_json::Value as JsonValue;

use super::FhirClient;
use crate::error::AppError;

/// Page size for patient-scoped searches. Only the first page is read.
pub const PATIENT_PAGE_SIZE: u32 = 500;

const VITAL_SIGNS_CATEGORY: &str = "vital-signs";

/// Search `resource_type` for one patient and return the matching resources.
///
/// `_include`d resources of other types are dropped.
pub async fn search_for_patient(
    fhir: &FhirClient,
    resource_type: ResourceType,
    patient_id: &str,
    extra: &[(&str, &str)],
) -> Result<Vec<JsonValue>, AppError> {
    let mut params = vec![
        ("patient".to_string(), patient_id.to_string()),
        ("_count".to_string(), PATIENT_PAGE_SIZE.to_string()),
    ];
    params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let bundle = fhir.search(resource_type, &params).await?;
    Ok(bundle
        .resources_of(resource_type.as_str())
        .into_iter()
        .cloned()
        .collect())
}

/// The patient's `vital-signs` Observations plus the GCS and WBC results
/// the sepsis screen also scores, newest first.
pub async fn vital_sign_observations(
    fhir: &FhirClient,
    patient_id: &str,
) -> Result<Vec<JsonValue>, AppError> {
    let extra_codes = [LOINC_GCS_TOTAL, LOINC_WBC].join(",");
    let extra_params = [("code", extra_codes.as_str()), ("_sort", "-date")];
    let (mut vitals, extra) = tokio::try_join!(
        search_for_patient(
            fhir,
            ResourceType::Observation,
            patient_id,
            &[("category", VITAL_SIGNS_CATEGORY), ("_sort", "-date")],
        ),
        search_for_patient(
            fhir,
            ResourceType::Observation,
            patient_id,
            &extra_params,
        ),
    )?;
    vitals.extend(extra);
    Ok(vitals)
}

/// Patient with its active problems, medications, allergies and vitals
pub struct PatientSnapshot {
    pub patient: JsonValue,
    pub conditions: Vec<JsonValue>,
    pub medications: Vec<JsonValue>,
    pub allergies: Vec<JsonValue>,
    pub vital_observations: Vec<JsonValue>,
}

impl PatientSnapshot {
    /// Fetch the patient and its clinical context concurrently.
    ///
    /// A missing patient fails the whole snapshot with the upstream status.
    pub async fn fetch(fhir: &FhirClient, patient_id: &str) -> Result<Self, AppError> {
        let (patient, conditions, medications, allergies, vital_observations) = tokio::try_join!(
            fhir.read(ResourceType::Patient, patient_id),
            search_for_patient(
                fhir,
                ResourceType::Condition,
                patient_id,
                &[("clinical-status", "active")]
            ),
            search_for_patient(
                fhir,
                ResourceType::MedicationRequest,
                patient_id,
                &[("status", "active")]
            ),
            search_for_patient(fhir, ResourceType::AllergyIntolerance, patient_id, &[]),
            vital_sign_observations(fhir, patient_id),
        )?;

        Ok(Self {
            patient,
            conditions,
            medications,
            allergies,
            vital_observations,
        })
    }
}
