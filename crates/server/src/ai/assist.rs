//! Clinical documentation and reasoning prompts

use chrono::NaiveDate;
use emr_core::cds::vitals::{Reading, latest_vitals};
use emr_core::extract::{allergy_substances, concept_text, medication_name, patient_age, patient_gender};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::json::parse_reply;
use super::{AiError, LlmProvider};
use crate::fhir::patient_data::PatientSnapshot;

const SCRIBE_PROMPT: &str = r#"You are a clinical scribe. Turn the transcript of a patient encounter into a SOAP note.

Return ONLY a JSON object with exactly these string keys:
{
  "subjective": "history and symptoms as reported by the patient",
  "objective": "exam findings, vitals and results mentioned",
  "assessment": "clinician's assessment and working diagnoses",
  "plan": "treatment, orders, follow-up"
}

Use only information present in the transcript. Write "Not documented." for a section the transcript does not cover."#;

const DIAGNOSIS_PROMPT: &str = r#"You are a clinical decision support assistant helping a licensed clinician build a differential diagnosis.

Return ONLY a JSON array, most likely first, of at most 8 items:
[{"condition": "name", "likelihood": "high|moderate|low", "rationale": "one or two sentences"}]

Consider the patient context when given. Do not include treatment advice."#;

const RISK_PROMPT: &str = r#"You are a clinical decision support assistant. Summarize the risk scores below for a busy clinician in one short paragraph (at most 120 words).

Mention the highest risks first, what drives them, and missing data that limits the scores. Do not invent values. Plain text only, no markdown."#;

/// Encounter note in SOAP form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Differential {
    pub condition: String,
    pub likelihood: String,
    #[serde(default)]
    pub rationale: String,
}

/// Models answer either with the bare array or wrapped in an object
#[derive(Deserialize)]
#[serde(untagged)]
enum DifferentialReply {
    List(Vec<Differential>),
    Wrapped {
        #[serde(alias = "diagnoses")]
        differentials: Vec<Differential>,
    },
}

pub async fn soap_note(provider: &LlmProvider, transcript: &str) -> Result<SoapNote, AiError> {
    let reply = provider
        .complete(SCRIBE_PROMPT, &format!("Transcript:\n{}", transcript))
        .await?;
    parse_reply(&reply)
}

/// Differential diagnosis for the presenting symptoms
pub async fn differential_diagnosis(
    provider: &LlmProvider,
    symptoms: &str,
    context: Option<&str>,
    patient_summary: Option<&str>,
) -> Result<Vec<Differential>, AiError> {
    let mut message = format!("Presenting symptoms:\n{}\n", symptoms);
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        message.push_str(&format!("\nAdditional context:\n{}\n", context));
    }
    if let Some(summary) = patient_summary {
        message.push_str(&format!("\nPatient record:\n{}\n", summary));
    }

    let reply = provider.complete(DIAGNOSIS_PROMPT, &message).await?;
    Ok(match parse_reply::<DifferentialReply>(&reply)? {
        DifferentialReply::List(list) => list,
        DifferentialReply::Wrapped { differentials } => differentials,
    })
}

/// Plain-language narrative for computed risk scores
pub async fn risk_narrative(
    provider: &LlmProvider,
    scores: &JsonValue,
    patient_summary: &str,
) -> Result<String, AiError> {
    let message = format!(
        "Risk scores:\n{}\n\nPatient record:\n{}",
        serde_json::to_string_pretty(scores).unwrap_or_else(|_| scores.to_string()),
        patient_summary
    );
    let reply = provider.complete(RISK_PROMPT, &message).await?;
    Ok(reply.trim().to_string())
}

fn list_or_none(items: Vec<String>) -> String {
    if items.is_empty() {
        "none recorded".to_string()
    } else {
        items.join("; ")
    }
}

fn vital(label: &str, reading: Option<Reading>, unit: &str) -> Option<String> {
    reading.map(|r| format!("{label} {:.1}{unit}", r.value))
}

/// Compact, name-free text rendering of a patient for prompts
pub fn describe_patient(snapshot: &PatientSnapshot, today: NaiveDate) -> String {
    let patient = &snapshot.patient;
    let age = patient_age(patient, today)
        .map(|a| format!("{a} years old"))
        .unwrap_or_else(|| "age unknown".to_string());
    let gender = patient_gender(patient).unwrap_or("unknown sex");

    let conditions: Vec<String> = snapshot
        .conditions
        .iter()
        .filter_map(|c| c.get("code").and_then(concept_text))
        .collect();
    let medications: Vec<String> = snapshot.medications.iter().filter_map(medication_name).collect();
    let allergies: Vec<String> = snapshot
        .allergies
        .iter()
        .flat_map(allergy_substances)
        .collect();

    let vitals = latest_vitals(&snapshot.vital_observations);
    let vitals: Vec<String> = [
        vital("RR", vitals.respiratory_rate, "/min"),
        vital("SBP", vitals.systolic_bp, " mmHg"),
        vital("HR", vitals.heart_rate, "/min"),
        vital("Temp", vitals.temperature, " C"),
        vital("SpO2", vitals.spo2, "%"),
        vital("GCS", vitals.gcs, ""),
        vital("WBC", vitals.wbc, " x10^9/L"),
    ]
    .into_iter()
    .flatten()
    .collect();

    format!(
        "Patient: {gender}, {age}\nActive conditions: {}\nActive medications: {}\nAllergies: {}\nLatest vitals: {}",
        list_or_none(conditions),
        list_or_none(medications),
        list_or_none(allergies),
        list_or_none(vitals),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wrapped_differentials() {
        let reply = r#"```json
{"diagnoses": [{"condition": "Pneumonia", "likelihood": "high", "rationale": "Fever and cough"}]}
```"#;
        let parsed: DifferentialReply = parse_reply(reply).unwrap();
        let DifferentialReply::Wrapped { differentials } = parsed else {
            panic!("expected wrapped reply");
        };
        assert_eq!(differentials[0].condition, "Pneumonia");
    }

    #[test]
    fn describes_patient_without_identifiers() {
        let snapshot = PatientSnapshot {
            patient: json!({
                "resourceType": "Patient",
                "name": [{"family": "Doe", "given": ["Jane"]}],
                "gender": "female",
                "birthDate": "1950-06-01"
            }),
            conditions: vec![json!({"code": {"text": "Type 2 diabetes"}})],
            medications: vec![json!({"medicationCodeableConcept": {"text": "Metformin 500 MG"}})],
            allergies: vec![],
            vital_observations: vec![json!({
                "status": "final",
                "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
                "effectiveDateTime": "2024-01-01T10:00:00Z",
                "valueQuantity": {"value": 88}
            })],
        };
        let text = describe_patient(&snapshot, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(text.contains("female, 73 years old"));
        assert!(text.contains("Type 2 diabetes"));
        assert!(text.contains("Metformin 500 MG"));
        assert!(text.contains("Allergies: none recorded"));
        assert!(text.contains("HR 88.0/min"));
        assert!(!text.contains("Doe"));
    }
}
