//! Helpers for reading fields out of FHIR JSON resources.
//!
//! Resources are kept as `serde_json::Value` end to end; these helpers cover
//! the handful of shapes the CDS engines need (CodeableConcept, Quantity,
//! dates, statuses).

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde_json::Value as JsonValue;

/// A single Coding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coding {
    pub system: Option<String>,
    pub code: String,
    pub display: Option<String>,
}

/// All codings of a CodeableConcept
pub fn codings(concept: &JsonValue) -> Vec<Coding> {
    concept
        .get("coding")
        .and_then(|c| c.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| {
                    Some(Coding {
                        system: c.get("system").and_then(|s| s.as_str()).map(String::from),
                        code: c.get("code")?.as_str()?.to_string(),
                        display: c.get("display").and_then(|s| s.as_str()).map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the CodeableConcept carries `code` in any coding
pub fn has_code(concept: &JsonValue, code: &str) -> bool {
    codings(concept).iter().any(|c| c.code == code)
}

/// Display text of a CodeableConcept: `text`, else the first coding display,
/// else the first code.
pub fn concept_text(concept: &JsonValue) -> Option<String> {
    if let Some(text) = concept.get("text").and_then(|t| t.as_str()) {
        return Some(text.to_string());
    }
    let codings = codings(concept);
    codings
        .iter()
        .find_map(|c| c.display.clone())
        .or_else(|| codings.first().map(|c| c.code.clone()))
}

/// Parse a FHIR `date`/`dateTime`/`instant`.
///
/// Partial dates (`YYYY`, `YYYY-MM`) resolve to the first day of the period,
/// date-only values to midnight UTC.
pub fn parse_fhir_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = parse_fhir_date(s)?;
    Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

/// Parse the date part of a FHIR `date` (or the leading date of a `dateTime`)
pub fn parse_fhir_date(s: &str) -> Option<NaiveDate> {
    let s = s.get(..10).unwrap_or(s);
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let mut parts = s.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Clinically relevant time of an event resource.
///
/// Looks at `effectiveDateTime`, `effectivePeriod.start`, `occurrenceDateTime`,
/// `performedDateTime`, `performedPeriod.start`, `issued`, `authoredOn`,
/// `recordedDate` and `meta.lastUpdated`, in that order.
pub fn event_time(resource: &JsonValue) -> Option<DateTime<Utc>> {
    const POINTERS: &[&str] = &[
        "/effectiveDateTime",
        "/effectivePeriod/start",
        "/occurrenceDateTime",
        "/performedDateTime",
        "/performedPeriod/start",
        "/issued",
        "/authoredOn",
        "/recordedDate",
        "/meta/lastUpdated",
    ];
    POINTERS
        .iter()
        .filter_map(|p| resource.pointer(p).and_then(|v| v.as_str()))
        .find_map(parse_fhir_datetime)
}

/// Numeric value of a `valueQuantity`
pub fn quantity_value(value_holder: &JsonValue) -> Option<f64> {
    value_holder
        .pointer("/valueQuantity/value")
        .and_then(|v| v.as_f64())
}

/// `Patient.gender`
pub fn patient_gender(patient: &JsonValue) -> Option<&str> {
    patient.get("gender").and_then(|g| g.as_str())
}

/// Age in whole years on `on`, from `Patient.birthDate`
pub fn patient_age(patient: &JsonValue, on: NaiveDate) -> Option<i32> {
    let birth = patient
        .get("birthDate")
        .and_then(|b| b.as_str())
        .and_then(parse_fhir_date)?;
    Some(age_on(birth, on))
}

/// Whole years between `birth` and `on`
pub fn age_on(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Age in whole months on `on`
pub fn age_in_months(birth: NaiveDate, on: NaiveDate) -> i32 {
    let mut months = (on.year() - birth.year()) * 12 + on.month() as i32 - birth.month() as i32;
    if on.day() < birth.day() {
        months -= 1;
    }
    months
}

fn status_code(resource: &JsonValue, field: &str) -> Option<String> {
    let status = resource.get(field)?;
    match status.as_str() {
        Some(s) => Some(s.to_string()),
        None => codings(status).first().map(|c| c.code.clone()),
    }
}

/// `Condition.clinicalStatus` is active, recurrence or relapse.
///
/// A condition without a clinical status counts as active, unless it was
/// entered in error.
pub fn is_active_condition(condition: &JsonValue) -> bool {
    if status_code(condition, "verificationStatus").as_deref() == Some("entered-in-error") {
        return false;
    }
    match status_code(condition, "clinicalStatus").as_deref() {
        None => true,
        Some(code) => matches!(code, "active" | "recurrence" | "relapse"),
    }
}

/// `MedicationRequest.status` is active (or missing)
pub fn is_active_medication(request: &JsonValue) -> bool {
    match status_code(request, "status").as_deref() {
        None => true,
        Some(code) => matches!(code, "active" | "on-hold" | "draft"),
    }
}

/// Display name of the medication of a MedicationRequest or MedicationStatement
pub fn medication_name(request: &JsonValue) -> Option<String> {
    if let Some(concept) = request.get("medicationCodeableConcept") {
        if let Some(text) = concept_text(concept) {
            return Some(text);
        }
    }
    request
        .pointer("/medicationReference/display")
        .and_then(|d| d.as_str())
        .map(String::from)
}

/// Substance names of an AllergyIntolerance (`code` plus reaction substances)
pub fn allergy_substances(allergy: &JsonValue) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(text) = allergy.get("code").and_then(concept_text) {
        out.push(text);
    }
    if let Some(reactions) = allergy.get("reaction").and_then(|r| r.as_array()) {
        for reaction in reactions {
            if let Some(text) = reaction.get("substance").and_then(concept_text) {
                if !out.contains(&text) {
                    out.push(text);
                }
            }
        }
    }
    out
}

/// Codes plus free text of a Condition, lowercased, for keyword matching
pub fn condition_terms(condition: &JsonValue) -> (Vec<String>, String) {
    let code = condition.get("code").cloned().unwrap_or(JsonValue::Null);
    let codes = codings(&code)
        .into_iter()
        .map(|c| c.code.to_uppercase())
        .collect();
    let text = concept_text(&code).unwrap_or_default().to_lowercase();
    (codes, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fhir_dates_of_every_precision() {
        let full = parse_fhir_datetime("2024-03-05T10:15:00+02:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2024-03-05T08:15:00+00:00");
        assert_eq!(
            parse_fhir_datetime("2024-03-05").unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            parse_fhir_date("2024-03").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            parse_fhir_date("1990").unwrap(),
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
        );
        assert!(parse_fhir_datetime("yesterday").is_none());
    }

    #[test]
    fn computes_age_around_birthday() {
        let patient = json!({"birthDate": "1960-06-15"});
        let before = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(patient_age(&patient, before), Some(63));
        assert_eq!(patient_age(&patient, on), Some(64));
        assert_eq!(
            age_in_months(
                NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
                NaiveDate::from_ymd_opt(2024, 7, 19).unwrap()
            ),
            5
        );
    }

    #[test]
    fn concept_text_falls_back_to_display_then_code() {
        assert_eq!(concept_text(&json!({"text": "Asthma"})).as_deref(), Some("Asthma"));
        assert_eq!(
            concept_text(&json!({"coding": [{"code": "J45", "display": "Asthma, unspecified"}]}))
                .as_deref(),
            Some("Asthma, unspecified")
        );
        assert_eq!(
            concept_text(&json!({"coding": [{"code": "J45"}]})).as_deref(),
            Some("J45")
        );
    }

    #[test]
    fn condition_status_rules() {
        let active = json!({"clinicalStatus": {"coding": [{"code": "active"}]}});
        let resolved = json!({"clinicalStatus": {"coding": [{"code": "resolved"}]}});
        let error = json!({"verificationStatus": {"coding": [{"code": "entered-in-error"}]}});
        assert!(is_active_condition(&active));
        assert!(!is_active_condition(&resolved));
        assert!(!is_active_condition(&error));
        assert!(is_active_condition(&json!({})));
    }

    #[test]
    fn event_time_prefers_effective() {
        let obs = json!({
            "effectiveDateTime": "2024-01-02T00:00:00Z",
            "issued": "2024-01-05T00:00:00Z"
        });
        assert_eq!(event_time(&obs).unwrap().to_rfc3339(), "2024-01-02T00:00:00+00:00");
        let proc = json!({"performedPeriod": {"start": "2020-05-01"}});
        assert_eq!(
            event_time(&proc).unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
        );
    }

    #[test]
    fn reads_medication_and_allergy_names() {
        let med = json!({"medicationCodeableConcept": {"coding": [{"display": "Warfarin 5 MG", "code": "855332"}]}});
        assert_eq!(medication_name(&med).as_deref(), Some("Warfarin 5 MG"));
        let by_ref = json!({"medicationReference": {"display": "Aspirin"}});
        assert_eq!(medication_name(&by_ref).as_deref(), Some("Aspirin"));

        let allergy = json!({
            "code": {"text": "Penicillin"},
            "reaction": [{"substance": {"text": "Amoxicillin"}}, {"substance": {"text": "Penicillin"}}]
        });
        assert_eq!(allergy_substances(&allergy), vec!["Penicillin", "Amoxicillin"]);
    }
}
