//! Latest vital signs out of a list of FHIR Observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::extract::{codings, event_time};

pub const LOINC_RESPIRATORY_RATE: &str = "9279-1";
pub const LOINC_SYSTOLIC_BP: &str = "8480-6";
pub const LOINC_HEART_RATE: &str = "8867-4";
pub const LOINC_BODY_TEMPERATURE: &str = "8310-5";
pub const LOINC_GCS_TOTAL: &str = "9269-2";
pub const LOINC_WBC: &str = "6690-2";
pub const LOINC_SPO2: &[&str] = &["59408-5", "2708-6"];

/// A single measured value and when it was taken
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

/// Newest reading per vital sign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub respiratory_rate: Option<Reading>,
    pub systolic_bp: Option<Reading>,
    pub heart_rate: Option<Reading>,
    /// Degrees Celsius
    pub temperature: Option<Reading>,
    pub gcs: Option<Reading>,
    /// 10^9/L
    pub wbc: Option<Reading>,
    pub spo2: Option<Reading>,
}

fn is_usable(observation: &JsonValue) -> bool {
    !matches!(
        observation.get("status").and_then(|s| s.as_str()),
        Some("entered-in-error" | "cancelled")
    )
}

/// Keep the newer of two readings; on equal (or missing) times the first wins
fn keep_newest(slot: &mut Option<Reading>, candidate: Reading) {
    let newer = match slot.as_ref() {
        Some(current) => candidate.observed_at > current.observed_at,
        None => true,
    };
    if newer {
        *slot = Some(candidate);
    }
}

fn celsius(quantity: &JsonValue, value: f64) -> f64 {
    let unit = quantity
        .get("code")
        .or_else(|| quantity.get("unit"))
        .and_then(|u| u.as_str())
        .unwrap_or("");
    if unit == "[degF]" || unit.eq_ignore_ascii_case("degF") || unit.ends_with('F') {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    }
}

impl VitalSigns {
    /// Record one coded value (top-level Observation or a component)
    fn record(&mut self, code_holder: &JsonValue, observed_at: Option<DateTime<Utc>>) {
        let Some(quantity) = code_holder.get("valueQuantity") else {
            return;
        };
        let Some(value) = quantity.get("value").and_then(|v| v.as_f64()) else {
            return;
        };
        let code = code_holder.get("code").cloned().unwrap_or(JsonValue::Null);

        for coding in codings(&code) {
            let reading = Reading { value, observed_at };
            let slot = match coding.code.as_str() {
                LOINC_RESPIRATORY_RATE => &mut self.respiratory_rate,
                LOINC_SYSTOLIC_BP => &mut self.systolic_bp,
                LOINC_HEART_RATE => &mut self.heart_rate,
                LOINC_BODY_TEMPERATURE => {
                    let reading = Reading {
                        value: celsius(quantity, value),
                        observed_at,
                    };
                    keep_newest(&mut self.temperature, reading);
                    return;
                }
                LOINC_GCS_TOTAL => &mut self.gcs,
                LOINC_WBC => &mut self.wbc,
                c if LOINC_SPO2.contains(&c) => &mut self.spo2,
                _ => continue,
            };
            keep_newest(slot, reading);
            return;
        }
    }
}

/// Pick the newest value of each tracked vital sign.
///
/// Blood-pressure panels (85354-9) are read through their components.
/// Observations entered in error or cancelled are ignored.
pub fn latest_vitals(observations: &[JsonValue]) -> VitalSigns {
    let mut vitals = VitalSigns::default();
    for observation in observations.iter().filter(|o| is_usable(o)) {
        let observed_at = event_time(observation);
        vitals.record(observation, observed_at);
        if let Some(components) = observation.get("component").and_then(|c| c.as_array()) {
            for component in components {
                vitals.record(component, observed_at);
            }
        }
    }
    vitals
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obs(code: &str, value: f64, at: &str) -> JsonValue {
        json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": code}]},
            "effectiveDateTime": at,
            "valueQuantity": {"value": value}
        })
    }

    #[test]
    fn keeps_newest_value_regardless_of_order() {
        let a = obs(LOINC_RESPIRATORY_RATE, 18.0, "2024-01-01T08:00:00Z");
        let b = obs(LOINC_RESPIRATORY_RATE, 24.0, "2024-01-01T12:00:00Z");

        let forward = latest_vitals(&[a.clone(), b.clone()]);
        let backward = latest_vitals(&[b, a]);
        assert_eq!(forward.respiratory_rate.unwrap().value, 24.0);
        assert_eq!(forward, backward);
    }

    #[test]
    fn reads_blood_pressure_panel_components() {
        let panel = json!({
            "resourceType": "Observation",
            "code": {"coding": [{"code": "85354-9"}]},
            "effectiveDateTime": "2024-01-01T08:00:00Z",
            "component": [
                {"code": {"coding": [{"code": "8480-6"}]}, "valueQuantity": {"value": 95}},
                {"code": {"coding": [{"code": "8462-4"}]}, "valueQuantity": {"value": 60}}
            ]
        });
        let vitals = latest_vitals(&[panel]);
        assert_eq!(vitals.systolic_bp.unwrap().value, 95.0);
        assert!(vitals.heart_rate.is_none());
    }

    #[test]
    fn converts_fahrenheit_and_skips_entered_in_error() {
        let mut temp = obs(LOINC_BODY_TEMPERATURE, 101.3, "2024-01-01T08:00:00Z");
        temp["valueQuantity"]["code"] = json!("[degF]");
        let mut bad = obs(LOINC_HEART_RATE, 200.0, "2024-01-02T08:00:00Z");
        bad["status"] = json!("entered-in-error");

        let vitals = latest_vitals(&[temp, bad]);
        let celsius = vitals.temperature.unwrap().value;
        assert!((celsius - 38.5).abs() < 0.01);
        assert!(vitals.heart_rate.is_none());
    }
}
