//! Registry of FHIR resource types the gateway proxies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::EmrError;

macro_rules! resource_types {
    ($($variant:ident),+ $(,)?) => {
        /// FHIR resource types exposed under `/api/fhir/{type}`
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ResourceType {
            $($variant),+
        }

        impl ResourceType {
            /// Every proxied type, in declaration order
            pub const ALL: &'static [ResourceType] = &[$(ResourceType::$variant),+];

            /// FHIR name of the type, as used in URLs and `resourceType`
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ResourceType::$variant => stringify!($variant)),+
                }
            }
        }

        impl FromStr for ResourceType {
            type Err = EmrError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ResourceType::$variant),)+
                    other => Err(EmrError::UnsupportedResource(other.to_string())),
                }
            }
        }
    };
}

resource_types!(
    Patient,
    Practitioner,
    Organization,
    Encounter,
    Observation,
    Condition,
    AllergyIntolerance,
    MedicationRequest,
    MedicationStatement,
    Procedure,
    Immunization,
    DiagnosticReport,
    DocumentReference,
    CarePlan,
    Appointment,
    ServiceRequest,
    Coverage,
    FamilyMemberHistory,
    Goal,
    Task,
    Communication,
);

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `id` is a valid FHIR logical id (`[A-Za-z0-9\-\.]{1,64}`).
///
/// Ids are interpolated into upstream URLs, so anything else is rejected
/// before a request is made.
pub fn is_valid_id(id: &str) -> bool {
    (1..=64).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        && !id.bytes().all(|b| b == b'.')
}

/// Prepare a client-supplied body for a create or update of `resource_type`.
///
/// The body must be a JSON object. A missing `resourceType` is filled in; a
/// different one is rejected. For updates, `id` is forced to the path id and
/// a conflicting body id is rejected.
pub fn prepare_body(
    resource_type: ResourceType,
    id: Option<&str>,
    mut body: JsonValue,
) -> Result<JsonValue, EmrError> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| EmrError::Invalid("Request body must be a JSON object".to_string()))?;

    let found = obj
        .get("resourceType")
        .map(|v| v.as_str().map(str::to_owned));
    match found {
        None => {
            obj.insert(
                "resourceType".to_string(),
                JsonValue::String(resource_type.as_str().to_string()),
            );
        }
        Some(Some(t)) if t == resource_type.as_str() => {}
        Some(other) => {
            return Err(EmrError::Invalid(format!(
                "Expected resourceType '{}', got '{}'",
                resource_type,
                other.as_deref().unwrap_or("<non-string>")
            )));
        }
    }

    if let Some(id) = id {
        let body_id = obj.get("id").and_then(|v| v.as_str()).map(str::to_owned);
        match body_id {
            Some(body_id) if body_id != id => {
                return Err(EmrError::Invalid(format!(
                    "Body id '{}' does not match path id '{}'",
                    body_id, id
                )));
            }
            _ => {
                obj.insert("id".to_string(), JsonValue::String(id.to_string()));
            }
        }
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_types_case_sensitively() {
        assert_eq!("Patient".parse::<ResourceType>().unwrap(), ResourceType::Patient);
        assert_eq!(
            "AllergyIntolerance".parse::<ResourceType>().unwrap(),
            ResourceType::AllergyIntolerance
        );
        assert!("patient".parse::<ResourceType>().is_err());
        assert!("Binary".parse::<ResourceType>().is_err());
    }

    #[test]
    fn every_type_round_trips_through_its_name() {
        for t in ResourceType::ALL {
            assert_eq!(t.as_str().parse::<ResourceType>().unwrap(), *t);
        }
    }

    #[test]
    fn validates_logical_ids() {
        assert!(is_valid_id("pt-123.a"));
        assert!(is_valid_id(&"a".repeat(64)));
        assert!(!is_valid_id(&"a".repeat(65)));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../Patient"));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id(".."));
    }

    #[test]
    fn fills_missing_resource_type() {
        let body = prepare_body(ResourceType::Condition, None, json!({"code": {"text": "x"}}))
            .unwrap();
        assert_eq!(body["resourceType"], "Condition");
    }

    #[test]
    fn rejects_mismatched_resource_type() {
        let err = prepare_body(ResourceType::Patient, None, json!({"resourceType": "Observation"}))
            .unwrap_err();
        assert!(matches!(err, EmrError::Invalid(_)));
    }

    #[test]
    fn update_sets_and_checks_id() {
        let body = prepare_body(ResourceType::Patient, Some("p1"), json!({})).unwrap();
        assert_eq!(body["id"], "p1");

        assert!(prepare_body(ResourceType::Patient, Some("p1"), json!({"id": "p2"})).is_err());
        assert!(prepare_body(ResourceType::Patient, None, json!([1, 2])).is_err());
    }
}
