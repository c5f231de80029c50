use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// FHIR Bundle types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    History,
    Collection,
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
}

/// FHIR Bundle resource (simplified for search responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

/// Navigation link within a Bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// Single entry of a Bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<JsonValue>,
}

impl Bundle {
    /// Parse a Bundle out of an upstream JSON body
    pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Consume the bundle, returning the contained resources in entry order.
    ///
    /// Entries without a resource (e.g. `OperationOutcome`-only search
    /// entries that were stripped upstream) are skipped.
    pub fn into_resources(self) -> Vec<JsonValue> {
        self.entry.into_iter().filter_map(|e| e.resource).collect()
    }

    /// Resources of the given `resourceType` only.
    ///
    /// Searchsets may carry `_include`d resources or outcome entries
    /// next to the matches.
    pub fn resources_of(&self, resource_type: &str) -> Vec<&JsonValue> {
        self.entry
            .iter()
            .filter_map(|e| e.resource.as_ref())
            .filter(|r| r.get("resourceType").and_then(|t| t.as_str()) == Some(resource_type))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_searchset_entries() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 2,
            "entry": [
                {"fullUrl": "Patient/a", "resource": {"resourceType": "Patient", "id": "a"}},
                {"resource": {"resourceType": "Patient", "id": "b"}},
                {"fullUrl": "Organization/x"}
            ]
        }))
        .unwrap();

        assert_eq!(bundle.total, Some(2));
        assert_eq!(bundle.bundle_type, BundleType::Searchset);
        let ids: Vec<_> = bundle
            .into_resources()
            .into_iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn filters_included_resources() {
        let bundle = Bundle::from_value(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {"resource": {"resourceType": "MedicationRequest", "id": "m1"}},
                {"resource": {"resourceType": "Medication", "id": "med"}}
            ]
        }))
        .unwrap();

        assert_eq!(bundle.resources_of("MedicationRequest").len(), 1);
        assert_eq!(bundle.total, None);
    }

    #[test]
    fn transaction_response_is_kebab_case() {
        let value = serde_json::to_value(BundleType::TransactionResponse).unwrap();
        assert_eq!(value, "transaction-response");
    }
}
