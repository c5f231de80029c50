use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

/// Code text of an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeableText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A single issue reported by the FHIR server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,

    /// Kept as a string: servers emit codes outside the base value set.
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CodeableText>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// FHIR OperationOutcome resource, as returned by the upstream FHIR server
/// on failed interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

impl OperationOutcome {
    /// Try to read an OperationOutcome from an arbitrary upstream body
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if value.get("resourceType").and_then(|t| t.as_str()) != Some("OperationOutcome") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Human-readable message of the first issue.
    ///
    /// Prefers `diagnostics`, then `details.text`, then the issue code.
    pub fn message(&self) -> Option<String> {
        let issue = self.issue.first()?;
        issue
            .diagnostics
            .clone()
            .or_else(|| issue.details.as_ref().and_then(|d| d.text.clone()))
            .or_else(|| Some(issue.code.clone()))
    }
}
