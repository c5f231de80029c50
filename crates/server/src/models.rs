//! Locally stored administrative entities

use chrono::{DateTime, Utc};
use emr_core::Ndc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// External EHR vendor reachable through SMART-on-FHIR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EhrVendor {
    Epic,
    Eclinicalworks,
    Generic,
}

impl EhrVendor {
    /// Scopes requested when the connection does not specify its own
    pub fn default_scopes(&self) -> Vec<String> {
        let scopes: &[&str] = match self {
            EhrVendor::Epic => &[
                "openid",
                "fhirUser",
                "launch/patient",
                "patient/*.read",
                "offline_access",
            ],
            EhrVendor::Eclinicalworks => &["openid", "fhirUser", "launch/patient", "patient/*.read"],
            EhrVendor::Generic => &["openid", "fhirUser", "patient/*.read"],
        };
        scopes.iter().map(|s| s.to_string()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Error,
}

/// Tokens obtained from the EHR's token endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    /// Patient in context, when the EHR launched with one
    pub patient: Option<String>,
}

/// OAuth client registration for one external EHR, as stored.
///
/// Holds secrets; API responses use [`ConnectionSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EhrConnection {
    pub id: Uuid,
    pub name: String,
    pub vendor: EhrVendor,
    pub fhir_base_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub status: ConnectionStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    pub token: Option<OAuthToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for registering a connection
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEhrConnection {
    pub name: String,
    pub vendor: EhrVendor,
    pub fhir_base_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub redirect_uri: Option<String>,
}

fn require_http_url(field: &str, value: &str) -> Result<(), AppError> {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::BadRequest(format!("{field} must be an http(s) URL"))),
    }
}

impl EhrConnection {
    /// Validate a registration and build the stored connection.
    ///
    /// `default_redirect_uri` is used when the request does not name one.
    pub fn from_request(
        request: NewEhrConnection,
        default_redirect_uri: &str,
    ) -> Result<Self, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        if request.client_id.trim().is_empty() {
            return Err(AppError::BadRequest("clientId is required".into()));
        }
        let fhir_base_url = request.fhir_base_url.trim().trim_end_matches('/').to_string();
        require_http_url("fhirBaseUrl", &fhir_base_url)?;

        let redirect_uri = request
            .redirect_uri
            .unwrap_or_else(|| default_redirect_uri.to_string());
        require_http_url("redirectUri", &redirect_uri)?;

        let scopes = match request.scopes {
            Some(scopes) if !scopes.is_empty() => scopes,
            _ => request.vendor.default_scopes(),
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            vendor: request.vendor,
            fhir_base_url,
            client_id: request.client_id.trim().to_string(),
            client_secret: request.client_secret.filter(|s| !s.is_empty()),
            scopes,
            redirect_uri,
            status: ConnectionStatus::Pending,
            last_error: None,
            token: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Connection as returned by the API: no client secret, no tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub name: String,
    pub vendor: EhrVendor,
    pub fhir_base_url: String,
    pub client_id: String,
    pub has_client_secret: bool,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&EhrConnection> for ConnectionSummary {
    fn from(c: &EhrConnection) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            vendor: c.vendor,
            fhir_base_url: c.fhir_base_url.clone(),
            client_id: c.client_id.clone(),
            has_client_secret: c.client_secret.is_some(),
            scopes: c.scopes.clone(),
            redirect_uri: c.redirect_uri.clone(),
            status: c.status,
            last_error: c.last_error.clone(),
            patient: c.token.as_ref().and_then(|t| t.patient.clone()),
            token_expires_at: c.token.as_ref().and_then(|t| t.expires_at),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Formulary item of the local medication catalog, keyed by NDC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationCatalogItem {
    pub ndc: Ndc,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `PUT /api/medications/catalog/{ndc}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemInput {
    pub name: String,
    pub generic_name: Option<String>,
    pub drug_class: Option<String>,
    pub form: Option<String>,
    pub strength: Option<String>,
    pub route: Option<String>,
}

impl MedicationCatalogItem {
    pub fn from_input(ndc: Ndc, input: CatalogItemInput) -> Result<Self, AppError> {
        if input.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        Ok(Self {
            ndc,
            name: input.name.trim().to_string(),
            generic_name: input.generic_name,
            drug_class: input.drug_class,
            form: input.form,
            strength: input.strength,
            route: input.route,
            updated_at: Utc::now(),
        })
    }

    /// Case-insensitive substring match on name or generic name
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self
                .generic_name
                .as_ref()
                .is_some_and(|g| g.to_lowercase().contains(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewEhrConnection {
        NewEhrConnection {
            name: "Epic sandbox".into(),
            vendor: EhrVendor::Epic,
            fhir_base_url: "https://fhir.epic.com/api/FHIR/R4/".into(),
            client_id: "client".into(),
            client_secret: Some("secret".into()),
            scopes: None,
            redirect_uri: None,
        }
    }

    #[test]
    fn fills_defaults_on_registration() {
        let conn = EhrConnection::from_request(request(), "http://localhost:8080/api/ehr/callback")
            .unwrap();
        assert_eq!(conn.fhir_base_url, "https://fhir.epic.com/api/FHIR/R4");
        assert_eq!(conn.redirect_uri, "http://localhost:8080/api/ehr/callback");
        assert!(conn.scopes.contains(&"offline_access".to_string()));
        assert_eq!(conn.status, ConnectionStatus::Pending);
    }

    #[test]
    fn rejects_bad_urls() {
        let mut bad = request();
        bad.fhir_base_url = "ftp://example.org".into();
        assert!(EhrConnection::from_request(bad, "http://localhost/cb").is_err());

        let mut bad = request();
        bad.redirect_uri = Some("not a url".into());
        assert!(EhrConnection::from_request(bad, "http://localhost/cb").is_err());
    }

    #[test]
    fn summary_hides_secrets() {
        let conn = EhrConnection::from_request(request(), "http://localhost/cb").unwrap();
        let json = serde_json::to_value(ConnectionSummary::from(&conn)).unwrap();
        assert_eq!(json["hasClientSecret"], true);
        assert!(json.get("clientSecret").is_none());
        assert!(json.get("token").is_none());
    }

    #[test]
    fn catalog_matches_name_or_generic() {
        let item = MedicationCatalogItem::from_input(
            "00071-0155-23".parse().unwrap(),
            CatalogItemInput {
                name: "Lipitor 10 MG".into(),
                generic_name: Some("Atorvastatin".into()),
                drug_class: None,
                form: None,
                strength: None,
                route: None,
            },
        )
        .unwrap();
        assert!(item.matches("lipitor"));
        assert!(item.matches("ATORVA"));
        assert!(!item.matches("simva"));
    }
}
