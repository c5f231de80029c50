use chrono::{Duration, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{EhrConnection, OAuthToken};

/// Subset of `.well-known/smart-configuration` used for the launch
#[derive(Debug, Clone, Deserialize)]
pub struct SmartConfiguration {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    patient: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Fetch the SMART configuration published under the EHR's FHIR base URL
pub async fn discover(http: &reqwest::Client, fhir_base_url: &str) -> Result<SmartConfiguration, AppError> {
    let url = format!(
        "{}/.well-known/smart-configuration",
        fhir_base_url.trim_end_matches('/')
    );
    let response = http
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| AppError::BadGateway(format!("SMART discovery failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::BadGateway(format!(
            "SMART discovery at {} returned {}",
            url,
            response.status()
        )));
    }

    let config: SmartConfiguration = response
        .json()
        .await
        .map_err(|e| AppError::BadGateway(format!("Invalid SMART configuration: {}", e)))?;

    if !config.code_challenge_methods_supported.is_empty()
        && !config.code_challenge_methods_supported.iter().any(|m| m == "S256")
    {
        tracing::warn!(url = %url, "EHR does not advertise S256 PKCE support");
    }
    Ok(config)
}

/// Authorization URL the user agent is redirected to
pub fn authorization_url(
    config: &SmartConfiguration,
    connection: &EhrConnection,
    state: &str,
    code_challenge: &str,
) -> Result<String, AppError> {
    let mut url = Url::parse(&config.authorization_endpoint).map_err(|e| {
        AppError::BadGateway(format!("Invalid authorization endpoint: {}", e))
    })?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &connection.client_id)
        .append_pair("redirect_uri", &connection.redirect_uri)
        .append_pair("scope", &connection.scopes.join(" "))
        .append_pair("state", state)
        .append_pair("aud", &connection.fhir_base_url)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url.into())
}

/// Trade an authorization code for tokens.
///
/// Confidential clients authenticate with HTTP Basic; public clients send
/// `client_id` in the form.
pub async fn exchange_code(
    http: &reqwest::Client,
    connection: &EhrConnection,
    token_endpoint: &str,
    code: &str,
    code_verifier: &str,
) -> Result<OAuthToken, AppError> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", connection.redirect_uri.as_str()),
        ("code_verifier", code_verifier),
    ];
    let mut request = http.post(token_endpoint);
    match &connection.client_secret {
        Some(secret) => request = request.basic_auth(&connection.client_id, Some(secret)),
        None => form.push(("client_id", connection.client_id.as_str())),
    }

    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| AppError::BadGateway(format!("Token endpoint unreachable: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::BadGateway(format!("Failed to read token response: {}", e)))?;

    if !status.is_success() {
        let message = serde_json::from_str::<OAuthErrorResponse>(&body)
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {}", e.error, description),
                None => e.error,
            })
            .unwrap_or_else(|_| format!("token endpoint returned {}", status));
        return Err(AppError::BadGateway(format!("Token exchange failed: {}", message)));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| AppError::BadGateway(format!("Invalid token response: {}", e)))?;

    Ok(OAuthToken {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        token_type: token.token_type,
        expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        scope: token.scope,
        patient: token.patient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EhrVendor, NewEhrConnection};

    #[test]
    fn builds_authorization_url() {
        let connection = EhrConnection::from_request(
            NewEhrConnection {
                name: "Sandbox".into(),
                vendor: EhrVendor::Generic,
                fhir_base_url: "https://ehr.example/fhir".into(),
                client_id: "my app".into(),
                client_secret: None,
                scopes: None,
                redirect_uri: Some("https://gw.example/api/ehr/callback".into()),
            },
            "https://unused.example",
        )
        .unwrap();
        let config = SmartConfiguration {
            authorization_endpoint: "https://ehr.example/oauth/authorize".into(),
            token_endpoint: "https://ehr.example/oauth/token".into(),
            code_challenge_methods_supported: vec!["S256".into()],
        };

        let url = authorization_url(&config, &connection, "xyz", "challenge").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());

        assert!(url.starts_with("https://ehr.example/oauth/authorize?"));
        assert_eq!(get("client_id"), Some("my app"));
        assert_eq!(get("scope"), Some("openid fhirUser patient/*.read"));
        assert_eq!(get("aud"), Some("https://ehr.example/fhir"));
        assert_eq!(get("code_challenge_method"), Some("S256"));
        assert_eq!(get("state"), Some("xyz"));
    }

    #[test]
    fn reads_discovery_document() {
        let config: SmartConfiguration = serde_json::from_str(
            r#"{
                "authorization_endpoint": "https://ehr.example/oauth/authorize",
                "token_endpoint": "https://ehr.example/oauth/token",
                "capabilities": ["launch-standalone", "client-public"],
                "scopes_supported": ["openid", "fhirUser"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.token_endpoint, "https://ehr.example/oauth/token");
        assert!(config.code_challenge_methods_supported.is_empty());
    }
}
