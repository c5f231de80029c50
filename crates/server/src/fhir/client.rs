//! HTTP client for the upstream FHIR server (Aidbox)

use axum::http::StatusCode;
use emr_core::{Bundle, OperationOutcome, ResourceType};
use reqwest::RequestBuilder;
use serde_json::Value as JsonValue;

use crate::error::AppError;

const FHIR_JSON: &str = "application/fhir+json";

/// Client for the upstream FHIR REST API
#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl FhirClient {
    /// Create a client for `base_url`, authenticating with HTTP Basic when
    /// both client id and secret are given
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: client_id.zip(client_secret),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, FHIR_JSON);
        match &self.credentials {
            Some((id, secret)) => builder.basic_auth(id, Some(secret)),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body.
    ///
    /// Failure statuses become `AppError::Upstream` with the same status and
    /// the OperationOutcome message when the server sent one.
    async fn send(&self, builder: RequestBuilder) -> Result<Option<JsonValue>, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("FHIR server unreachable: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::BadGateway(format!("Failed to read FHIR response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<JsonValue>(&bytes)
                .ok()
                .as_ref()
                .and_then(OperationOutcome::from_value)
                .and_then(|o| o.message())
                .unwrap_or_else(|| {
                    format!(
                        "FHIR server returned {}",
                        status.canonical_reason().unwrap_or(status.as_str())
                    )
                });
            tracing::debug!(status = %status.as_u16(), message = %message, "Upstream FHIR error");
            return Err(AppError::Upstream {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AppError::BadGateway(format!("Invalid JSON from FHIR server: {}", e)))
    }

    async fn send_resource(&self, builder: RequestBuilder) -> Result<JsonValue, AppError> {
        self.send(builder)
            .await?
            .ok_or_else(|| AppError::BadGateway("Empty response from FHIR server".to_string()))
    }

    /// `GET [base]/{type}?params` returning the searchset Bundle
    pub async fn search(
        &self,
        resource_type: ResourceType,
        params: &[(String, String)],
    ) -> Result<Bundle, AppError> {
        let body = self
            .send_resource(
                self.request(reqwest::Method::GET, resource_type.as_str())
                    .query(params),
            )
            .await?;
        Bundle::from_value(body)
            .map_err(|e| AppError::BadGateway(format!("Invalid Bundle from FHIR server: {}", e)))
    }

    /// `GET [base]/{type}/{id}`
    pub async fn read(&self, resource_type: ResourceType, id: &str) -> Result<JsonValue, AppError> {
        self.send_resource(self.request(
            reqwest::Method::GET,
            &format!("{}/{}", resource_type, id),
        ))
        .await
    }

    /// `POST [base]/{type}`
    pub async fn create(
        &self,
        resource_type: ResourceType,
        body: &JsonValue,
    ) -> Result<JsonValue, AppError> {
        self.send_resource(
            self.request(reqwest::Method::POST, resource_type.as_str())
                .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
                .body(serde_json::to_vec(body)?),
        )
        .await
    }

    /// `PUT [base]/{type}/{id}`
    pub async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        body: &JsonValue,
    ) -> Result<JsonValue, AppError> {
        self.send_resource(
            self.request(reqwest::Method::PUT, &format!("{}/{}", resource_type, id))
                .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
                .body(serde_json::to_vec(body)?),
        )
        .await
    }

    /// `DELETE [base]/{type}/{id}`
    pub async fn delete(&self, resource_type: ResourceType, id: &str) -> Result<(), AppError> {
        self.send(self.request(
            reqwest::Method::DELETE,
            &format!("{}/{}", resource_type, id),
        ))
        .await
        .map(|_| ())
    }

    /// `GET [base]/metadata`, used by the health check
    pub async fn ping(&self) -> Result<(), AppError> {
        self.send(self.request(reqwest::Method::GET, "metadata"))
            .await
            .map(|_| ())
    }
}
