use std::sync::Arc;
use std::time::Duration;

use crate::ai::LlmProvider;
use crate::audit::AuditLog;
use crate::config::Config;
use crate::db::Store;
use crate::fhir::FhirClient;
use crate::smart::PendingAuthorizations;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub fhir: FhirClient,
    pub store: Store,
    pub llm: Option<LlmProvider>,
    /// Client for calls to external EHRs
    pub http: reqwest::Client,
    pub audit: Arc<AuditLog>,
    pub pending: Arc<PendingAuthorizations>,
    /// Redirect URI given to EHRs when a connection does not name one
    pub default_redirect_uri: String,
}

impl AppState {
    pub fn new(config: &Config, store: Store) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        let fhir = FhirClient::new(
            http.clone(),
            &config.aidbox_url,
            config.aidbox_client_id.clone(),
            config.aidbox_client_secret.clone(),
        );

        Self {
            fhir,
            store,
            llm: LlmProvider::from_config(config, http.clone()),
            http,
            audit: Arc::new(AuditLog::new(config.audit_capacity)),
            pending: Arc::new(PendingAuthorizations::default()),
            default_redirect_uri: format!("{}/api/ehr/callback", config.public_base_url),
        }
    }
}
