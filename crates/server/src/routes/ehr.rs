//! EHR connections and the SMART-on-FHIR authorization flow

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use emr_core::Envelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiJson, ApiQuery, AppError};
use crate::models::{ConnectionStatus, ConnectionSummary, EhrConnection, NewEhrConnection};
use crate::smart::{self, PendingAuthorization, Pkce};
use crate::state::AppState;

fn connection_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid connection id: {}", raw)))
}

async fn load(state: &AppState, id: Uuid) -> Result<EhrConnection, AppError> {
    state
        .store
        .get_connection(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("EHR connection {} not found", id)))
}

/// GET /api/ehr/connections
pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let connections: Vec<ConnectionSummary> = state
        .store
        .list_connections()
        .await?
        .iter()
        .map(ConnectionSummary::from)
        .collect();
    let total = connections.len() as u32;
    Ok(Json(Envelope::with_total(connections, Some(total))))
}

/// POST /api/ehr/connections
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewEhrConnection>,
) -> Result<impl IntoResponse, AppError> {
    let connection = EhrConnection::from_request(request, &state.default_redirect_uri)?;
    state.store.save_connection(&connection).await?;
    tracing::info!(
        connection_id = %connection.id,
        vendor = ?connection.vendor,
        "Registered EHR connection"
    );
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(ConnectionSummary::from(&connection))),
    ))
}

/// GET /api/ehr/connections/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let connection = load(&state, connection_id(&id)?).await?;
    Ok(Json(Envelope::ok(ConnectionSummary::from(&connection))))
}

/// DELETE /api/ehr/connections/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = connection_id(&id)?;
    if !state.store.delete_connection(id).await? {
        return Err(AppError::NotFound(format!("EHR connection {} not found", id)));
    }
    Ok(Json(Envelope::ok(serde_json::Value::Null)))
}

#[derive(Debug, Deserialize, Default)]
pub struct AuthorizeParams {
    /// `json` returns the URL instead of redirecting
    pub mode: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationStart {
    pub authorization_url: String,
}

/// GET /api/ehr/connections/{id}/authorize
pub async fn authorize(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<AuthorizeParams>,
) -> Result<Response, AppError> {
    let connection = load(&state, connection_id(&id)?).await?;
    let smart_config = smart::discover(&state.http, &connection.fhir_base_url).await?;

    let pkce = Pkce::generate();
    let oauth_state = smart::random_state();
    let url = smart::authorization_url(&smart_config, &connection, &oauth_state, &pkce.challenge)?;

    state.pending.insert(
        oauth_state,
        PendingAuthorization {
            connection_id: connection.id,
            code_verifier: pkce.verifier,
            token_endpoint: smart_config.token_endpoint,
            created_at: Instant::now(),
        },
    );
    tracing::info!(connection_id = %connection.id, "Started SMART authorization");

    if params.mode.as_deref() == Some("json") {
        return Ok(Json(Envelope::ok(AuthorizationStart {
            authorization_url: url,
        }))
        .into_response());
    }
    Ok(Redirect::temporary(&url).into_response())
}

#[derive(Debug, Deserialize, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

async fn mark_failed(state: &AppState, mut connection: EhrConnection, message: &str) -> Result<(), AppError> {
    connection.status = ConnectionStatus::Error;
    connection.last_error = Some(message.to_string());
    connection.updated_at = Utc::now();
    state.store.save_connection(&connection).await
}

/// GET /api/ehr/callback - redirect target of the EHR's authorize endpoint
pub async fn callback(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CallbackParams>,
) -> Result<impl IntoResponse, AppError> {
    let oauth_state = params
        .state
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;
    let pending = state
        .pending
        .take(oauth_state)
        .ok_or_else(|| AppError::BadRequest("Unknown or expired authorization state".to_string()))?;
    let connection = load(&state, pending.connection_id).await?;

    if let Some(error) = params.error {
        let message = match params.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        tracing::warn!(connection_id = %connection.id, error = %message, "EHR denied authorization");
        mark_failed(&state, connection, &message).await?;
        return Err(AppError::BadRequest(format!("Authorization failed: {}", message)));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing code parameter".to_string()))?;

    let token = match smart::exchange_code(
        &state.http,
        &connection,
        &pending.token_endpoint,
        code,
        &pending.code_verifier,
    )
    .await
    {
        Ok(token) => token,
        Err(err) => {
            mark_failed(&state, connection, &err.to_string()).await?;
            return Err(err);
        }
    };

    let mut connection = connection;
    connection.token = Some(token);
    connection.status = ConnectionStatus::Connected;
    connection.last_error = None;
    connection.updated_at = Utc::now();
    state.store.save_connection(&connection).await?;
    tracing::info!(connection_id = %connection.id, "EHR connection authorized");

    Ok(Json(Envelope::ok(ConnectionSummary::from(&connection))))
}
