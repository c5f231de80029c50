//! Local medication catalog keyed by NDC

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use emr_core::{Envelope, Ndc};
use serde::Deserialize;

use crate::error::{ApiJson, ApiQuery, AppError};
use crate::models::{CatalogItemInput, MedicationCatalogItem};
use crate::state::AppState;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize, Default)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

fn ndc(raw: &str) -> Result<Ndc, AppError> {
    Ok(raw.parse::<Ndc>()?)
}

/// GET /api/medications/catalog
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state.store.search_catalog(query.q.as_deref(), limit).await?;
    let total = items.len() as u32;
    Ok(Json(Envelope::with_total(items, Some(total))))
}

/// GET /api/medications/catalog/{ndc}
pub async fn get(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ndc = ndc(&raw)?;
    let item = state
        .store
        .get_catalog_item(&ndc)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("NDC {} not in catalog", ndc)))?;
    Ok(Json(Envelope::ok(item)))
}

/// PUT /api/medications/catalog/{ndc} - 201 when created, 200 when replaced
pub async fn upsert(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    ApiJson(input): ApiJson<CatalogItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let item = MedicationCatalogItem::from_input(ndc(&raw)?, input)?;
    let created = state.store.upsert_catalog_item(&item).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(Envelope::ok(item))))
}

/// DELETE /api/medications/catalog/{ndc}
pub async fn delete(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ndc = ndc(&raw)?;
    if !state.store.delete_catalog_item(&ndc).await? {
        return Err(AppError::NotFound(format!("NDC {} not in catalog", ndc)));
    }
    Ok(Json(Envelope::ok(serde_json::Value::Null)))
}
