use deadpool_postgres::Pool;
use emr_core::Ndc;
use serde_json::Value as JsonValue;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{EhrConnection, MedicationCatalogItem};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ehr_connections (
    id          UUID PRIMARY KEY,
    data        JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS medication_catalog (
    ndc         TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    data        JSONB NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS medication_catalog_name_idx
    ON medication_catalog (lower(name));
"#;

/// Postgres-backed store; rows keep the full entity in a JSONB column
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

fn decode<T: serde::de::DeserializeOwned>(row: &Row) -> Result<T, AppError> {
    let data: JsonValue = row.get(0);
    Ok(serde_json::from_value(data)?)
}

/// Escape LIKE wildcards in user input
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn list_connections(&self) -> Result<Vec<EhrConnection>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT data FROM ehr_connections ORDER BY created_at", &[])
            .await?;
        rows.iter().map(decode).collect()
    }

    pub async fn get_connection(&self, id: Uuid) -> Result<Option<EhrConnection>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT data FROM ehr_connections WHERE id = $1", &[&id])
            .await?;
        row.as_ref().map(decode).transpose()
    }

    pub async fn save_connection(&self, connection: &EhrConnection) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let data = serde_json::to_value(connection)?;
        client
            .execute(
                "INSERT INTO ehr_connections (id, data, created_at, updated_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at",
                &[
                    &connection.id,
                    &data,
                    &connection.created_at,
                    &connection.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn delete_connection(&self, id: Uuid) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM ehr_connections WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    pub async fn search_catalog(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MedicationCatalogItem>, AppError> {
        let client = self.pool.get().await?;
        let limit = limit as i64;
        let rows = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let pattern = like_pattern(q);
                client
                    .query(
                        "SELECT data FROM medication_catalog
                         WHERE name ILIKE $1 OR data->>'genericName' ILIKE $1
                         ORDER BY lower(name), ndc LIMIT $2",
                        &[&pattern, &limit],
                    )
                    .await?
            }
            None => {
                client
                    .query(
                        "SELECT data FROM medication_catalog ORDER BY lower(name), ndc LIMIT $1",
                        &[&limit],
                    )
                    .await?
            }
        };
        rows.iter().map(decode).collect()
    }

    pub async fn get_catalog_item(&self, ndc: &Ndc) -> Result<Option<MedicationCatalogItem>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT data FROM medication_catalog WHERE ndc = $1",
                &[&ndc.as_str()],
            )
            .await?;
        row.as_ref().map(decode).transpose()
    }

    pub async fn upsert_catalog_item(&self, item: &MedicationCatalogItem) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let data = serde_json::to_value(item)?;
        // xmax is zero only for freshly inserted rows
        let row = client
            .query_one(
                "INSERT INTO medication_catalog (ndc, name, data, updated_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (ndc) DO UPDATE
                     SET name = EXCLUDED.name, data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
                 RETURNING (xmax = 0) AS inserted",
                &[&item.ndc.as_str(), &item.name, &data, &item.updated_at],
            )
            .await?;
        Ok(row.get(0))
    }

    pub async fn delete_catalog_item(&self, ndc: &Ndc) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM medication_catalog WHERE ndc = $1", &[&ndc.as_str()])
            .await?;
        Ok(deleted > 0)
    }
}
