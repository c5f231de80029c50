mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use emr_core::Ndc;
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{EhrConnection, MedicationCatalogItem};

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// Local persistence for EHR connections and the medication catalog
#[derive(Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    /// Postgres when `DATABASE_URL` is set (tables created on connect),
    /// in-memory otherwise
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            return Ok(Store::Memory(MemoryStore::new()));
        };
        let pool = create_pool(url)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create database pool: {}", e)))?;
        let store = Store::Postgres(PgStore::new(pool));
        store.migrate().await?;
        Ok(store)
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        match self {
            Store::Postgres(s) => s.ping().await,
            Store::Memory(_) => Ok(()),
        }
    }

    /// Create tables if missing
    pub async fn migrate(&self) -> Result<(), AppError> {
        match self {
            Store::Postgres(s) => s.migrate().await,
            Store::Memory(_) => Ok(()),
        }
    }

    pub async fn list_connections(&self) -> Result<Vec<EhrConnection>, AppError> {
        match self {
            Store::Postgres(s) => s.list_connections().await,
            Store::Memory(s) => Ok(s.list_connections().await),
        }
    }

    pub async fn get_connection(&self, id: Uuid) -> Result<Option<EhrConnection>, AppError> {
        match self {
            Store::Postgres(s) => s.get_connection(id).await,
            Store::Memory(s) => Ok(s.get_connection(id).await),
        }
    }

    /// Insert or replace a connection
    pub async fn save_connection(&self, connection: &EhrConnection) -> Result<(), AppError> {
        match self {
            Store::Postgres(s) => s.save_connection(connection).await,
            Store::Memory(s) => {
                s.save_connection(connection).await;
                Ok(())
            }
        }
    }

    /// Returns false when nothing was deleted
    pub async fn delete_connection(&self, id: Uuid) -> Result<bool, AppError> {
        match self {
            Store::Postgres(s) => s.delete_connection(id).await,
            Store::Memory(s) => Ok(s.delete_connection(id).await),
        }
    }

    /// Items ordered by name, filtered by an optional name query
    pub async fn search_catalog(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MedicationCatalogItem>, AppError> {
        match self {
            Store::Postgres(s) => s.search_catalog(query, limit).await,
            Store::Memory(s) => Ok(s.search_catalog(query, limit).await),
        }
    }

    pub async fn get_catalog_item(&self, ndc: &Ndc) -> Result<Option<MedicationCatalogItem>, AppError> {
        match self {
            Store::Postgres(s) => s.get_catalog_item(ndc).await,
            Store::Memory(s) => Ok(s.get_catalog_item(ndc).await),
        }
    }

    /// Insert or replace an item; returns true when it did not exist before
    pub async fn upsert_catalog_item(&self, item: &MedicationCatalogItem) -> Result<bool, AppError> {
        match self {
            Store::Postgres(s) => s.upsert_catalog_item(item).await,
            Store::Memory(s) => Ok(s.upsert_catalog_item(item).await),
        }
    }

    pub async fn delete_catalog_item(&self, ndc: &Ndc) -> Result<bool, AppError> {
        match self {
            Store::Postgres(s) => s.delete_catalog_item(ndc).await,
            Store::Memory(s) => Ok(s.delete_catalog_item(ndc).await),
        }
    }
}
