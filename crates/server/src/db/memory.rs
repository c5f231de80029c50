use std::collections::HashMap;
use std::sync::Arc;

use emr_core::Ndc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{EhrConnection, MedicationCatalogItem};

/// Process-local store used when no database is configured
#[derive(Clone, Default)]
pub struct MemoryStore {
    connections: Arc<RwLock<HashMap<Uuid, EhrConnection>>>,
    catalog: Arc<RwLock<HashMap<Ndc, MedicationCatalogItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list_connections(&self) -> Vec<EhrConnection> {
        let mut all: Vec<_> = self.connections.read().await.values().cloned().collect();
        all.sort_by_key(|c| c.created_at);
        all
    }

    pub async fn get_connection(&self, id: Uuid) -> Option<EhrConnection> {
        self.connections.read().await.get(&id).cloned()
    }

    pub async fn save_connection(&self, connection: &EhrConnection) {
        self.connections
            .write()
            .await
            .insert(connection.id, connection.clone());
    }

    pub async fn delete_connection(&self, id: Uuid) -> bool {
        self.connections.write().await.remove(&id).is_some()
    }

    pub async fn search_catalog(&self, query: Option<&str>, limit: usize) -> Vec<MedicationCatalogItem> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let catalog = self.catalog.read().await;
        let mut items: Vec<_> = catalog
            .values()
            .filter(|item| query.is_none_or(|q| item.matches(q)))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.ndc.as_str().cmp(b.ndc.as_str()))
        });
        items.truncate(limit);
        items
    }

    pub async fn get_catalog_item(&self, ndc: &Ndc) -> Option<MedicationCatalogItem> {
        self.catalog.read().await.get(ndc).cloned()
    }

    pub async fn upsert_catalog_item(&self, item: &MedicationCatalogItem) -> bool {
        self.catalog
            .write()
            .await
            .insert(item.ndc.clone(), item.clone())
            .is_none()
    }

    pub async fn delete_catalog_item(&self, ndc: &Ndc) -> bool {
        self.catalog.write().await.remove(ndc).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogItemInput;

    fn item(ndc: &str, name: &str) -> MedicationCatalogItem {
        MedicationCatalogItem::from_input(
            ndc.parse().unwrap(),
            CatalogItemInput {
                name: name.into(),
                generic_name: None,
                drug_class: None,
                form: None,
                strength: None,
                route: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn catalog_upsert_reports_creation() {
        let store = MemoryStore::new();
        assert!(store.upsert_catalog_item(&item("00071-0155-23", "Lipitor")).await);
        assert!(!store.upsert_catalog_item(&item("00071-0155-23", "Lipitor 10 MG")).await);

        let found = store
            .get_catalog_item(&"00071015523".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(found.name, "Lipitor 10 MG");
    }

    #[tokio::test]
    async fn catalog_search_orders_and_limits() {
        let store = MemoryStore::new();
        store.upsert_catalog_item(&item("00002-1111-01", "warfarin")).await;
        store.upsert_catalog_item(&item("00002-2222-01", "Aspirin")).await;
        store.upsert_catalog_item(&item("00002-3333-01", "Atenolol")).await;

        let names: Vec<_> = store
            .search_catalog(None, 2)
            .await
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["Aspirin", "Atenolol"]);

        let hits = store.search_catalog(Some("WARF"), 10).await;
        assert_eq!(hits.len(), 1);
    }
}
