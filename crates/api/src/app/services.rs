//! Service wiring: one store shared by every application service.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use karatbook_infra::{
    DataStore, DocumentService, InMemoryDataStore, InventoryService, LedgerService, PartyService,
    PostgresDataStore, Settings, StoreKind,
};

#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn DataStore>,
    pub ledger: LedgerService,
    pub documents: DocumentService,
    pub inventory: InventoryService,
    pub parties: PartyService,
}

impl AppServices {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            ledger: LedgerService::new(store.clone()),
            documents: DocumentService::new(store.clone()),
            inventory: InventoryService::new(store.clone()),
            parties: PartyService::new(store.clone()),
            store,
        }
    }

    /// In-memory services for tests and local development.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDataStore::new()))
    }
}

/// Build services for the configured store, migrating Postgres first.
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    match settings.store {
        StoreKind::Memory => {
            info!("using in-memory store");
            Ok(AppServices::in_memory())
        }
        StoreKind::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .context("database_url is not set")?;
            let store = PostgresDataStore::connect(url, settings.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store
                .run_migrations()
                .await
                .context("failed to apply migrations")?;
            info!("using postgres store");
            Ok(AppServices::new(Arc::new(store)))
        }
    }
}
