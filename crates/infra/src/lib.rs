//! Infrastructure layer: storage, application services, config.
//!
//! Domain crates stay free of IO; everything here talks to a [`DataStore`].

pub mod config;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod parties;
pub mod records;
pub mod reset;
pub mod stock;
pub mod store;

mod integration_tests;

pub use config::{LogFormat, Settings, StoreKind};
pub use documents::{DocumentService, PostedDocument};
pub use error::{ServiceError, ServiceResult};
pub use ledger::LedgerService;
pub use parties::PartyService;
pub use records::DocumentRows;
pub use reset::{ResetError, ResetReport, reset_transactional_data};
pub use stock::InventoryService;
pub use store::{DataStore, InMemoryDataStore, PostgresDataStore, StoreError, Table};
