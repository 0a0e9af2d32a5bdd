//! # Stockroom
//!
//! Record keeping for a chemical inventory: CRUD over the `chemicals`
//! table and an append-only movement history in `inventory_logs`, served
//! over HTTP on the `may` coroutine runtime with `may_postgres`.

pub mod chemicals;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod http;
pub mod inventory_logs;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod pool;
pub mod query;
pub mod schema;
pub mod transaction;

pub use chemicals::{Chemical, ChemicalChanges, ChemicalStore, NewChemical};
pub use config::AppConfig;
pub use connection::connect;
pub use error::{DbError, StoreError};
pub use executor::PgExecutor;
pub use http::InventoryService;
pub use inventory_logs::{ActionType, InventoryLog, InventoryLogStore, NewInventoryLog};
pub use pool::PgPool;
pub use schema::ensure_schema;
pub use transaction::Transaction;
