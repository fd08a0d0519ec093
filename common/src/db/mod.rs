//! Database bootstrap, configuration and schema management

pub mod bootstrap;
pub mod config;
pub mod schema;

pub use bootstrap::{initialize, quote_identifier, Database};
pub use config::DbConfig;
pub use schema::{ensure_schema, missing_objects, MIGRATOR};
