//! Repository layer for the copy-trading schema
//!
//! Each table gets a repository trait with a PostgreSQL implementation and
//! an in-memory implementation that enforces the same constraints. [`Store`]
//! bundles one of each behind a chosen [`Backend`].

pub mod repository;
pub mod store;

pub use repository::{
    AssetRepository, InMemoryStore, OrderRepository, PostgresStore, RelationshipRepository,
    TradeRepository, UserRepository, WalletRepository,
};
pub use store::{Backend, Store};
