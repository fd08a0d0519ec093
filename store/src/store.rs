//! Store facade bundling one repository per table

use std::sync::Arc;

use tracing::info;

use common::db::{self, Database, DbConfig};
use common::error::Result;

use crate::repository::{
    AssetRepository, InMemoryStore, OrderRepository, PostgresStore, RelationshipRepository,
    TradeRepository, UserRepository, WalletRepository,
};

/// Storage backend
#[derive(Debug)]
pub enum Backend {
    /// In-memory tables
    InMemory,
    /// PostgreSQL through an initialized database handle
    Postgres(Database),
}

/// Repositories sharing one backend
///
/// Cloning is cheap; clones share the same underlying storage.
#[derive(Clone)]
pub struct Store {
    users: Arc<dyn UserRepository>,
    wallets: Arc<dyn WalletRepository>,
    assets: Arc<dyn AssetRepository>,
    orders: Arc<dyn OrderRepository>,
    trades: Arc<dyn TradeRepository>,
    relationships: Arc<dyn RelationshipRepository>,
}

impl Store {
    /// Create a store on the given backend
    pub fn new(backend: Backend) -> Self {
        match backend {
            Backend::InMemory => Self::from_shared(Arc::new(InMemoryStore::new())),
            Backend::Postgres(database) => {
                Self::from_shared(Arc::new(PostgresStore::new(&database)))
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Backend::InMemory)
    }

    pub fn postgres(database: Database) -> Self {
        Self::new(Backend::Postgres(database))
    }

    /// Provision the configured database and open a store on it
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let database = db::initialize(config).await?;
        info!("Store connected to {}", config.database);
        Ok(Self::postgres(database))
    }

    fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: UserRepository
            + WalletRepository
            + AssetRepository
            + OrderRepository
            + TradeRepository
            + RelationshipRepository
            + 'static,
    {
        Self {
            users: repo.clone(),
            wallets: repo.clone(),
            assets: repo.clone(),
            orders: repo.clone(),
            trades: repo.clone(),
            relationships: repo,
        }
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn wallets(&self) -> &dyn WalletRepository {
        self.wallets.as_ref()
    }

    pub fn assets(&self) -> &dyn AssetRepository {
        self.assets.as_ref()
    }

    pub fn orders(&self) -> &dyn OrderRepository {
        self.orders.as_ref()
    }

    pub fn trades(&self) -> &dyn TradeRepository {
        self.trades.as_ref()
    }

    pub fn relationships(&self) -> &dyn RelationshipRepository {
        self.relationships.as_ref()
    }
}
