//! Repository traits for the copy-trading schema
//!
//! Each trait covers one table. Every method issues a single statement;
//! there are no multi-statement transactions and no optimistic locking, so
//! concurrent field updates are last-writer-wins.
//!
//! Errors follow one contract across all backends:
//! - lookups, updates and deletes that match no row return `Error::NotFound`;
//! - inserts rejected by a unique constraint return `Error::Duplicate`;
//! - every other failure (check or foreign key violations included) is
//!   classified as `ErrorKind::Other`.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::decimal::Amount;
use common::error::Result;
use common::model::{Asset, CopyTradingRelationship, Order, Status, Trade, User, Wallet};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, returning it with its generated ID and creation time
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn get_user(&self, user_id: Uuid) -> Result<User>;

    async fn get_user_by_username(&self, username: &str) -> Result<User>;

    /// Delete a user; their wallets are kept with `user_id` cleared
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Insert a wallet, returning it with its generated ID
    async fn insert_wallet(&self, wallet: Wallet) -> Result<Wallet>;

    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet>;

    async fn get_wallet_by_address(&self, address: &str) -> Result<Wallet>;

    /// Set the USDC balance and stamp `updated_at`
    async fn update_wallet_balance(&self, wallet_id: Uuid, balance: Amount) -> Result<()>;

    /// Set or clear the API key and stamp `updated_at`. Only owned wallets
    /// may carry a key.
    async fn update_wallet_api_key(&self, wallet_id: Uuid, api_key: Option<&str>) -> Result<()>;

    /// Delete a wallet together with its orders, their trades and its
    /// copy-trading relationships
    async fn delete_wallet(&self, wallet_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn insert_asset(&self, asset: Asset) -> Result<Asset>;

    async fn get_asset(&self, asset_id: Uuid) -> Result<Asset>;

    async fn get_asset_by_symbol(&self, symbol: &str) -> Result<Asset>;

    /// Delete an asset. Rejected while any order or trade references it.
    async fn delete_asset(&self, asset_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert an order, returning it with its generated ID and creation time
    async fn insert_order(&self, order: Order) -> Result<Order>;

    async fn get_order(&self, order_id: Uuid) -> Result<Order>;

    async fn update_order_status(&self, order_id: Uuid, status: Status) -> Result<()>;

    /// Delete an order together with its trades
    async fn delete_order(&self, order_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Insert a trade; `executed_at` defaults to the insertion time when unset
    async fn insert_trade(&self, trade: Trade) -> Result<Trade>;

    async fn get_trade(&self, trade_id: Uuid) -> Result<Trade>;

    async fn delete_trade(&self, trade_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Insert a relationship; `start_date` defaults to the insertion time when unset
    async fn insert_relationship(
        &self,
        relationship: CopyTradingRelationship,
    ) -> Result<CopyTradingRelationship>;

    async fn get_relationship(&self, relationship_id: Uuid) -> Result<CopyTradingRelationship>;

    async fn get_relationship_by_pair(
        &self,
        lead_wallet_id: Uuid,
        follower_wallet_id: Uuid,
    ) -> Result<CopyTradingRelationship>;

    /// Close the validity window of a relationship
    async fn end_relationship(&self, relationship_id: Uuid, end_date: DateTime<Utc>) -> Result<()>;

    async fn delete_relationship(&self, relationship_id: Uuid) -> Result<()>;
}
