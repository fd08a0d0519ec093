//! PostgreSQL repositories

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use common::db::Database;
use common::decimal::Amount;
use common::error::{Error, Result};
use common::model::{Asset, CopyTradingRelationship, Order, Status, Trade, User, Wallet};

use super::{
    AssetRepository, OrderRepository, RelationshipRepository, TradeRepository, UserRepository,
    WalletRepository,
};

const USER_COLUMNS: &str = "user_id, username, email, created_at";

const WALLET_COLUMNS: &str = "wallet_id, user_id, hyperliquid_address, hyperliquid_api_key, \
                              balance_usdc, is_owned, updated_at";

const ASSET_COLUMNS: &str = "asset_id, symbol, base_currency, quote_currency, is_perpetual";

const ORDER_COLUMNS: &str = "order_id, wallet_id, asset_id, order_type, side, quantity, price, \
                             leverage, status, created_at, hyperliquid_order_id, is_copied";

const TRADE_COLUMNS: &str = "trade_id, order_id, asset_id, executed_price, executed_quantity, \
                             fee, executed_at";

const RELATIONSHIP_COLUMNS: &str = "relationship_id, lead_wallet_id, follower_wallet_id, \
                                    start_date, end_date, profit_share_percentage";

/// Repositories backed by a shared PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

/// Classify a failed write using the SQLSTATE the server reported.
/// Errors without a structured code stay unclassified.
fn map_write_error(entity: &'static str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            debug!("Insert of {} rejected by {}", entity, constraint);
            return Error::duplicate(entity, constraint);
        }
        if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
            if let Some(constraint) = db_err.constraint() {
                warn!("Write to {} rejected by {}: {}", entity, constraint, db_err.message());
                return Error::constraint(constraint, db_err.message());
            }
        }
    }
    Error::Database(err)
}

/// Turn a zero-row UPDATE or DELETE into NotFound
fn expect_one_row(result: PgQueryResult, entity: &'static str, key: Uuid) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(Error::not_found(entity, key));
    }
    Ok(())
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        debug!("Inserting user {}", user.username);

        let sql = format!(
            "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING {}",
            USER_COLUMNS
        );
        let inserted = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("user", e))?;

        Ok(inserted)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        debug!("Getting user {}", user_id);

        let sql = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("user", user_id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User> {
        debug!("Getting user by username {}", username);

        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("user", username))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        debug!("Deleting user {}", user_id);

        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("user", e))?;
        expect_one_row(result, "user", user_id)
    }
}

#[async_trait]
impl WalletRepository for PostgresStore {
    async fn insert_wallet(&self, wallet: Wallet) -> Result<Wallet> {
        debug!("Inserting wallet {}", wallet.hyperliquid_address);

        let sql = format!(
            "INSERT INTO wallets (
                user_id, hyperliquid_address, hyperliquid_api_key, balance_usdc, is_owned
             ) VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            WALLET_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Wallet>(&sql)
            .bind(wallet.user_id)
            .bind(&wallet.hyperliquid_address)
            .bind(&wallet.hyperliquid_api_key)
            .bind(wallet.balance_usdc)
            .bind(wallet.is_owned)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("wallet", e))?;

        Ok(inserted)
    }

    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        debug!("Getting wallet {}", wallet_id);

        let sql = format!("SELECT {} FROM wallets WHERE wallet_id = $1", WALLET_COLUMNS);
        let row = sqlx::query_as::<_, Wallet>(&sql)
            .bind(wallet_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("wallet", wallet_id))
    }

    async fn get_wallet_by_address(&self, address: &str) -> Result<Wallet> {
        debug!("Getting wallet by address {}", address);

        let sql = format!(
            "SELECT {} FROM wallets WHERE hyperliquid_address = $1",
            WALLET_COLUMNS
        );
        let row = sqlx::query_as::<_, Wallet>(&sql)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("wallet", address))
    }

    async fn update_wallet_balance(&self, wallet_id: Uuid, balance: Amount) -> Result<()> {
        debug!("Updating balance of wallet {} to {}", wallet_id, balance);

        let result = sqlx::query(
            "UPDATE wallets SET balance_usdc = $1, updated_at = NOW() WHERE wallet_id = $2",
        )
        .bind(balance)
        .bind(wallet_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("wallet", e))?;
        expect_one_row(result, "wallet", wallet_id)
    }

    async fn update_wallet_api_key(&self, wallet_id: Uuid, api_key: Option<&str>) -> Result<()> {
        debug!("Updating API key of wallet {}", wallet_id);

        let result = sqlx::query(
            "UPDATE wallets SET hyperliquid_api_key = $1, updated_at = NOW() WHERE wallet_id = $2",
        )
        .bind(api_key)
        .bind(wallet_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("wallet", e))?;
        expect_one_row(result, "wallet", wallet_id)
    }

    async fn delete_wallet(&self, wallet_id: Uuid) -> Result<()> {
        debug!("Deleting wallet {}", wallet_id);

        let result = sqlx::query("DELETE FROM wallets WHERE wallet_id = $1")
            .bind(wallet_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("wallet", e))?;
        expect_one_row(result, "wallet", wallet_id)
    }
}

#[async_trait]
impl AssetRepository for PostgresStore {
    async fn insert_asset(&self, asset: Asset) -> Result<Asset> {
        debug!("Inserting asset {}", asset.symbol);

        let sql = format!(
            "INSERT INTO assets (symbol, base_currency, quote_currency, is_perpetual)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            ASSET_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Asset>(&sql)
            .bind(&asset.symbol)
            .bind(&asset.base_currency)
            .bind(&asset.quote_currency)
            .bind(asset.is_perpetual)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("asset", e))?;

        Ok(inserted)
    }

    async fn get_asset(&self, asset_id: Uuid) -> Result<Asset> {
        debug!("Getting asset {}", asset_id);

        let sql = format!("SELECT {} FROM assets WHERE asset_id = $1", ASSET_COLUMNS);
        let row = sqlx::query_as::<_, Asset>(&sql)
            .bind(asset_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("asset", asset_id))
    }

    async fn get_asset_by_symbol(&self, symbol: &str) -> Result<Asset> {
        debug!("Getting asset by symbol {}", symbol);

        let sql = format!("SELECT {} FROM assets WHERE symbol = $1", ASSET_COLUMNS);
        let row = sqlx::query_as::<_, Asset>(&sql)
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("asset", symbol))
    }

    async fn delete_asset(&self, asset_id: Uuid) -> Result<()> {
        debug!("Deleting asset {}", asset_id);

        let result = sqlx::query("DELETE FROM assets WHERE asset_id = $1")
            .bind(asset_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("asset", e))?;
        expect_one_row(result, "asset", asset_id)
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        debug!(
            "Inserting {} {} order for wallet {}",
            order.order_type, order.side, order.wallet_id
        );

        let sql = format!(
            "INSERT INTO orders (
                wallet_id, asset_id, order_type, side, quantity, price, leverage,
                status, hyperliquid_order_id, is_copied
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            ORDER_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Order>(&sql)
            .bind(order.wallet_id)
            .bind(order.asset_id)
            .bind(order.order_type)
            .bind(order.side)
            .bind(order.quantity)
            .bind(order.price)
            .bind(order.leverage)
            .bind(order.status)
            .bind(&order.hyperliquid_order_id)
            .bind(order.is_copied)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("order", e))?;

        Ok(inserted)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        debug!("Getting order {}", order_id);

        let sql = format!("SELECT {} FROM orders WHERE order_id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("order", order_id))
    }

    async fn update_order_status(&self, order_id: Uuid, status: Status) -> Result<()> {
        debug!("Updating status of order {} to {}", order_id, status);

        let result = sqlx::query("UPDATE orders SET status = $1 WHERE order_id = $2")
            .bind(status)
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("order", e))?;
        expect_one_row(result, "order", order_id)
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<()> {
        debug!("Deleting order {}", order_id);

        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("order", e))?;
        expect_one_row(result, "order", order_id)
    }
}

#[async_trait]
impl TradeRepository for PostgresStore {
    async fn insert_trade(&self, trade: Trade) -> Result<Trade> {
        debug!("Inserting trade for order {}", trade.order_id);

        let sql = format!(
            "INSERT INTO trades (
                order_id, asset_id, executed_price, executed_quantity, fee, executed_at
             ) VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
             RETURNING {}",
            TRADE_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Trade>(&sql)
            .bind(trade.order_id)
            .bind(trade.asset_id)
            .bind(trade.executed_price)
            .bind(trade.executed_quantity)
            .bind(trade.fee)
            .bind(trade.executed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("trade", e))?;

        Ok(inserted)
    }

    async fn get_trade(&self, trade_id: Uuid) -> Result<Trade> {
        debug!("Getting trade {}", trade_id);

        let sql = format!("SELECT {} FROM trades WHERE trade_id = $1", TRADE_COLUMNS);
        let row = sqlx::query_as::<_, Trade>(&sql)
            .bind(trade_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("trade", trade_id))
    }

    async fn delete_trade(&self, trade_id: Uuid) -> Result<()> {
        debug!("Deleting trade {}", trade_id);

        let result = sqlx::query("DELETE FROM trades WHERE trade_id = $1")
            .bind(trade_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("trade", e))?;
        expect_one_row(result, "trade", trade_id)
    }
}

#[async_trait]
impl RelationshipRepository for PostgresStore {
    async fn insert_relationship(
        &self,
        relationship: CopyTradingRelationship,
    ) -> Result<CopyTradingRelationship> {
        debug!(
            "Inserting relationship {} -> {}",
            relationship.lead_wallet_id, relationship.follower_wallet_id
        );

        let sql = format!(
            "INSERT INTO copy_trading_relationships (
                lead_wallet_id, follower_wallet_id, start_date, end_date, profit_share_percentage
             ) VALUES ($1, $2, COALESCE($3, NOW()), $4, $5)
             RETURNING {}",
            RELATIONSHIP_COLUMNS
        );
        let inserted = sqlx::query_as::<_, CopyTradingRelationship>(&sql)
            .bind(relationship.lead_wallet_id)
            .bind(relationship.follower_wallet_id)
            .bind(relationship.start_date)
            .bind(relationship.end_date)
            .bind(relationship.profit_share_percentage)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("relationship", e))?;

        Ok(inserted)
    }

    async fn get_relationship(&self, relationship_id: Uuid) -> Result<CopyTradingRelationship> {
        debug!("Getting relationship {}", relationship_id);

        let sql = format!(
            "SELECT {} FROM copy_trading_relationships WHERE relationship_id = $1",
            RELATIONSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, CopyTradingRelationship>(&sql)
            .bind(relationship_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::not_found("relationship", relationship_id))
    }

    async fn get_relationship_by_pair(
        &self,
        lead_wallet_id: Uuid,
        follower_wallet_id: Uuid,
    ) -> Result<CopyTradingRelationship> {
        debug!("Getting relationship {} -> {}", lead_wallet_id, follower_wallet_id);

        let sql = format!(
            "SELECT {} FROM copy_trading_relationships
             WHERE lead_wallet_id = $1 AND follower_wallet_id = $2",
            RELATIONSHIP_COLUMNS
        );
        let row = sqlx::query_as::<_, CopyTradingRelationship>(&sql)
            .bind(lead_wallet_id)
            .bind(follower_wallet_id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| {
            Error::not_found(
                "relationship",
                format!("{} -> {}", lead_wallet_id, follower_wallet_id),
            )
        })
    }

    async fn end_relationship(&self, relationship_id: Uuid, end_date: DateTime<Utc>) -> Result<()> {
        debug!("Ending relationship {} at {}", relationship_id, end_date);

        let result = sqlx::query(
            "UPDATE copy_trading_relationships SET end_date = $1 WHERE relationship_id = $2",
        )
        .bind(end_date)
        .bind(relationship_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error("relationship", e))?;
        expect_one_row(result, "relationship", relationship_id)
    }

    async fn delete_relationship(&self, relationship_id: Uuid) -> Result<()> {
        debug!("Deleting relationship {}", relationship_id);

        let result =
            sqlx::query("DELETE FROM copy_trading_relationships WHERE relationship_id = $1")
                .bind(relationship_id)
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error("relationship", e))?;
        expect_one_row(result, "relationship", relationship_id)
    }
}
