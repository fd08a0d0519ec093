//! In-memory repositories
//!
//! Holds every table behind one lock so that cascading deletes touch all
//! affected tables atomically. Constraint checks, defaults and numeric
//! rounding follow the PostgreSQL schema, and violations are reported with
//! the constraint names PostgreSQL would use, so callers see the same error
//! kinds from either backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;
use uuid::Uuid;

use common::db::schema::{constraints, limits};
use common::decimal::precision::{self, Numeric};
use common::decimal::{Amount, Decimal};
use common::error::{Error, Result};
use common::model::order::{MAX_LEVERAGE, MIN_LEVERAGE};
use common::model::relationship::{MAX_PROFIT_SHARE, MIN_PROFIT_SHARE};
use common::model::{Asset, CopyTradingRelationship, Order, Status, Trade, User, Wallet};

use super::{
    AssetRepository, OrderRepository, RelationshipRepository, TradeRepository, UserRepository,
    WalletRepository,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    wallets: HashMap<Uuid, Wallet>,
    assets: HashMap<Uuid, Asset>,
    orders: HashMap<Uuid, Order>,
    trades: HashMap<Uuid, Trade>,
    relationships: HashMap<Uuid, CopyTradingRelationship>,
}

impl Tables {
    /// Remove orders and their trades for which `pred` holds
    fn cascade_orders(&mut self, pred: impl Fn(&Order) -> bool) -> usize {
        let doomed: Vec<Uuid> = self
            .orders
            .values()
            .filter(|o| pred(o))
            .map(|o| o.order_id)
            .collect();
        for order_id in &doomed {
            self.orders.remove(order_id);
        }
        self.trades.retain(|_, t| !doomed.contains(&t.order_id));
        doomed.len()
    }
}

/// Repositories backed by process memory
///
/// Useful for tests and for running without a database server. Data is lost
/// when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
    }
}

/// Current time at the microsecond resolution PostgreSQL stores
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn check_length(column: &str, value: &str, limit: usize) -> Result<()> {
    if value.chars().count() > limit {
        return Err(Error::InvalidInput(format!(
            "value too long for {} (character varying({}))",
            column, limit
        )));
    }
    Ok(())
}

/// Round `value` to the column scale, rejecting values that overflow it
fn fit_numeric(column: &str, value: Decimal, shape: Numeric) -> Result<Decimal> {
    if !shape.fits(value) {
        return Err(Error::InvalidInput(format!(
            "numeric field overflow for {} (precision {}, scale {})",
            column, shape.precision, shape.scale
        )));
    }
    Ok(shape.round(value))
}

fn check_violation(table: &str, constraint: &str) -> Error {
    Error::constraint(
        constraint,
        format!(
            "new row for relation \"{}\" violates check constraint \"{}\"",
            table, constraint
        ),
    )
}

fn missing_reference(table: &str, constraint: &str) -> Error {
    Error::constraint(
        constraint,
        format!(
            "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
            table, constraint
        ),
    )
}

fn still_referenced(table: &str, constraint: &str, referencing: &str) -> Error {
    Error::constraint(
        constraint,
        format!(
            "update or delete on table \"{}\" violates foreign key constraint \"{}\" on table \"{}\"",
            table, constraint, referencing
        ),
    )
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, mut user: User) -> Result<User> {
        debug!("Inserting user {}", user.username);

        check_length("users.username", &user.username, limits::USERNAME)?;
        check_length("users.email", &user.email, limits::EMAIL)?;

        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(Error::duplicate("user", constraints::USERS_USERNAME_KEY));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(Error::duplicate("user", constraints::USERS_EMAIL_KEY));
        }

        user.user_id = Uuid::new_v4();
        user.created_at = Some(now());
        tables.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        debug!("Getting user {}", user_id);

        let tables = self.lock()?;
        tables
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::not_found("user", user_id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User> {
        debug!("Getting user by username {}", username);

        let tables = self.lock()?;
        tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| Error::not_found("user", username))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        debug!("Deleting user {}", user_id);

        let mut tables = self.lock()?;
        if tables.users.remove(&user_id).is_none() {
            return Err(Error::not_found("user", user_id));
        }
        for wallet in tables.wallets.values_mut() {
            if wallet.user_id == Some(user_id) {
                wallet.user_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for InMemoryStore {
    async fn insert_wallet(&self, mut wallet: Wallet) -> Result<Wallet> {
        debug!("Inserting wallet {}", wallet.hyperliquid_address);

        check_length(
            "wallets.hyperliquid_address",
            &wallet.hyperliquid_address,
            limits::ADDRESS,
        )?;
        if let Some(key) = &wallet.hyperliquid_api_key {
            check_length("wallets.hyperliquid_api_key", key, limits::API_KEY)?;
        }
        wallet.balance_usdc =
            fit_numeric("wallets.balance_usdc", wallet.balance_usdc, precision::USDC)?;

        if !wallet.is_owned && wallet.hyperliquid_api_key.is_some() {
            return Err(check_violation("wallets", constraints::CHK_API_KEY_OWNED));
        }

        let mut tables = self.lock()?;
        if tables
            .wallets
            .values()
            .any(|w| w.hyperliquid_address == wallet.hyperliquid_address)
        {
            return Err(Error::duplicate("wallet", constraints::WALLETS_ADDRESS_KEY));
        }
        if let Some(user_id) = wallet.user_id {
            if !tables.users.contains_key(&user_id) {
                return Err(missing_reference("wallets", constraints::WALLETS_USER_FKEY));
            }
        }

        wallet.wallet_id = Uuid::new_v4();
        wallet.updated_at = None;
        tables.wallets.insert(wallet.wallet_id, wallet.clone());
        Ok(wallet)
    }

    async fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet> {
        debug!("Getting wallet {}", wallet_id);

        let tables = self.lock()?;
        tables
            .wallets
            .get(&wallet_id)
            .cloned()
            .ok_or_else(|| Error::not_found("wallet", wallet_id))
    }

    async fn get_wallet_by_address(&self, address: &str) -> Result<Wallet> {
        debug!("Getting wallet by address {}", address);

        let tables = self.lock()?;
        tables
            .wallets
            .values()
            .find(|w| w.hyperliquid_address == address)
            .cloned()
            .ok_or_else(|| Error::not_found("wallet", address))
    }

    async fn update_wallet_balance(&self, wallet_id: Uuid, balance: Amount) -> Result<()> {
        debug!("Updating balance of wallet {} to {}", wallet_id, balance);

        let mut tables = self.lock()?;
        let wallet = tables
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| Error::not_found("wallet", wallet_id))?;

        wallet.balance_usdc = fit_numeric("wallets.balance_usdc", balance, precision::USDC)?;
        wallet.updated_at = Some(now());
        Ok(())
    }

    async fn update_wallet_api_key(&self, wallet_id: Uuid, api_key: Option<&str>) -> Result<()> {
        debug!("Updating API key of wallet {}", wallet_id);

        let mut tables = self.lock()?;
        let wallet = tables
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| Error::not_found("wallet", wallet_id))?;

        if let Some(key) = api_key {
            check_length("wallets.hyperliquid_api_key", key, limits::API_KEY)?;
            if !wallet.is_owned {
                return Err(check_violation("wallets", constraints::CHK_API_KEY_OWNED));
            }
        }

        wallet.hyperliquid_api_key = api_key.map(str::to_string);
        wallet.updated_at = Some(now());
        Ok(())
    }

    async fn delete_wallet(&self, wallet_id: Uuid) -> Result<()> {
        debug!("Deleting wallet {}", wallet_id);

        let mut tables = self.lock()?;
        if tables.wallets.remove(&wallet_id).is_none() {
            return Err(Error::not_found("wallet", wallet_id));
        }

        let orders = tables.cascade_orders(|o| o.wallet_id == wallet_id);
        tables
            .relationships
            .retain(|_, r| r.lead_wallet_id != wallet_id && r.follower_wallet_id != wallet_id);
        debug!("Wallet {} deleted with {} orders", wallet_id, orders);
        Ok(())
    }
}

#[async_trait]
impl AssetRepository for InMemoryStore {
    async fn insert_asset(&self, mut asset: Asset) -> Result<Asset> {
        debug!("Inserting asset {}", asset.symbol);

        check_length("assets.symbol", &asset.symbol, limits::SYMBOL)?;
        check_length("assets.base_currency", &asset.base_currency, limits::CURRENCY)?;
        check_length("assets.quote_currency", &asset.quote_currency, limits::CURRENCY)?;

        let mut tables = self.lock()?;
        if tables.assets.values().any(|a| a.symbol == asset.symbol) {
            return Err(Error::duplicate("asset", constraints::ASSETS_SYMBOL_KEY));
        }

        asset.asset_id = Uuid::new_v4();
        tables.assets.insert(asset.asset_id, asset.clone());
        Ok(asset)
    }

    async fn get_asset(&self, asset_id: Uuid) -> Result<Asset> {
        debug!("Getting asset {}", asset_id);

        let tables = self.lock()?;
        tables
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| Error::not_found("asset", asset_id))
    }

    async fn get_asset_by_symbol(&self, symbol: &str) -> Result<Asset> {
        debug!("Getting asset by symbol {}", symbol);

        let tables = self.lock()?;
        tables
            .assets
            .values()
            .find(|a| a.symbol == symbol)
            .cloned()
            .ok_or_else(|| Error::not_found("asset", symbol))
    }

    async fn delete_asset(&self, asset_id: Uuid) -> Result<()> {
        debug!("Deleting asset {}", asset_id);

        let mut tables = self.lock()?;
        if !tables.assets.contains_key(&asset_id) {
            return Err(Error::not_found("asset", asset_id));
        }
        if tables.orders.values().any(|o| o.asset_id == asset_id) {
            return Err(still_referenced(
                "assets",
                constraints::ORDERS_ASSET_FKEY,
                "orders",
            ));
        }
        if tables.trades.values().any(|t| t.asset_id == asset_id) {
            return Err(still_referenced(
                "assets",
                constraints::TRADES_ASSET_FKEY,
                "trades",
            ));
        }

        tables.assets.remove(&asset_id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, mut order: Order) -> Result<Order> {
        debug!(
            "Inserting {} {} order for wallet {}",
            order.order_type, order.side, order.wallet_id
        );

        order.quantity = fit_numeric("orders.quantity", order.quantity, precision::QUANTITY)?;
        order.price = order
            .price
            .map(|p| fit_numeric("orders.price", p, precision::USDC))
            .transpose()?;
        order.leverage = fit_numeric("orders.leverage", order.leverage, precision::RATIO)?;
        if let Some(external_id) = &order.hyperliquid_order_id {
            check_length(
                "orders.hyperliquid_order_id",
                external_id,
                limits::EXTERNAL_ORDER_ID,
            )?;
        }

        // Checks run in constraint-name order, as PostgreSQL evaluates them
        if order.is_market() && order.price.is_some() {
            return Err(check_violation("orders", constraints::CHK_PRICE_ORDER_TYPE));
        }
        if order.leverage < MIN_LEVERAGE || order.leverage > MAX_LEVERAGE {
            return Err(check_violation("orders", constraints::ORDERS_LEVERAGE_CHECK));
        }

        let mut tables = self.lock()?;
        if !tables.wallets.contains_key(&order.wallet_id) {
            return Err(missing_reference("orders", constraints::ORDERS_WALLET_FKEY));
        }
        if !tables.assets.contains_key(&order.asset_id) {
            return Err(missing_reference("orders", constraints::ORDERS_ASSET_FKEY));
        }

        order.order_id = Uuid::new_v4();
        order.created_at = Some(now());
        tables.orders.insert(order.order_id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Order> {
        debug!("Getting order {}", order_id);

        let tables = self.lock()?;
        tables
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| Error::not_found("order", order_id))
    }

    async fn update_order_status(&self, order_id: Uuid, status: Status) -> Result<()> {
        debug!("Updating status of order {} to {}", order_id, status);

        let mut tables = self.lock()?;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| Error::not_found("order", order_id))?;
        order.status = status;
        Ok(())
    }

    async fn delete_order(&self, order_id: Uuid) -> Result<()> {
        debug!("Deleting order {}", order_id);

        let mut tables = self.lock()?;
        if tables.cascade_orders(|o| o.order_id == order_id) == 0 {
            return Err(Error::not_found("order", order_id));
        }
        Ok(())
    }
}

#[async_trait]
impl TradeRepository for InMemoryStore {
    async fn insert_trade(&self, mut trade: Trade) -> Result<Trade> {
        debug!("Inserting trade for order {}", trade.order_id);

        trade.executed_price =
            fit_numeric("trades.executed_price", trade.executed_price, precision::USDC)?;
        trade.executed_quantity = fit_numeric(
            "trades.executed_quantity",
            trade.executed_quantity,
            precision::QUANTITY,
        )?;
        trade.fee = fit_numeric("trades.fee", trade.fee, precision::QUANTITY)?;

        let mut tables = self.lock()?;
        if !tables.orders.contains_key(&trade.order_id) {
            return Err(missing_reference("trades", constraints::TRADES_ORDER_FKEY));
        }
        if !tables.assets.contains_key(&trade.asset_id) {
            return Err(missing_reference("trades", constraints::TRADES_ASSET_FKEY));
        }

        trade.trade_id = Uuid::new_v4();
        trade.executed_at = Some(trade.executed_at.map_or_else(now, |at| at.trunc_subsecs(6)));
        tables.trades.insert(trade.trade_id, trade.clone());
        Ok(trade)
    }

    async fn get_trade(&self, trade_id: Uuid) -> Result<Trade> {
        debug!("Getting trade {}", trade_id);

        let tables = self.lock()?;
        tables
            .trades
            .get(&trade_id)
            .cloned()
            .ok_or_else(|| Error::not_found("trade", trade_id))
    }

    async fn delete_trade(&self, trade_id: Uuid) -> Result<()> {
        debug!("Deleting trade {}", trade_id);

        let mut tables = self.lock()?;
        if tables.trades.remove(&trade_id).is_none() {
            return Err(Error::not_found("trade", trade_id));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationshipRepository for InMemoryStore {
    async fn insert_relationship(
        &self,
        mut relationship: CopyTradingRelationship,
    ) -> Result<CopyTradingRelationship> {
        debug!(
            "Inserting relationship {} -> {}",
            relationship.lead_wallet_id, relationship.follower_wallet_id
        );

        relationship.profit_share_percentage = fit_numeric(
            "copy_trading_relationships.profit_share_percentage",
            relationship.profit_share_percentage,
            precision::RATIO,
        )?;

        if relationship.lead_wallet_id == relationship.follower_wallet_id {
            return Err(check_violation(
                "copy_trading_relationships",
                constraints::CHK_DIFFERENT_WALLETS,
            ));
        }
        let share = relationship.profit_share_percentage;
        if share < MIN_PROFIT_SHARE || share > MAX_PROFIT_SHARE {
            return Err(check_violation(
                "copy_trading_relationships",
                constraints::RELATIONSHIPS_PROFIT_SHARE_CHECK,
            ));
        }

        let mut tables = self.lock()?;
        if tables.relationships.values().any(|r| {
            r.lead_wallet_id == relationship.lead_wallet_id
                && r.follower_wallet_id == relationship.follower_wallet_id
        }) {
            return Err(Error::duplicate(
                "relationship",
                constraints::UNIQUE_RELATIONSHIP,
            ));
        }
        if !tables.wallets.contains_key(&relationship.lead_wallet_id) {
            return Err(missing_reference(
                "copy_trading_relationships",
                constraints::RELATIONSHIPS_LEAD_FKEY,
            ));
        }
        if !tables.wallets.contains_key(&relationship.follower_wallet_id) {
            return Err(missing_reference(
                "copy_trading_relationships",
                constraints::RELATIONSHIPS_FOLLOWER_FKEY,
            ));
        }

        relationship.relationship_id = Uuid::new_v4();
        relationship.start_date = Some(
            relationship
                .start_date
                .map_or_else(now, |at| at.trunc_subsecs(6)),
        );
        relationship.end_date = relationship.end_date.map(|at| at.trunc_subsecs(6));
        tables
            .relationships
            .insert(relationship.relationship_id, relationship.clone());
        Ok(relationship)
    }

    async fn get_relationship(&self, relationship_id: Uuid) -> Result<CopyTradingRelationship> {
        debug!("Getting relationship {}", relationship_id);

        let tables = self.lock()?;
        tables
            .relationships
            .get(&relationship_id)
            .cloned()
            .ok_or_else(|| Error::not_found("relationship", relationship_id))
    }

    async fn get_relationship_by_pair(
        &self,
        lead_wallet_id: Uuid,
        follower_wallet_id: Uuid,
    ) -> Result<CopyTradingRelationship> {
        debug!("Getting relationship {} -> {}", lead_wallet_id, follower_wallet_id);

        let tables = self.lock()?;
        tables
            .relationships
            .values()
            .find(|r| r.lead_wallet_id == lead_wallet_id && r.follower_wallet_id == follower_wallet_id)
            .cloned()
            .ok_or_else(|| {
                Error::not_found(
                    "relationship",
                    format!("{} -> {}", lead_wallet_id, follower_wallet_id),
                )
            })
    }

    async fn end_relationship(&self, relationship_id: Uuid, end_date: DateTime<Utc>) -> Result<()> {
        debug!("Ending relationship {} at {}", relationship_id, end_date);

        let mut tables = self.lock()?;
        let relationship = tables
            .relationships
            .get_mut(&relationship_id)
            .ok_or_else(|| Error::not_found("relationship", relationship_id))?;
        relationship.end_date = Some(end_date.trunc_subsecs(6));
        Ok(())
    }

    async fn delete_relationship(&self, relationship_id: Uuid) -> Result<()> {
        debug!("Deleting relationship {}", relationship_id);

        let mut tables = self.lock()?;
        if tables.relationships.remove(&relationship_id).is_none() {
            return Err(Error::not_found("relationship", relationship_id));
        }
        Ok(())
    }
}
