//! Order models and related types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::decimal::{dec, Decimal, Price, Quantity};

/// Order side (buy or sell), stored as the `order_side` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side")]
pub enum Side {
    Buy,
    Sell,
}

/// Order type, stored as the `order_type` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_type")]
pub enum OrderType {
    /// Executed immediately at the current market price; never carries a price
    Market,
    /// Executed at the specified price or better
    Limit,
    /// Market order triggered at a stop price
    StopMarket,
    /// Limit order triggered at a stop price
    StopLimit,
}

/// Order status, stored as the `order_status` enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status")]
pub enum Status {
    #[default]
    Pending,
    Filled,
    Cancelled,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Buy, Side::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl OrderType {
    pub const ALL: [OrderType; 4] = [
        OrderType::Market,
        OrderType::Limit,
        OrderType::StopMarket,
        OrderType::StopLimit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
            OrderType::StopMarket => "StopMarket",
            OrderType::StopLimit => "StopLimit",
        }
    }
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::Filled, Status::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Filled => "Filled",
            Status::Cancelled => "Cancelled",
        }
    }
}

macro_rules! impl_label {
    ($ty:ty, $name:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        crate::error::Error::InvalidInput(format!("invalid {} value: {}", $name, s))
                    })
            }
        }
    };
}

impl_label!(Side, "order_side");
impl_label!(OrderType, "order_type");
impl_label!(Status, "order_status");

/// Leverage applied when the caller does not choose one
pub const DEFAULT_LEVERAGE: Decimal = dec!(1.0);

/// Inclusive leverage bounds enforced by the `orders` table
pub const MIN_LEVERAGE: Decimal = dec!(1.0);
pub const MAX_LEVERAGE: Decimal = dec!(50.0);

/// Row of the `orders` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    /// Server-generated order ID (nil until inserted)
    pub order_id: Uuid,
    /// Wallet that placed the order
    pub wallet_id: Uuid,
    /// Traded asset
    pub asset_id: Uuid,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: Quantity,
    /// Limit or trigger price; absent for market orders
    pub price: Option<Price>,
    pub leverage: Decimal,
    pub status: Status,
    /// Server-assigned creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Order ID assigned by the exchange
    pub hyperliquid_order_id: Option<String>,
    /// Whether the order mirrors a lead wallet's order
    pub is_copied: bool,
}

impl Order {
    /// Create a pending order with default leverage
    pub fn new(
        wallet_id: Uuid,
        asset_id: Uuid,
        order_type: OrderType,
        side: Side,
        quantity: Quantity,
        price: Option<Price>,
    ) -> Self {
        Self {
            order_id: Uuid::nil(),
            wallet_id,
            asset_id,
            order_type,
            side,
            quantity,
            price,
            leverage: DEFAULT_LEVERAGE,
            status: Status::Pending,
            created_at: None,
            hyperliquid_order_id: None,
            is_copied: false,
        }
    }

    /// Create a market order
    pub fn market(wallet_id: Uuid, asset_id: Uuid, side: Side, quantity: Quantity) -> Self {
        Self::new(wallet_id, asset_id, OrderType::Market, side, quantity, None)
    }

    /// Create a limit order
    pub fn limit(
        wallet_id: Uuid,
        asset_id: Uuid,
        side: Side,
        quantity: Quantity,
        price: Price,
    ) -> Self {
        Self::new(wallet_id, asset_id, OrderType::Limit, side, quantity, Some(price))
    }

    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_external_id(mut self, hyperliquid_order_id: impl Into<String>) -> Self {
        self.hyperliquid_order_id = Some(hyperliquid_order_id.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Mark the order as copied from a lead wallet
    pub fn copied(mut self) -> Self {
        self.is_copied = true;
        self
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }
}
