//! Trade models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::decimal::{Decimal, Price, Quantity};

/// Row of the `trades` table: one execution against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub trade_id: Uuid,
    /// Order the execution belongs to
    pub order_id: Uuid,
    pub asset_id: Uuid,
    pub executed_price: Price,
    pub executed_quantity: Quantity,
    pub fee: Decimal,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn new(
        order_id: Uuid,
        asset_id: Uuid,
        executed_price: Price,
        executed_quantity: Quantity,
        fee: Decimal,
    ) -> Self {
        Self {
            trade_id: Uuid::nil(),
            order_id,
            asset_id,
            executed_price,
            executed_quantity,
            fee,
            executed_at: None,
        }
    }

    /// Record an explicit execution time instead of the server default
    pub fn executed_at(mut self, at: DateTime<Utc>) -> Self {
        self.executed_at = Some(at);
        self
    }
}
