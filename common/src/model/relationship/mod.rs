//! Copy-trading relationship models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::decimal::{dec, Decimal};

/// Inclusive bounds for `profit_share_percentage`
pub const MIN_PROFIT_SHARE: Decimal = dec!(0.0);
pub const MAX_PROFIT_SHARE: Decimal = dec!(100.0);

/// Row of the `copy_trading_relationships` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CopyTradingRelationship {
    pub relationship_id: Uuid,
    /// Wallet whose orders are copied
    pub lead_wallet_id: Uuid,
    /// Wallet that copies them
    pub follower_wallet_id: Uuid,
    pub start_date: Option<DateTime<Utc>>,
    /// Open-ended while `None`
    pub end_date: Option<DateTime<Utc>>,
    /// Share of the follower's profit paid to the lead, in percent
    pub profit_share_percentage: Decimal,
}

impl CopyTradingRelationship {
    pub fn new(lead_wallet_id: Uuid, follower_wallet_id: Uuid, profit_share_percentage: Decimal) -> Self {
        Self {
            relationship_id: Uuid::nil(),
            lead_wallet_id,
            follower_wallet_id,
            start_date: None,
            end_date: None,
            profit_share_percentage,
        }
    }

    /// Whether the relationship covers the given instant
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        let started = self.start_date.map_or(true, |start| start <= at);
        let not_ended = self.end_date.map_or(true, |end| at < end);
        started && not_ended
    }
}
