//! Wallet models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::decimal::Amount;

/// Row of the `wallets` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    /// Server-generated wallet ID (nil until inserted)
    pub wallet_id: Uuid,
    /// Owning user; cleared when the user is deleted
    pub user_id: Option<Uuid>,
    /// Unique exchange address
    pub hyperliquid_address: String,
    /// Exchange API key; only owned wallets may carry one
    pub hyperliquid_api_key: Option<String>,
    /// USDC balance
    pub balance_usdc: Amount,
    /// Whether the platform controls this wallet (as opposed to a tracked lead wallet)
    pub is_owned: bool,
    /// Set by balance and API key updates
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// Create a tracked (non-owned) wallet without an API key
    pub fn new(address: impl Into<String>, balance_usdc: Amount) -> Self {
        Self {
            wallet_id: Uuid::nil(),
            user_id: None,
            hyperliquid_address: address.into(),
            hyperliquid_api_key: None,
            balance_usdc,
            is_owned: false,
            updated_at: None,
        }
    }

    /// Mark the wallet as owned, optionally with an API key
    pub fn owned(mut self, api_key: Option<String>) -> Self {
        self.is_owned = true;
        self.hyperliquid_api_key = api_key;
        self
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
