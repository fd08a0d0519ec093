//! Asset models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `assets` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub asset_id: Uuid,
    /// Unique market symbol (e.g., "BTC-PERP")
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    /// Perpetual contract rather than spot
    pub is_perpetual: bool,
}

impl Asset {
    pub fn new(
        symbol: impl Into<String>,
        base_currency: impl Into<String>,
        quote_currency: impl Into<String>,
        is_perpetual: bool,
    ) -> Self {
        Self {
            asset_id: Uuid::nil(),
            symbol: symbol.into(),
            base_currency: base_currency.into(),
            quote_currency: quote_currency.into(),
            is_perpetual,
        }
    }

    /// Create a perpetual contract quoted in USDC
    pub fn perpetual(symbol: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Self::new(symbol, base_currency, "USDC", true)
    }
}
