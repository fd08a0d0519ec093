//! Decimal type utilities for fixed-point columns

pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
pub use rust_decimal_macros::dec;

/// Price type (DECIMAL(18, 6))
pub type Price = Decimal;

/// Quantity type (DECIMAL(18, 8))
pub type Quantity = Decimal;

/// USDC amount type (DECIMAL(18, 6))
pub type Amount = Decimal;

/// Column precision and scale, mirroring the NUMERIC declarations in the schema
pub mod precision {
    use super::*;

    /// A NUMERIC(precision, scale) column shape
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Numeric {
        pub precision: u32,
        pub scale: u32,
    }

    /// wallets.balance_usdc, orders.price, trades.executed_price
    pub const USDC: Numeric = Numeric { precision: 18, scale: 6 };

    /// orders.quantity, trades.executed_quantity, trades.fee
    pub const QUANTITY: Numeric = Numeric { precision: 18, scale: 8 };

    /// orders.leverage, copy_trading_relationships.profit_share_percentage
    pub const RATIO: Numeric = Numeric { precision: 5, scale: 2 };

    impl Numeric {
        /// Round the way PostgreSQL does on NUMERIC assignment (half away from zero)
        pub fn round(&self, value: Decimal) -> Decimal {
            value.round_dp_with_strategy(self.scale, RoundingStrategy::MidpointAwayFromZero)
        }

        /// Whether the rounded value still fits the integer digits of the column
        pub fn fits(&self, value: Decimal) -> bool {
            let integer_digits = self.precision - self.scale;
            let limit = Decimal::from_i128_with_scale(10_i128.pow(integer_digits), 0);
            self.round(value).abs() < limit
        }
    }
}
