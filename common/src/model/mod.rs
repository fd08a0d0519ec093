//! Domain models for the copy-trading schema
//!
//! Each struct mirrors one table row. Identifiers and server-assigned
//! timestamps are unset (nil / `None`) until the row has been inserted.

pub mod user;
pub mod wallet;
pub mod asset;
pub mod order;
pub mod trade;
pub mod relationship;

pub use user::User;
pub use wallet::Wallet;
pub use asset::Asset;
pub use order::{Order, OrderType, Side, Status};
pub use trade::Trade;
pub use relationship::CopyTradingRelationship;
