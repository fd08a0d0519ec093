//! Common types and utilities for the copy-trading persistence layer
//!
//! This library holds the domain models, the shared error type, decimal
//! helpers and everything needed to bring a PostgreSQL database to a usable
//! state: configuration, bootstrap and versioned schema migrations.

pub mod error;
pub mod model;
pub mod decimal;
pub mod db;

/// Re-export important types
pub use error::{Error, ErrorExt, ErrorKind, Result};
pub use decimal::*;

// Re-export database types
pub use db::{Database, DbConfig};
