//! Schema provisioning
//!
//! The schema is an ordered list of versioned migrations embedded from the
//! workspace `migrations/` directory. Each migration is written to be a
//! no-op against a database that already has the objects it declares, so a
//! database provisioned before versioning was introduced migrates cleanly.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{ErrorExt, Result};
use crate::model::{OrderType, Side, Status};

/// Embedded, versioned migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Tables the migrations create, in dependency order
pub const TABLES: [&str; 6] = [
    "users",
    "wallets",
    "assets",
    "orders",
    "trades",
    "copy_trading_relationships",
];

/// Secondary indexes the migrations create
pub const INDEXES: [&str; 7] = [
    "idx_orders_wallet_id",
    "idx_orders_asset_id",
    "idx_orders_created_at",
    "idx_trades_order_id",
    "idx_trades_executed_at",
    "idx_copy_trading_lead_wallet_id",
    "idx_copy_trading_follower_wallet_id",
];

/// Constraint names as PostgreSQL reports them on violation
pub mod constraints {
    pub const USERS_USERNAME_KEY: &str = "users_username_key";
    pub const USERS_EMAIL_KEY: &str = "users_email_key";

    pub const WALLETS_ADDRESS_KEY: &str = "wallets_hyperliquid_address_key";
    pub const WALLETS_USER_FKEY: &str = "wallets_user_id_fkey";
    pub const CHK_API_KEY_OWNED: &str = "chk_api_key_owned";

    pub const ASSETS_SYMBOL_KEY: &str = "assets_symbol_key";

    pub const ORDERS_WALLET_FKEY: &str = "orders_wallet_id_fkey";
    pub const ORDERS_ASSET_FKEY: &str = "orders_asset_id_fkey";
    pub const ORDERS_LEVERAGE_CHECK: &str = "orders_leverage_check";
    pub const CHK_PRICE_ORDER_TYPE: &str = "chk_price_order_type";

    pub const TRADES_ORDER_FKEY: &str = "trades_order_id_fkey";
    pub const TRADES_ASSET_FKEY: &str = "trades_asset_id_fkey";

    pub const RELATIONSHIPS_LEAD_FKEY: &str = "copy_trading_relationships_lead_wallet_id_fkey";
    pub const RELATIONSHIPS_FOLLOWER_FKEY: &str =
        "copy_trading_relationships_follower_wallet_id_fkey";
    pub const RELATIONSHIPS_PROFIT_SHARE_CHECK: &str =
        "copy_trading_relationships_profit_share_percentage_check";
    pub const UNIQUE_RELATIONSHIP: &str = "unique_relationship";
    pub const CHK_DIFFERENT_WALLETS: &str = "chk_different_wallets";
}

/// VARCHAR limits declared by the schema
pub mod limits {
    pub const USERNAME: usize = 50;
    pub const EMAIL: usize = 255;
    pub const ADDRESS: usize = 66;
    pub const API_KEY: usize = 255;
    pub const SYMBOL: usize = 20;
    pub const CURRENCY: usize = 10;
    pub const EXTERNAL_ORDER_ID: usize = 64;
}

/// Apply every pending migration. Safe to call repeatedly and from
/// concurrently starting processes; the migrator serializes them with an
/// advisory lock.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or_default();
    debug!("Ensuring schema is at version {}", latest);

    MIGRATOR
        .run(pool)
        .await
        .with_context(|| format!("failed to migrate schema to version {}", latest))?;

    info!("Schema is at version {}", latest);
    Ok(())
}

/// Schema objects the migrations declare that are absent from the database.
/// An empty result means the schema is fully provisioned.
pub async fn missing_objects(pool: &PgPool) -> Result<Vec<String>> {
    let mut missing = Vec::new();

    let enums: [(&str, Vec<&str>); 3] = [
        ("order_type", OrderType::ALL.iter().map(|v| v.as_str()).collect()),
        ("order_side", Side::ALL.iter().map(|v| v.as_str()).collect()),
        ("order_status", Status::ALL.iter().map(|v| v.as_str()).collect()),
    ];

    for (type_name, expected) in enums {
        let labels: Vec<String> = sqlx::query_scalar(
            "SELECT e.enumlabel::text
             FROM pg_enum e
             JOIN pg_type t ON t.oid = e.enumtypid
             WHERE t.typname = $1
             ORDER BY e.enumsortorder",
        )
        .bind(type_name)
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to read labels of type {}", type_name))?;

        if labels.is_empty() {
            missing.push(format!("type {}", type_name));
            continue;
        }
        for label in expected {
            if !labels.iter().any(|l| l == label) {
                missing.push(format!("type {} label {}", type_name, label));
            }
        }
    }

    for table in TABLES {
        if !relation_exists(pool, table).await? {
            missing.push(format!("table {}", table));
        }
    }

    for index in INDEXES {
        if !relation_exists(pool, index).await? {
            missing.push(format!("index {}", index));
        }
    }

    Ok(missing)
}

async fn relation_exists(pool: &PgPool, name: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT to_regclass($1) IS NOT NULL")
        .bind(name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to look up relation {}", name))
}
