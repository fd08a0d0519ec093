use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use common::db::{self, DbConfig};
use common::model::Wallet;
use common::Result;
use rust_decimal_macros::dec;
use store::Store;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Copy-trading database demo CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database host (overrides DB_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database port (overrides DB_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Database user (overrides DB_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database password (overrides DB_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Database name (overrides DB_NAME)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Commands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the database and exercise the wallet repository
    Demo {
        /// Replace the wallet's API key after the balance update
        #[arg(long)]
        rotate_key: bool,

        /// Delete the wallet at the end
        #[arg(long)]
        cleanup: bool,
    },
    /// Provision the database and report missing schema objects
    Check,
}

impl Cli {
    fn db_config(&self) -> Result<DbConfig> {
        let mut config = DbConfig::from_env()?;
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "copy_trading_demo={level},common={level},store={level}",
            level = cli.log_level
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outcome = match cli.command {
        Some(Commands::Check) => check(&cli).await,
        Some(Commands::Demo { rotate_key, cleanup }) => demo(&cli, rotate_key, cleanup).await,
        None => demo(&cli, false, false).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn demo(cli: &Cli, rotate_key: bool, cleanup: bool) -> Result<()> {
    let config = cli.db_config()?;
    let database = db::initialize(&config).await?;
    let store = Store::postgres(database.clone());

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let address = format!("0xTestWallet{}", nanos);

    let wallet = Wallet::new(address.clone(), dec!(1000.0)).owned(Some("test-api-key".to_string()));
    let wallet = store.wallets().insert_wallet(wallet).await?;
    println!("Wallet created with ID: {}", wallet.wallet_id);

    let fetched = store.wallets().get_wallet(wallet.wallet_id).await?;
    println!(
        "Fetched wallet by ID: Address={}, Balance={:.2}",
        fetched.hyperliquid_address, fetched.balance_usdc
    );

    let fetched = store.wallets().get_wallet_by_address(&address).await?;
    println!("Fetched by address: ID={}", fetched.wallet_id);

    store
        .wallets()
        .update_wallet_balance(wallet.wallet_id, dec!(1500.0))
        .await?;
    println!("Wallet balance updated to 1500.0");

    if rotate_key {
        store
            .wallets()
            .update_wallet_api_key(wallet.wallet_id, Some("new-api-key"))
            .await?;
        println!("Wallet API key updated");
    }

    if cleanup {
        store.wallets().delete_wallet(wallet.wallet_id).await?;
        println!("Wallet deleted");
    }

    database.close().await;
    info!("Demo finished");
    Ok(())
}

async fn check(cli: &Cli) -> Result<()> {
    let config = cli.db_config()?;
    let database = db::initialize(&config).await?;

    let missing = db::missing_objects(database.pool()).await?;
    database.close().await;

    if missing.is_empty() {
        println!("Schema of {} is complete", config.database);
        return Ok(());
    }
    for object in &missing {
        println!("missing {}", object);
    }
    Err(common::Error::Internal(format!(
        "{} schema objects missing from {}",
        missing.len(),
        config.database
    )))
}
