//! Repository behaviour shared by the backend test suites
//!
//! Every check takes a [`Store`] so the same assertions run against the
//! in-memory backend and a live PostgreSQL server. Keys are randomized so
//! the checks can run repeatedly against a persistent database.

#![allow(dead_code)]

use chrono::{Duration, SubsecRound, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::db::schema::constraints;
use common::model::{Asset, CopyTradingRelationship, Order, OrderType, Side, Status, Trade, User, Wallet};
use common::ErrorKind;
use store::Store;

/// `prefix` followed by 12 random hex digits
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

async fn seed_wallet(store: &Store) -> Wallet {
    store
        .wallets()
        .insert_wallet(Wallet::new(unique("0x"), dec!(100)).owned(None))
        .await
        .unwrap()
}

async fn seed_asset(store: &Store) -> Asset {
    store
        .assets()
        .insert_asset(Asset::perpetual(unique("T-"), "TST"))
        .await
        .unwrap()
}

pub async fn wallet_round_trip(store: &Store) {
    let wallet = Wallet::new(unique("0x"), dec!(250.5)).owned(Some("api-key".to_string()));
    let inserted = store.wallets().insert_wallet(wallet.clone()).await.unwrap();

    assert!(!inserted.wallet_id.is_nil());
    assert_eq!(inserted.hyperliquid_address, wallet.hyperliquid_address);
    assert_eq!(inserted.hyperliquid_api_key.as_deref(), Some("api-key"));
    assert_eq!(inserted.balance_usdc, dec!(250.5));
    assert!(inserted.is_owned);
    assert_eq!(inserted.user_id, None);
    assert_eq!(inserted.updated_at, None);

    let by_id = store.wallets().get_wallet(inserted.wallet_id).await.unwrap();
    assert_eq!(by_id, inserted);

    let by_address = store
        .wallets()
        .get_wallet_by_address(&wallet.hyperliquid_address)
        .await
        .unwrap();
    assert_eq!(by_address, inserted);
}

pub async fn duplicate_address_is_rejected(store: &Store) {
    let address = unique("0x");
    store
        .wallets()
        .insert_wallet(Wallet::new(address.clone(), dec!(1)))
        .await
        .unwrap();

    let err = store
        .wallets()
        .insert_wallet(Wallet::new(address, dec!(2)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.constraint_name(), Some(constraints::WALLETS_ADDRESS_KEY));
}

pub async fn unknown_ids_are_not_found(store: &Store) {
    let missing = Uuid::new_v4();

    let err = store.wallets().get_wallet(missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.wallets().get_wallet_by_address(&unique("0x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store
        .wallets()
        .update_wallet_balance(missing, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store
        .wallets()
        .update_wallet_api_key(missing, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.wallets().delete_wallet(missing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(store.users().get_user(missing).await.unwrap_err().is_not_found());
    assert!(store.assets().get_asset(missing).await.unwrap_err().is_not_found());
    assert!(store.orders().get_order(missing).await.unwrap_err().is_not_found());
    assert!(store
        .orders()
        .update_order_status(missing, Status::Filled)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store.trades().delete_trade(missing).await.unwrap_err().is_not_found());
    assert!(store
        .relationships()
        .end_relationship(missing, Utc::now())
        .await
        .unwrap_err()
        .is_not_found());
}

pub async fn deleted_rows_are_not_found(store: &Store) {
    let wallet = seed_wallet(store).await;
    store.wallets().delete_wallet(wallet.wallet_id).await.unwrap();

    let err = store.wallets().get_wallet(wallet.wallet_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store.wallets().delete_wallet(wallet.wallet_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = store
        .wallets()
        .update_wallet_balance(wallet.wallet_id, dec!(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

pub async fn api_key_requires_owned_wallet(store: &Store) {
    let mut tracked = Wallet::new(unique("0x"), dec!(0));
    tracked.hyperliquid_api_key = Some("api-key".to_string());

    let err = store.wallets().insert_wallet(tracked).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::CHK_API_KEY_OWNED));

    let tracked = store
        .wallets()
        .insert_wallet(Wallet::new(unique("0x"), dec!(0)))
        .await
        .unwrap();
    let err = store
        .wallets()
        .update_wallet_api_key(tracked.wallet_id, Some("api-key"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);

    // Clearing is always allowed
    store
        .wallets()
        .update_wallet_api_key(tracked.wallet_id, None)
        .await
        .unwrap();
}

pub async fn api_key_rotation(store: &Store) {
    let wallet = seed_wallet(store).await;

    store
        .wallets()
        .update_wallet_api_key(wallet.wallet_id, Some("rotated"))
        .await
        .unwrap();
    let fetched = store.wallets().get_wallet(wallet.wallet_id).await.unwrap();
    assert_eq!(fetched.hyperliquid_api_key.as_deref(), Some("rotated"));
    assert!(fetched.updated_at.is_some());

    store
        .wallets()
        .update_wallet_api_key(wallet.wallet_id, None)
        .await
        .unwrap();
    let fetched = store.wallets().get_wallet(wallet.wallet_id).await.unwrap();
    assert_eq!(fetched.hyperliquid_api_key, None);
}

pub async fn market_order_rejects_price(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;

    let mut order = Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(1));
    order.price = Some(dec!(100));
    let err = store.orders().insert_order(order).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::CHK_PRICE_ORDER_TYPE));

    // Only Market is constrained
    let stop = Order::new(
        wallet.wallet_id,
        asset.asset_id,
        OrderType::StopMarket,
        Side::Sell,
        dec!(1),
        Some(dec!(90)),
    );
    store.orders().insert_order(stop).await.unwrap();
}

pub async fn leverage_bounds(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;
    let order = |leverage| {
        Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(0.1)).with_leverage(leverage)
    };

    for accepted in [dec!(1.0), dec!(50.0), dec!(20)] {
        let inserted = store.orders().insert_order(order(accepted)).await.unwrap();
        assert_eq!(inserted.leverage, accepted);
    }

    for rejected in [dec!(0.99), dec!(50.01), dec!(0), dec!(-5)] {
        let err = store.orders().insert_order(order(rejected)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other, "leverage {} accepted", rejected);
        assert_eq!(err.constraint_name(), Some(constraints::ORDERS_LEVERAGE_CHECK));
    }
}

pub async fn order_round_trip(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;

    let order = Order::limit(wallet.wallet_id, asset.asset_id, Side::Sell, dec!(0.25), dec!(64000.5))
        .with_leverage(dec!(3))
        .with_external_id("hl-123")
        .copied();
    let inserted = store.orders().insert_order(order).await.unwrap();
    assert!(!inserted.order_id.is_nil());
    assert!(inserted.created_at.is_some());
    assert_eq!(inserted.status, Status::Pending);
    assert_eq!(inserted.hyperliquid_order_id.as_deref(), Some("hl-123"));
    assert!(inserted.is_copied);

    let fetched = store.orders().get_order(inserted.order_id).await.unwrap();
    assert_eq!(fetched, inserted);

    store
        .orders()
        .update_order_status(inserted.order_id, Status::Filled)
        .await
        .unwrap();
    let fetched = store.orders().get_order(inserted.order_id).await.unwrap();
    assert_eq!(fetched.status, Status::Filled);

    let bare = Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(1));
    let inserted = store.orders().insert_order(bare).await.unwrap();
    assert_eq!(inserted.price, None);
    assert_eq!(inserted.hyperliquid_order_id, None);

    let cancelled = Order::market(wallet.wallet_id, asset.asset_id, Side::Sell, dec!(1))
        .with_status(Status::Cancelled);
    let inserted = store.orders().insert_order(cancelled).await.unwrap();
    let fetched = store.orders().get_order(inserted.order_id).await.unwrap();
    assert_eq!(fetched.status, Status::Cancelled);
}

/// A row breaking two checks reports the one whose name sorts first
pub async fn first_failing_check_wins(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;

    let mut order = Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(1))
        .with_leverage(dec!(0));
    order.price = Some(dec!(5));
    let err = store.orders().insert_order(order).await.unwrap_err();
    assert_eq!(err.constraint_name(), Some(constraints::CHK_PRICE_ORDER_TYPE));

    let err = store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(
            wallet.wallet_id,
            wallet.wallet_id,
            dec!(101),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.constraint_name(), Some(constraints::CHK_DIFFERENT_WALLETS));
}

pub async fn order_requires_existing_wallet(store: &Store) {
    let asset = seed_asset(store).await;

    let order = Order::market(Uuid::new_v4(), asset.asset_id, Side::Buy, dec!(1));
    let err = store.orders().insert_order(order).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::ORDERS_WALLET_FKEY));
}

pub async fn wallet_delete_cascades(store: &Store) {
    let wallet = seed_wallet(store).await;
    let other = seed_wallet(store).await;
    let asset = seed_asset(store).await;

    let order = store
        .orders()
        .insert_order(Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(1)))
        .await
        .unwrap();
    let trade = store
        .trades()
        .insert_trade(Trade::new(order.order_id, asset.asset_id, dec!(10), dec!(1), dec!(0.01)))
        .await
        .unwrap();
    let relationship = store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(
            other.wallet_id,
            wallet.wallet_id,
            dec!(10),
        ))
        .await
        .unwrap();

    store.wallets().delete_wallet(wallet.wallet_id).await.unwrap();

    assert!(store.orders().get_order(order.order_id).await.unwrap_err().is_not_found());
    assert!(store.trades().get_trade(trade.trade_id).await.unwrap_err().is_not_found());
    assert!(store
        .relationships()
        .get_relationship(relationship.relationship_id)
        .await
        .unwrap_err()
        .is_not_found());
    store.wallets().get_wallet(other.wallet_id).await.unwrap();
    store.assets().get_asset(asset.asset_id).await.unwrap();
}

pub async fn asset_delete_is_restricted(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;

    let order = store
        .orders()
        .insert_order(Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(1)))
        .await
        .unwrap();

    let err = store.assets().delete_asset(asset.asset_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::ORDERS_ASSET_FKEY));
    store.assets().get_asset(asset.asset_id).await.unwrap();

    store.orders().delete_order(order.order_id).await.unwrap();
    store.assets().delete_asset(asset.asset_id).await.unwrap();
    assert!(store
        .assets()
        .get_asset_by_symbol(&asset.symbol)
        .await
        .unwrap_err()
        .is_not_found());
}

pub async fn asset_lifecycle(store: &Store) {
    let symbol = unique("A-");
    let asset = store
        .assets()
        .insert_asset(Asset::new(symbol.clone(), "BTC", "USDC", false))
        .await
        .unwrap();
    assert!(!asset.asset_id.is_nil());
    assert!(!asset.is_perpetual);

    let by_symbol = store.assets().get_asset_by_symbol(&symbol).await.unwrap();
    assert_eq!(by_symbol, asset);
    assert_eq!(store.assets().get_asset(asset.asset_id).await.unwrap(), asset);

    let err = store
        .assets()
        .insert_asset(Asset::perpetual(symbol.clone(), "ETH"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.constraint_name(), Some(constraints::ASSETS_SYMBOL_KEY));

    store.assets().delete_asset(asset.asset_id).await.unwrap();
    assert!(store
        .assets()
        .delete_asset(asset.asset_id)
        .await
        .unwrap_err()
        .is_not_found());
}

pub async fn asset_delete_is_restricted_by_trades(store: &Store) {
    let wallet = seed_wallet(store).await;
    let order_asset = seed_asset(store).await;
    let traded_asset = seed_asset(store).await;

    let order = store
        .orders()
        .insert_order(Order::market(wallet.wallet_id, order_asset.asset_id, Side::Buy, dec!(1)))
        .await
        .unwrap();
    let trade = store
        .trades()
        .insert_trade(Trade::new(order.order_id, traded_asset.asset_id, dec!(10), dec!(1), dec!(0)))
        .await
        .unwrap();

    let err = store
        .assets()
        .delete_asset(traded_asset.asset_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::TRADES_ASSET_FKEY));

    store.trades().delete_trade(trade.trade_id).await.unwrap();
    store.assets().delete_asset(traded_asset.asset_id).await.unwrap();
    store.assets().get_asset(order_asset.asset_id).await.unwrap();
}

/// Insert an owned wallet with 1000 USDC, then raise the balance to 1500
pub async fn balance_update_scenario(store: &Store, address: &str) {
    let inserted = store
        .wallets()
        .insert_wallet(Wallet::new(address, dec!(1000.0)).owned(None))
        .await
        .unwrap();

    let fetched = store.wallets().get_wallet(inserted.wallet_id).await.unwrap();
    assert_eq!(fetched.balance_usdc, dec!(1000.0));
    assert_eq!(fetched.updated_at, None);

    store
        .wallets()
        .update_wallet_balance(inserted.wallet_id, dec!(1500.0))
        .await
        .unwrap();

    let fetched = store.wallets().get_wallet_by_address(address).await.unwrap();
    assert_eq!(fetched.wallet_id, inserted.wallet_id);
    assert_eq!(fetched.balance_usdc, dec!(1500.0));
    assert!(fetched.updated_at.is_some());
}

pub async fn numeric_columns_round_and_overflow(store: &Store) {
    let wallet = store
        .wallets()
        .insert_wallet(Wallet::new(unique("0x"), dec!(1.0000005)))
        .await
        .unwrap();
    assert_eq!(wallet.balance_usdc, dec!(1.000001));

    let err = store
        .wallets()
        .update_wallet_balance(wallet.wallet_id, dec!(1000000000000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);

    let long_address = format!("0x{}", "a".repeat(65));
    let err = store
        .wallets()
        .insert_wallet(Wallet::new(long_address, dec!(0)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
}

pub async fn user_lifecycle(store: &Store) {
    let name = unique("user-");
    let user = store
        .users()
        .insert_user(User::new(name.clone(), format!("{}@example.com", name)))
        .await
        .unwrap();
    assert!(!user.user_id.is_nil());
    assert!(user.created_at.is_some());
    assert_eq!(store.users().get_user_by_username(&name).await.unwrap(), user);

    let err = store
        .users()
        .insert_user(User::new(name.clone(), format!("other-{}@example.com", name)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.constraint_name(), Some(constraints::USERS_USERNAME_KEY));

    let err = store
        .users()
        .insert_user(User::new(unique("user-"), format!("{}@example.com", name)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.constraint_name(), Some(constraints::USERS_EMAIL_KEY));

    let wallet = store
        .wallets()
        .insert_wallet(Wallet::new(unique("0x"), dec!(0)).for_user(user.user_id))
        .await
        .unwrap();
    assert_eq!(wallet.user_id, Some(user.user_id));

    store.users().delete_user(user.user_id).await.unwrap();
    let orphan = store.wallets().get_wallet(wallet.wallet_id).await.unwrap();
    assert_eq!(orphan.user_id, None);
    assert!(store.users().delete_user(user.user_id).await.unwrap_err().is_not_found());
}

pub async fn trade_lifecycle(store: &Store) {
    let wallet = seed_wallet(store).await;
    let asset = seed_asset(store).await;
    let order = store
        .orders()
        .insert_order(Order::market(wallet.wallet_id, asset.asset_id, Side::Buy, dec!(2)))
        .await
        .unwrap();

    let defaulted = store
        .trades()
        .insert_trade(Trade::new(order.order_id, asset.asset_id, dec!(101.25), dec!(1), dec!(0)))
        .await
        .unwrap();
    assert!(!defaulted.trade_id.is_nil());
    assert!(defaulted.executed_at.is_some());

    let at = (Utc::now() - Duration::minutes(5)).trunc_subsecs(6);
    let explicit = store
        .trades()
        .insert_trade(
            Trade::new(order.order_id, asset.asset_id, dec!(101.5), dec!(1), dec!(0.05))
                .executed_at(at),
        )
        .await
        .unwrap();
    let fetched = store.trades().get_trade(explicit.trade_id).await.unwrap();
    assert_eq!(fetched.executed_at, Some(at));
    assert_eq!(fetched, explicit);

    let err = store
        .trades()
        .insert_trade(Trade::new(Uuid::new_v4(), asset.asset_id, dec!(1), dec!(1), dec!(0)))
        .await
        .unwrap_err();
    assert_eq!(err.constraint_name(), Some(constraints::TRADES_ORDER_FKEY));

    store.orders().delete_order(order.order_id).await.unwrap();
    assert!(store.trades().get_trade(defaulted.trade_id).await.unwrap_err().is_not_found());
    assert!(store.trades().get_trade(explicit.trade_id).await.unwrap_err().is_not_found());
}

pub async fn relationship_rules(store: &Store) {
    let lead = seed_wallet(store).await;
    let follower = seed_wallet(store).await;

    let err = store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(lead.wallet_id, lead.wallet_id, dec!(5)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(err.constraint_name(), Some(constraints::CHK_DIFFERENT_WALLETS));

    for share in [dec!(-0.01), dec!(100.01)] {
        let err = store
            .relationships()
            .insert_relationship(CopyTradingRelationship::new(
                lead.wallet_id,
                follower.wallet_id,
                share,
            ))
            .await
            .unwrap_err();
        assert_eq!(
            err.constraint_name(),
            Some(constraints::RELATIONSHIPS_PROFIT_SHARE_CHECK)
        );
    }

    let relationship = store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(
            lead.wallet_id,
            follower.wallet_id,
            dec!(100),
        ))
        .await
        .unwrap();
    assert!(relationship.start_date.is_some());
    assert_eq!(relationship.end_date, None);

    let err = store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(
            lead.wallet_id,
            follower.wallet_id,
            dec!(0),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert_eq!(err.constraint_name(), Some(constraints::UNIQUE_RELATIONSHIP));

    // The reverse direction is a different relationship
    store
        .relationships()
        .insert_relationship(CopyTradingRelationship::new(
            follower.wallet_id,
            lead.wallet_id,
            dec!(0),
        ))
        .await
        .unwrap();

    let by_pair = store
        .relationships()
        .get_relationship_by_pair(lead.wallet_id, follower.wallet_id)
        .await
        .unwrap();
    assert_eq!(by_pair, relationship);

    let end = Utc::now().trunc_subsecs(6);
    store
        .relationships()
        .end_relationship(relationship.relationship_id, end)
        .await
        .unwrap();
    let ended = store
        .relationships()
        .get_relationship(relationship.relationship_id)
        .await
        .unwrap();
    assert_eq!(ended.end_date, Some(end));
    assert!(!ended.is_active_at(end));

    store
        .relationships()
        .delete_relationship(relationship.relationship_id)
        .await
        .unwrap();
    assert!(store
        .relationships()
        .get_relationship_by_pair(lead.wallet_id, follower.wallet_id)
        .await
        .unwrap_err()
        .is_not_found());
}
