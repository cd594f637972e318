use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Account, Bundle, Engine, EngineError, FinanceKind, NewAccountCmd, NewBundleCmd, SettleCmd,
    TransactionCmd, TransactionKind,
};
use migration::MigratorTrait;

struct Fixture {
    engine: Engine,
    _db: DatabaseConnection,
    silver: Bundle,
    gold: Bundle,
    channel_id: i64,
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, day, hour, 0, 0).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 8, 12).unwrap()
}

async fn fixture() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    engine.new_account_type("Individual").await.unwrap();
    let silver = engine
        .new_bundle(NewBundleCmd::new("Silver", d("0"), d("5")).max_value(d("999")))
        .await
        .unwrap();
    let gold = engine
        .new_bundle(NewBundleCmd::new("Gold", d("1000"), d("3")))
        .await
        .unwrap();
    let channel_id = engine.new_channel("Bank transfer").await.unwrap();

    Fixture {
        engine,
        _db: db,
        silver,
        gold,
        channel_id,
    }
}

async fn open(engine: &Engine, first_name: &str) -> Account {
    engine
        .open_account(NewAccountCmd::new(
            first_name,
            "Hassan",
            format!("{first_name}@example.com"),
            "+201000000000",
            "Individual",
            day(),
        ))
        .await
        .unwrap()
}

fn deposit(fx: &Fixture, account_id: i64, usd: &str) -> TransactionCmd {
    TransactionCmd::new(
        account_id,
        fx.channel_id,
        TransactionKind::Deposit,
        d("15.7"),
        d("15.5"),
        day(),
    )
    .amount_usd(d(usd))
}

fn withdrawal(fx: &Fixture, account_id: i64, usd: &str) -> TransactionCmd {
    TransactionCmd::new(
        account_id,
        fx.channel_id,
        TransactionKind::Withdrawal,
        d("15.7"),
        d("15.5"),
        day(),
    )
    .amount_usd(d(usd))
}

#[tokio::test]
async fn open_account_assigns_public_id_and_lowest_tier() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;

    assert_eq!(account.account_id.as_deref(), Some(format!("I{}", account.id).as_str()));
    assert_eq!(account.bundle_id, Some(fx.silver.id));
    assert_eq!(account.display_name(), "Ahmed Hassan");

    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.main_wallet, Decimal::ZERO);
    assert_eq!(balance.profit_per, d("0.95"));
}

#[tokio::test]
async fn open_account_requires_known_type() {
    let fx = fixture().await;
    let err = fx
        .engine
        .open_account(NewAccountCmd::new(
            "mona",
            "Ali",
            "mona@example.com",
            "+201000000001",
            "Corporate",
            day(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("Corporate".to_string()));
}

#[tokio::test]
async fn bundles_reject_overlaps_and_duplicates() {
    let fx = fixture().await;

    let overlap = fx
        .engine
        .new_bundle(NewBundleCmd::new("Platinum", d("5000"), d("2")))
        .await
        .unwrap_err();
    assert!(matches!(overlap, EngineError::InvalidBundle(_)));

    let duplicate = fx
        .engine
        .new_bundle(NewBundleCmd::new("gold", d("0"), d("2")).max_value(d("10")))
        .await
        .unwrap_err();
    assert_eq!(duplicate, EngineError::ExistingKey("gold".to_string()));

    let catalog = fx.engine.bundle_catalog().await.unwrap();
    let names: Vec<_> = catalog.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["Silver", "Gold"]);
}

#[tokio::test]
async fn deposit_moves_wallet_retiers_and_books_spread() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("500"))
        .await
        .unwrap();

    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600").paid(at(12, 10)))
        .await
        .unwrap();
    assert_eq!(tx.amount_egp, d("9420"));
    assert!(tx.paid && tx.paid_flag);
    assert_eq!(tx.paid_at, Some(at(12, 10)));

    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.main_wallet, d("1100"));
    assert_eq!(balance.balance, d("1100"));
    assert_eq!(balance.profit_per, d("0.97"));
    let account = fx.engine.account(account.id).await.unwrap();
    assert_eq!(account.bundle_id, Some(fx.gold.id));

    let entries = fx.engine.company_finances().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Deposit Spread");
    assert_eq!(entries[0].kind, FinanceKind::Expenses);
    assert_eq!(entries[0].amount, d("7.74"));

    let summary = fx.engine.finance_summary().await.unwrap();
    assert_eq!(summary.expenses, d("7.74"));
    assert_eq!(summary.net, d("-7.74"));
}

#[tokio::test]
async fn missing_amount_is_rejected() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    let cmd = TransactionCmd::new(
        account.id,
        fx.channel_id,
        TransactionKind::Deposit,
        d("15.7"),
        d("15.5"),
        day(),
    );
    let err = fx.engine.record_transaction(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingAmount(_)));
    assert!(
        fx.engine
            .transactions_for_account(account.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn mark_paid_applies_once() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;

    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600"))
        .await
        .unwrap();
    assert!(!tx.paid_flag);
    assert_eq!(
        fx.engine.balance(account.id).await.unwrap().main_wallet,
        Decimal::ZERO
    );

    fx.engine.mark_paid(tx.id, at(12, 10)).await.unwrap();
    let err = fx.engine.mark_paid(tx.id, at(12, 11)).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyApplied(_)));

    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.main_wallet, d("600"));
    assert_eq!(fx.engine.company_finances().await.unwrap().len(), 1);
    let stored = fx.engine.transaction(tx.id).await.unwrap();
    assert_eq!(stored.paid_at, Some(at(12, 10)));
}

#[tokio::test]
async fn insufficient_funds_leaves_no_trace() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("100"))
        .await
        .unwrap();

    let err = fx
        .engine
        .record_transaction(withdrawal(&fx, account.id, "150").paid(at(12, 10)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert!(
        fx.engine
            .transactions_for_account(account.id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        fx.engine.balance(account.id).await.unwrap().main_wallet,
        d("100")
    );
    assert!(fx.engine.company_finances().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_payment_rolls_back() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("500"))
        .await
        .unwrap();
    let tx = fx
        .engine
        .record_transaction(withdrawal(&fx, account.id, "400"))
        .await
        .unwrap();

    fx.engine
        .set_main_wallet(account.id, d("300"))
        .await
        .unwrap();
    let err = fx.engine.mark_paid(tx.id, at(12, 10)).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let stored = fx.engine.transaction(tx.id).await.unwrap();
    assert!(!stored.paid_flag);
    assert_eq!(
        fx.engine.balance(account.id).await.unwrap().main_wallet,
        d("300")
    );
}

#[tokio::test]
async fn settlements_distribute_pool_results() {
    let fx = fixture().await;
    let first = open(&fx.engine, "ahmed").await;
    let second = open(&fx.engine, "mona").await;
    fx.engine
        .set_main_wallet(first.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .set_main_wallet(second.id, d("3000"))
        .await
        .unwrap();

    assert_eq!(fx.engine.latest_total_asset().await.unwrap(), None);
    let row = fx
        .engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();
    assert_eq!(row.total, d("4000"));
    assert_eq!(row.deposits, Decimal::ZERO);
    assert_eq!(row.pls, Decimal::ZERO);
    assert_eq!(fx.engine.balance(first.id).await.unwrap().share, d("0.25"));
    assert_eq!(fx.engine.balance(second.id).await.unwrap().share, d("0.75"));

    let row = fx
        .engine
        .settle(SettleCmd::new(d("4400"), at(21, 18)))
        .await
        .unwrap();
    assert_eq!(row.pls, d("400"));
    assert_eq!(row.total, d("4400"));

    let a = fx.engine.balance(first.id).await.unwrap();
    let b = fx.engine.balance(second.id).await.unwrap();
    assert_eq!(a.trading_result_last_week, d("97"));
    assert_eq!(a.total_achievement, d("97"));
    assert_eq!(b.trading_result_last_week, d("291"));
    for balance in [&a, &b] {
        assert_eq!(balance.balance, balance.pl + balance.main_wallet);
    }
    let shares = a.share + b.share;
    assert!((shares - d("4388") / d("4400")).abs() < d("0.000001"));

    let rows = fx.engine.total_assets().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], row);
}

#[tokio::test]
async fn first_settlement_can_use_reported_total() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();

    let row = fx
        .engine
        .settle(SettleCmd::new(d("2000"), at(14, 18)).recompute_from_wallets(false))
        .await
        .unwrap();
    assert_eq!(row.total, d("2000"));
    assert_eq!(fx.engine.balance(account.id).await.unwrap().share, d("0.5"));
}

#[tokio::test]
async fn settlement_folds_in_deposits_paid_since_previous_row() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();

    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600").paid(at(16, 10)))
        .await
        .unwrap();
    assert_eq!(tx.settled_by, None);

    let row = fx
        .engine
        .settle(SettleCmd::new(d("1000"), at(21, 18)))
        .await
        .unwrap();
    assert_eq!(row.pls, Decimal::ZERO);
    assert_eq!(row.deposits, d("600"));
    assert_eq!(row.total, d("1600"));
    assert_eq!(fx.engine.balance(account.id).await.unwrap().share, Decimal::ONE);
    assert_eq!(
        fx.engine.transaction(tx.id).await.unwrap().settled_by,
        Some(row.id)
    );
}

#[tokio::test]
async fn deposit_stamped_after_settlement_is_counted_once() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();

    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600").paid(at(20, 10)))
        .await
        .unwrap();

    let second = fx
        .engine
        .settle(SettleCmd::new(d("1000"), at(18, 18)))
        .await
        .unwrap();
    assert_eq!(second.deposits, d("600"));
    assert_eq!(second.total, d("1600"));

    let third = fx
        .engine
        .settle(SettleCmd::new(d("1600"), at(25, 18)))
        .await
        .unwrap();
    assert_eq!(third.deposits, Decimal::ZERO);
    assert_eq!(third.total, d("1600"));
    assert_eq!(
        fx.engine.transaction(tx.id).await.unwrap().settled_by,
        Some(second.id)
    );
}

#[tokio::test]
async fn backdated_payment_still_reaches_the_pool() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();

    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600"))
        .await
        .unwrap();
    fx.engine.mark_paid(tx.id, at(13, 10)).await.unwrap();

    let row = fx
        .engine
        .settle(SettleCmd::new(d("1000"), at(21, 18)))
        .await
        .unwrap();
    assert_eq!(row.deposits, d("600"));
    assert_eq!(row.total, d("1600"));

    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.main_wallet, d("1600"));
    assert_eq!(balance.share, Decimal::ONE);
}

#[tokio::test]
async fn settlement_cannot_go_back_in_time() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();

    let err = fx
        .engine
        .settle(SettleCmd::new(d("1200"), at(13, 18)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OutOfOrder(_)));

    assert_eq!(fx.engine.total_assets().await.unwrap().len(), 1);
    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.pl, Decimal::ZERO);
    assert_eq!(balance.balance, d("1000"));
}

#[tokio::test]
async fn withdrawal_before_first_settlement_leaves_pool_alone() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    fx.engine
        .set_main_wallet(account.id, d("1000"))
        .await
        .unwrap();

    fx.engine
        .record_transaction(withdrawal(&fx, account.id, "200").paid(at(12, 10)))
        .await
        .unwrap();

    let balance = fx.engine.balance(account.id).await.unwrap();
    assert_eq!(balance.main_wallet, d("800"));
    assert_eq!(balance.balance, d("800"));
    assert_eq!(fx.engine.latest_total_asset().await.unwrap(), None);

    let entries = fx.engine.company_finances().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Withdrawal Spread");
    assert_eq!(entries[0].kind, FinanceKind::Revenues);
    assert_eq!(entries[0].amount, d("2.58"));

    let row = fx
        .engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();
    assert_eq!(row.total, d("800"));
    assert_eq!(row.withdrawals, Decimal::ZERO);
    assert_eq!(row.previous_withdrawals, Decimal::ZERO);
    assert_eq!(fx.engine.balance(account.id).await.unwrap().share, Decimal::ONE);
}

#[tokio::test]
async fn withdrawal_draws_on_profit_and_reconciles_pool() {
    let fx = fixture().await;
    let first = open(&fx.engine, "ahmed").await;
    let second = open(&fx.engine, "mona").await;
    fx.engine
        .set_main_wallet(first.id, d("1000"))
        .await
        .unwrap();
    fx.engine
        .set_main_wallet(second.id, d("3000"))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("0"), at(14, 18)))
        .await
        .unwrap();
    fx.engine
        .settle(SettleCmd::new(d("5000"), at(21, 18)))
        .await
        .unwrap();

    let before = fx.engine.balance(first.id).await.unwrap();
    assert_eq!(before.pl, d("242.5"));
    assert_eq!(before.balance, d("1242.5"));

    fx.engine
        .record_transaction(withdrawal(&fx, first.id, "1100").paid(at(23, 10)))
        .await
        .unwrap();

    let after = fx.engine.balance(first.id).await.unwrap();
    assert_eq!(after.main_wallet, d("142.5"));
    assert_eq!(after.pl, Decimal::ZERO);
    assert_eq!(after.balance, d("385"));
    assert_eq!(after.profit_per, d("0.95"));
    assert_eq!(
        fx.engine.account(first.id).await.unwrap().bundle_id,
        Some(fx.silver.id)
    );

    let pool = fx.engine.latest_total_asset().await.unwrap().unwrap();
    assert_eq!(pool.withdrawals, d("1100"));
    assert_eq!(pool.previous_withdrawals, d("1100"));
    assert_eq!(pool.total, d("3900"));
    assert_eq!(after.share, d("385") / d("3900"));

    let entries = fx.engine.company_finances().await.unwrap();
    let spread = entries
        .iter()
        .find(|e| e.name == "Withdrawal Spread")
        .unwrap();
    assert_eq!(spread.kind, FinanceKind::Revenues);
    assert_eq!(spread.amount, d("14.19"));
}

#[tokio::test]
async fn delete_account_cascades() {
    let fx = fixture().await;
    let account = open(&fx.engine, "ahmed").await;
    let tx = fx
        .engine
        .record_transaction(deposit(&fx, account.id, "600").paid(at(12, 10)))
        .await
        .unwrap();

    fx.engine.delete_account(account.id).await.unwrap();

    assert!(matches!(
        fx.engine.account(account.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        fx.engine.balance(account.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        fx.engine.transaction(tx.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
