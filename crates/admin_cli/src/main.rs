use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Engine, NewAccountCmd, NewBundleCmd, SettleCmd, TransactionCmd, TransactionKind, Usd};
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use serde_json::json;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "fund_admin")]
#[command(about = "Back-office utilities for the fund ledger")]
struct Cli {
    /// Settings file (defaults to `config/fund.toml` when present).
    #[arg(long)]
    config: Option<String>,

    /// Database connection string, overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    AccountType(AccountTypeArgs),
    Bundle(BundleArgs),
    Channel(ChannelArgs),
    Account(AccountArgs),
    Wallet(WalletArgs),
    Tx(TxArgs),
    /// Run the weekly settlement.
    Settle(SettleArgs),
    Finance(FinanceArgs),
}

#[derive(Args, Debug)]
struct AccountTypeArgs {
    #[command(subcommand)]
    command: AccountTypeCommand,
}

#[derive(Subcommand, Debug)]
enum AccountTypeCommand {
    Add {
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct BundleArgs {
    #[command(subcommand)]
    command: BundleCommand,
}

#[derive(Subcommand, Debug)]
enum BundleCommand {
    Add(BundleAddArgs),
    List,
}

#[derive(Args, Debug)]
struct BundleAddArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    min: Decimal,
    /// Omit for the open-ended top tier.
    #[arg(long)]
    max: Option<Decimal>,
    /// Fee percentage kept by the fund.
    #[arg(long)]
    per: Decimal,
    #[arg(long, default_value = "0")]
    referral_per: Decimal,
    #[arg(long, default_value = "0")]
    referral_breakeven_lvl: Decimal,
}

#[derive(Args, Debug)]
struct ChannelArgs {
    #[command(subcommand)]
    command: ChannelCommand,
}

#[derive(Subcommand, Debug)]
enum ChannelCommand {
    Add {
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Open(AccountOpenArgs),
    Show {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug)]
struct AccountOpenArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    mid_name: Option<String>,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    mobile: String,
    #[arg(long = "type")]
    account_type: String,
    /// Defaults to today.
    #[arg(long)]
    invested_on: Option<NaiveDate>,
    #[arg(long)]
    born_on: Option<NaiveDate>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    vod_cash: Option<String>,
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Args, Debug)]
struct WalletArgs {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// Overwrite the main wallet of an account.
    Set {
        #[arg(long)]
        account: i64,
        #[arg(long)]
        value: Decimal,
    },
}

#[derive(Args, Debug)]
struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Record(TxRecordArgs),
    /// Mark a recorded transaction as paid.
    Pay {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Deposit,
    Withdrawal,
}

impl From<KindArg> for TransactionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Deposit => TransactionKind::Deposit,
            KindArg::Withdrawal => TransactionKind::Withdrawal,
        }
    }
}

#[derive(Args, Debug)]
struct TxRecordArgs {
    #[arg(long)]
    account: i64,
    #[arg(long)]
    channel: i64,
    #[arg(long, value_enum)]
    kind: KindArg,
    #[arg(long)]
    egp: Option<Decimal>,
    #[arg(long)]
    usd: Option<Decimal>,
    #[arg(long)]
    delivered_rate: Decimal,
    #[arg(long)]
    real_rate: Decimal,
    /// Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Record the transaction as already paid.
    #[arg(long)]
    paid: bool,
}

#[derive(Args, Debug)]
struct SettleArgs {
    /// Pool total reported by the trading desk.
    #[arg(long)]
    total: Decimal,
    /// On the first settlement, trust `--total` instead of summing wallets.
    #[arg(long)]
    use_reported: bool,
}

#[derive(Args, Debug)]
struct FinanceArgs {
    #[command(subcommand)]
    command: FinanceCommand,
}

#[derive(Subcommand, Debug)]
enum FinanceCommand {
    Summary,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(engine: &Engine, command: Command) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::AccountType(AccountTypeArgs {
            command: AccountTypeCommand::Add { name },
        }) => {
            let name = engine.new_account_type(&name).await?;
            println!("created account type: {name}");
        }
        Command::Bundle(BundleArgs { command }) => match command {
            BundleCommand::Add(args) => {
                let mut cmd = NewBundleCmd::new(args.name, args.min, args.per)
                    .referral_per(args.referral_per)
                    .referral_breakeven_lvl(args.referral_breakeven_lvl);
                if let Some(max) = args.max {
                    cmd = cmd.max_value(max);
                }
                let bundle = engine.new_bundle(cmd).await?;
                println!("created bundle {}: {}", bundle.id, bundle.name);
            }
            BundleCommand::List => {
                let bundles = engine.bundles().await?;
                print_json(&bundles)?;
                if let Err(err) = engine.bundle_catalog().await {
                    tracing::warn!("bundle catalog is not usable: {err}");
                }
            }
        },
        Command::Channel(ChannelArgs {
            command: ChannelCommand::Add { name },
        }) => {
            let id = engine.new_channel(&name).await?;
            println!("created channel {id}: {name}");
        }
        Command::Account(AccountArgs { command }) => match command {
            AccountCommand::Open(args) => {
                let invested_on = args
                    .invested_on
                    .unwrap_or_else(|| Utc::now().date_naive());
                let mut cmd = NewAccountCmd::new(
                    args.first_name,
                    args.last_name,
                    args.email,
                    args.mobile,
                    args.account_type,
                    invested_on,
                );
                if let Some(mid_name) = args.mid_name {
                    cmd = cmd.mid_name(mid_name);
                }
                if let Some(born_on) = args.born_on {
                    cmd = cmd.date_of_birth(born_on);
                }
                if let Some(address) = args.address {
                    cmd = cmd.address(address);
                }
                if let Some(vod_cash) = args.vod_cash {
                    cmd = cmd.vod_cash_number(vod_cash);
                }
                if let Some(comment) = args.comment {
                    cmd = cmd.comment(comment);
                }
                let account = engine.open_account(cmd).await?;
                println!(
                    "opened account {} ({})",
                    account.account_id.as_deref().unwrap_or("-"),
                    account.display_name()
                );
            }
            AccountCommand::Show { id } => {
                let account = engine.account(id).await?;
                let balance = engine.balance(id).await?;
                print_json(&json!({
                    "name": account.display_name(),
                    "age": account.age_on(Utc::now().date_naive()),
                    "vod_cash": account.has_vod_cash(),
                    "main_wallet": Usd(balance.main_wallet).to_string(),
                    "balance": Usd(balance.balance).to_string(),
                    "last_week_percentage": balance.last_week_percentage(),
                    "total_achievement_percentage": balance.total_achievement_percentage(),
                    "share_percentage": balance.share_percentage(),
                    "account": account,
                    "ledger": balance,
                }))?;
            }
        },
        Command::Wallet(WalletArgs {
            command: WalletCommand::Set { account, value },
        }) => {
            let balance = engine.set_main_wallet(account, value).await?;
            println!(
                "account {account}: main wallet {}, balance {}",
                Usd(balance.main_wallet),
                Usd(balance.balance)
            );
        }
        Command::Tx(TxArgs { command }) => match command {
            TxCommand::Record(args) => {
                let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
                let mut cmd = TransactionCmd::new(
                    args.account,
                    args.channel,
                    args.kind.into(),
                    args.delivered_rate,
                    args.real_rate,
                    date,
                );
                if let Some(egp) = args.egp {
                    cmd = cmd.amount_egp(egp);
                }
                if let Some(usd) = args.usd {
                    cmd = cmd.amount_usd(usd);
                }
                if args.paid {
                    cmd = cmd.paid(Utc::now());
                }
                let tx = engine.record_transaction(cmd).await?;
                print_json(&tx)?;
            }
            TxCommand::Pay { id } => {
                let tx = engine.mark_paid(id, Utc::now()).await?;
                print_json(&tx)?;
            }
        },
        Command::Settle(args) => {
            let cmd = SettleCmd::new(args.total, Utc::now())
                .recompute_from_wallets(!args.use_reported);
            let row = engine.settle(cmd).await?;
            print_json(&json!({
                "week_ending": row.weekend_date(),
                "overall_value": row.overall_value(),
                "total_asset": row,
            }))?;
        }
        Command::Finance(FinanceArgs {
            command: FinanceCommand::Summary,
        }) => {
            let summary = engine.finance_summary().await?;
            println!("revenues: {}", Usd(summary.revenues));
            println!("expenses: {}", Usd(summary.expenses));
            println!("net:      {}", Usd(summary.net));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fund_admin={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let database_url = cli.database_url.unwrap_or(settings.database.url);
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    run(&engine, cli.command).await
}
