//! Initial schema migration - creates all tables from scratch.
//!
//! - `account_types`: account categories (individual, corporate, ...)
//! - `bundles`: fee tiers by main-wallet range
//! - `accounts`: investors
//! - `balances`: per-account ledger, 1:1 with `accounts`
//! - `transaction_channels`: how money reached or left the fund
//! - `transactions`: deposits and withdrawals
//! - `total_assets`: pool snapshot per settlement
//! - `finance_types` / `company_finances`: company revenue and expense ledger
//!
//! Monetary values are stored as TEXT holding canonical decimals.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum AccountTypes {
    Table,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Bundles {
    Table,
    Id,
    Name,
    MinValue,
    MaxValue,
    BundlePer,
    ReferralPer,
    ReferralBreakevenLvl,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    AccountId,
    FirstName,
    MidName,
    LastName,
    DateOfBirth,
    Email,
    Mobile,
    Address,
    AccountType,
    DateOfInvestment,
    BundleId,
    VodCashNumber,
    LastContacted,
    Comment,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Balances {
    Table,
    AccountId,
    MainWallet,
    Balance,
    TradingResultLastWeek,
    Pl,
    TotalAchievement,
    Share,
    ProfitPer,
    UpdatedAt,
}

#[derive(Iden)]
enum TransactionChannels {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    ChannelId,
    Kind,
    AmountEgp,
    AmountUsd,
    DeliveredRate,
    RealRate,
    Date,
    Paid,
    PaidFlag,
    PaidAt,
    SettledBy,
    CreatedAt,
}

#[derive(Iden)]
enum TotalAssets {
    Table,
    Id,
    Total,
    Pls,
    Deposits,
    Withdrawals,
    PreviousWithdrawals,
    CreatedAt,
}

#[derive(Iden)]
enum FinanceTypes {
    Table,
    Id,
    Name,
    Kind,
}

#[derive(Iden)]
enum CompanyFinances {
    Table,
    Id,
    FinanceTypeId,
    Amount,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Account types
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AccountTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountTypes::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountTypes::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Bundles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Bundles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bundles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bundles::Name).string().not_null())
                    .col(ColumnDef::new(Bundles::MinValue).string().not_null())
                    .col(ColumnDef::new(Bundles::MaxValue).string())
                    .col(ColumnDef::new(Bundles::BundlePer).string().not_null())
                    .col(ColumnDef::new(Bundles::ReferralPer).string().not_null())
                    .col(
                        ColumnDef::new(Bundles::ReferralBreakevenLvl)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bundles::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-bundles-name-unique")
                    .table(Bundles::Table)
                    .col(Bundles::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::AccountId).string())
                    .col(ColumnDef::new(Accounts::FirstName).string().not_null())
                    .col(ColumnDef::new(Accounts::MidName).string())
                    .col(ColumnDef::new(Accounts::LastName).string().not_null())
                    .col(ColumnDef::new(Accounts::DateOfBirth).date())
                    .col(ColumnDef::new(Accounts::Email).string().not_null())
                    .col(ColumnDef::new(Accounts::Mobile).string().not_null())
                    .col(ColumnDef::new(Accounts::Address).string())
                    .col(ColumnDef::new(Accounts::AccountType).string().not_null())
                    .col(ColumnDef::new(Accounts::DateOfInvestment).date().not_null())
                    .col(ColumnDef::new(Accounts::BundleId).big_integer())
                    .col(ColumnDef::new(Accounts::VodCashNumber).string())
                    .col(ColumnDef::new(Accounts::LastContacted).timestamp())
                    .col(ColumnDef::new(Accounts::Comment).text())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-account_type")
                            .from(Accounts::Table, Accounts::AccountType)
                            .to(AccountTypes::Table, AccountTypes::Name)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-bundle_id")
                            .from(Accounts::Table, Accounts::BundleId)
                            .to(Bundles::Table, Bundles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-account_id-unique")
                    .table(Accounts::Table)
                    .col(Accounts::AccountId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Balances
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Balances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Balances::AccountId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Balances::MainWallet).string().not_null())
                    .col(ColumnDef::new(Balances::Balance).string().not_null())
                    .col(
                        ColumnDef::new(Balances::TradingResultLastWeek)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Balances::Pl).string().not_null())
                    .col(
                        ColumnDef::new(Balances::TotalAchievement)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Balances::Share).string().not_null())
                    .col(ColumnDef::new(Balances::ProfitPer).string().not_null())
                    .col(ColumnDef::new(Balances::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balances-account_id")
                            .from(Balances::Table, Balances::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transaction channels
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(TransactionChannels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionChannels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionChannels::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionChannels::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::AmountEgp).string().not_null())
                    .col(ColumnDef::new(Transactions::AmountUsd).string().not_null())
                    .col(ColumnDef::new(Transactions::DeliveredRate).string().not_null())
                    .col(ColumnDef::new(Transactions::RealRate).string().not_null())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(
                        ColumnDef::new(Transactions::Paid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Transactions::PaidFlag)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::PaidAt).timestamp())
                    .col(ColumnDef::new(Transactions::SettledBy).integer())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Balances::Table, Balances::AccountId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-channel_id")
                            .from(Transactions::Table, Transactions::ChannelId)
                            .to(TransactionChannels::Table, TransactionChannels::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-kind-paid_flag")
                    .table(Transactions::Table)
                    .col(Transactions::Kind)
                    .col(Transactions::PaidFlag)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-settled_by")
                    .table(Transactions::Table)
                    .col(Transactions::SettledBy)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Total assets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(TotalAssets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TotalAssets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TotalAssets::Total).string().not_null())
                    .col(ColumnDef::new(TotalAssets::Pls).string().not_null())
                    .col(ColumnDef::new(TotalAssets::Deposits).string().not_null())
                    .col(ColumnDef::new(TotalAssets::Withdrawals).string().not_null())
                    .col(
                        ColumnDef::new(TotalAssets::PreviousWithdrawals)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TotalAssets::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Company finance
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FinanceTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FinanceTypes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FinanceTypes::Name).string().not_null())
                    .col(ColumnDef::new(FinanceTypes::Kind).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-finance_types-name-kind-unique")
                    .table(FinanceTypes::Table)
                    .col(FinanceTypes::Name)
                    .col(FinanceTypes::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyFinances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CompanyFinances::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CompanyFinances::FinanceTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompanyFinances::Amount).string().not_null())
                    .col(
                        ColumnDef::new(CompanyFinances::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-company_finances-finance_type_id")
                            .from(CompanyFinances::Table, CompanyFinances::FinanceTypeId)
                            .to(FinanceTypes::Table, FinanceTypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(CompanyFinances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FinanceTypes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TotalAssets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionChannels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Balances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bundles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountTypes::Table).to_owned())
            .await?;
        Ok(())
    }
}
