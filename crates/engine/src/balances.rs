//! Per-account ledger state.
//!
//! A [`Balance`] is owned by exactly one account and holds the principal
//! (`main_wallet`), the accrued profit/loss and the account's share of the
//! fund-wide pool.
//!
//! Any change to `main_wallet` or `total_achievement` outside a settlement
//! pass goes through [`Balance::refresh`], which runs the ledger pipeline in a
//! fixed order:
//!
//! 1. [`Balance::retier`]: pick the fee tier for the main wallet and derive
//!    `profit_per`;
//! 2. [`Balance::recompute`]: `balance = main_wallet + total_achievement`,
//!    floored at zero.
//!
//! The caller persists the result (balance row and the account's tier) in the
//! same database transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Bundle, BundleCatalog, EngineError, ResultEngine,
    money::ratio,
    util::{decimal_to_db, parse_decimal},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: i64,
    /// Principal capital, excluding accrued profit/loss.
    pub main_wallet: Decimal,
    pub balance: Decimal,
    pub trading_result_last_week: Decimal,
    /// Profit/loss not yet folded into the main wallet.
    pub pl: Decimal,
    /// Cumulative profit/loss credited since inception.
    pub total_achievement: Decimal,
    /// Fraction of the fund-wide pool.
    pub share: Decimal,
    /// Fraction of the profit kept once the bundle fee is netted.
    pub profit_per: Decimal,
}

/// What [`Balance::refresh`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerRefresh {
    pub bundle_id: i64,
    /// The floor rule reset the balance to zero.
    pub floored: bool,
}

impl Balance {
    #[must_use]
    pub fn new(account_id: i64) -> Self {
        Self {
            account_id,
            main_wallet: Decimal::ZERO,
            balance: Decimal::ZERO,
            trading_result_last_week: Decimal::ZERO,
            pl: Decimal::ZERO,
            total_achievement: Decimal::ZERO,
            share: Decimal::ZERO,
            profit_per: Decimal::ZERO,
        }
    }

    /// Resolve the fee tier for the main wallet and derive `profit_per`.
    ///
    /// A negative main wallet is tiered as zero.
    pub fn retier<'c>(&mut self, catalog: &'c BundleCatalog) -> ResultEngine<&'c Bundle> {
        let bundle = catalog.resolve(self.main_wallet.max(Decimal::ZERO))?;
        self.profit_per = bundle.profit_per();
        Ok(bundle)
    }

    /// Derive `balance` from its parts. Returns `true` when the floor rule
    /// kicked in.
    pub fn recompute(&mut self) -> bool {
        self.balance = self.main_wallet + self.total_achievement;
        if self.balance <= Decimal::ZERO {
            self.balance = Decimal::ZERO;
            self.main_wallet = Decimal::ZERO;
            self.pl = Decimal::ZERO;
            return true;
        }
        false
    }

    /// Run the ledger pipeline: retier, then recompute.
    pub fn refresh(&mut self, catalog: &BundleCatalog) -> ResultEngine<LedgerRefresh> {
        let bundle_id = self.retier(catalog)?.id;
        let floored = self.recompute();
        tracing::debug!(
            account_id = self.account_id,
            bundle_id,
            floored,
            balance = %self.balance,
            "ledger refreshed"
        );
        Ok(LedgerRefresh { bundle_id, floored })
    }

    /// Credit this account's part of the fund P/L.
    ///
    /// Uses the share and `profit_per` held before the call. `balance` is set
    /// to `pl + main_wallet` directly, the floor rule does not apply here.
    pub fn credit_weekly_result(&mut self, pls: Decimal) {
        self.trading_result_last_week = self.share * self.profit_per * pls;
        self.total_achievement += self.trading_result_last_week;
        self.pl += self.trading_result_last_week;
        self.balance = self.pl + self.main_wallet;
    }

    /// Recompute the share against the pool total. Returns `false`, leaving
    /// the share untouched, when the total is zero.
    pub fn rebase_share(&mut self, total: Decimal) -> bool {
        match ratio(self.balance, total) {
            Some(share) => {
                self.share = share;
                true
            }
            None => false,
        }
    }

    /// Last week's result relative to the balance before it, as a ratio
    /// rounded to 2 decimals.
    #[must_use]
    pub fn last_week_percentage(&self) -> Option<Decimal> {
        ratio(
            self.trading_result_last_week,
            self.balance - self.trading_result_last_week,
        )
        .map(|value| value.round_dp(2))
    }

    /// Total achievement relative to the main wallet, as a ratio.
    #[must_use]
    pub fn total_achievement_percentage(&self) -> Option<Decimal> {
        ratio(self.total_achievement, self.main_wallet)
    }

    #[must_use]
    pub fn share_percentage(&self) -> Decimal {
        (self.share * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: i64,
    pub main_wallet: String,
    pub balance: String,
    pub trading_result_last_week: String,
    pub pl: String,
    pub total_achievement: String,
    pub share: String,
    pub profit_per: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Balance> for ActiveModel {
    fn from(value: &Balance) -> Self {
        Self {
            account_id: ActiveValue::Set(value.account_id),
            main_wallet: ActiveValue::Set(decimal_to_db(value.main_wallet)),
            balance: ActiveValue::Set(decimal_to_db(value.balance)),
            trading_result_last_week: ActiveValue::Set(decimal_to_db(
                value.trading_result_last_week,
            )),
            pl: ActiveValue::Set(decimal_to_db(value.pl)),
            total_achievement: ActiveValue::Set(decimal_to_db(value.total_achievement)),
            share: ActiveValue::Set(decimal_to_db(value.share)),
            profit_per: ActiveValue::Set(decimal_to_db(value.profit_per)),
            updated_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for Balance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            account_id: model.account_id,
            main_wallet: parse_decimal(&model.main_wallet, "main_wallet")?,
            balance: parse_decimal(&model.balance, "balance")?,
            trading_result_last_week: parse_decimal(
                &model.trading_result_last_week,
                "trading_result_last_week",
            )?,
            pl: parse_decimal(&model.pl, "pl")?,
            total_achievement: parse_decimal(&model.total_achievement, "total_achievement")?,
            share: parse_decimal(&model.share, "share")?,
            profit_per: parse_decimal(&model.profit_per, "profit_per")?,
        })
    }
}
