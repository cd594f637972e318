//! Command structs for engine operations.
//!
//! These types group parameters for write operations (bundle setup, account
//! opening, transactions, settlement), keeping call sites readable and
//! avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::TransactionKind;

/// Create a fee tier.
#[derive(Clone, Debug)]
pub struct NewBundleCmd {
    pub name: String,
    pub min_value: Decimal,
    pub max_value: Option<Decimal>,
    pub bundle_per: Decimal,
    pub referral_per: Decimal,
    pub referral_breakeven_lvl: Decimal,
}

impl NewBundleCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, min_value: Decimal, bundle_per: Decimal) -> Self {
        Self {
            name: name.into(),
            min_value,
            max_value: None,
            bundle_per,
            referral_per: Decimal::ZERO,
            referral_breakeven_lvl: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn max_value(mut self, max_value: Decimal) -> Self {
        self.max_value = Some(max_value);
        self
    }

    #[must_use]
    pub fn referral_per(mut self, referral_per: Decimal) -> Self {
        self.referral_per = referral_per;
        self
    }

    #[must_use]
    pub fn referral_breakeven_lvl(mut self, level: Decimal) -> Self {
        self.referral_breakeven_lvl = level;
        self
    }
}

/// Open an investor account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub first_name: String,
    pub mid_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub mobile: String,
    pub address: Option<String>,
    pub account_type: String,
    pub date_of_investment: NaiveDate,
    pub vod_cash_number: Option<String>,
    pub comment: Option<String>,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        mobile: impl Into<String>,
        account_type: impl Into<String>,
        date_of_investment: NaiveDate,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            mid_name: None,
            last_name: last_name.into(),
            date_of_birth: None,
            email: email.into(),
            mobile: mobile.into(),
            address: None,
            account_type: account_type.into(),
            date_of_investment,
            vod_cash_number: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn mid_name(mut self, mid_name: impl Into<String>) -> Self {
        self.mid_name = Some(mid_name.into());
        self
    }

    #[must_use]
    pub fn date_of_birth(mut self, date_of_birth: NaiveDate) -> Self {
        self.date_of_birth = Some(date_of_birth);
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn vod_cash_number(mut self, number: impl Into<String>) -> Self {
        self.vod_cash_number = Some(number.into());
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Record a deposit or a withdrawal.
///
/// At least one of the two amounts must be set. With `paid_at` set the
/// transaction is recorded already paid and its ledger effects apply at once.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub account_id: i64,
    pub channel_id: i64,
    pub kind: TransactionKind,
    pub amount_egp: Option<Decimal>,
    pub amount_usd: Option<Decimal>,
    pub delivered_rate: Decimal,
    pub real_rate: Decimal,
    pub date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(
        account_id: i64,
        channel_id: i64,
        kind: TransactionKind,
        delivered_rate: Decimal,
        real_rate: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            account_id,
            channel_id,
            kind,
            amount_egp: None,
            amount_usd: None,
            delivered_rate,
            real_rate,
            date,
            paid_at: None,
        }
    }

    #[must_use]
    pub fn amount_egp(mut self, amount: Decimal) -> Self {
        self.amount_egp = Some(amount);
        self
    }

    #[must_use]
    pub fn amount_usd(mut self, amount: Decimal) -> Self {
        self.amount_usd = Some(amount);
        self
    }

    #[must_use]
    pub fn paid(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = Some(paid_at);
        self
    }
}

/// Run a weekly settlement.
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub reported_total: Decimal,
    /// Only read on the first settlement; defaults to `true`.
    pub recompute_from_wallets: bool,
    pub as_of: DateTime<Utc>,
}

impl SettleCmd {
    #[must_use]
    pub fn new(reported_total: Decimal, as_of: DateTime<Utc>) -> Self {
        Self {
            reported_total,
            recompute_from_wallets: true,
            as_of,
        }
    }

    #[must_use]
    pub fn recompute_from_wallets(mut self, recompute: bool) -> Self {
        self.recompute_from_wallets = recompute;
        self
    }
}
