//! Deposits and withdrawals.
//!
//! A [`Transaction`] moves USD in or out of an account's main wallet. The
//! operator may type the amount in EGP, in USD, or both; the missing side is
//! derived from the delivered rate. The difference between the delivered rate
//! and the real market rate is the *spread*, booked as company revenue or
//! expense.
//!
//! Ledger effects apply once: the first time the transaction is paid the
//! `paid_flag` latch closes and later calls are no-ops.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    Balance, EngineError, ResultEngine,
    money::round_money,
    util::{decimal_to_db, parse_decimal},
};

pub const DEPOSIT_SPREAD: &str = "Deposit Spread";
pub const WITHDRAWAL_SPREAD: &str = "Withdrawal Spread";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Company finance entry name for the spread of this kind.
    pub fn spread_name(self) -> &'static str {
        match self {
            Self::Deposit => DEPOSIT_SPREAD,
            Self::Withdrawal => WITHDRAWAL_SPREAD,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(EngineError::InvalidStoredValue(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Resolve both sides of an amount from whatever the operator typed.
///
/// Zero counts as missing. When only one side is given the other is derived
/// through `delivered_rate` (EGP per USD) and rounded to cents.
///
/// Returns `(amount_egp, amount_usd)`.
pub fn resolve_amounts(
    amount_egp: Option<Decimal>,
    amount_usd: Option<Decimal>,
    delivered_rate: Decimal,
) -> ResultEngine<(Decimal, Decimal)> {
    if delivered_rate <= Decimal::ZERO {
        return Err(EngineError::InvalidRate(
            "delivered rate must be > 0".to_string(),
        ));
    }
    let amount_egp = amount_egp.filter(|v| !v.is_zero());
    let amount_usd = amount_usd.filter(|v| !v.is_zero());
    for value in [amount_egp, amount_usd].into_iter().flatten() {
        if value < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(
                "amounts must be > 0".to_string(),
            ));
        }
    }

    match (amount_egp, amount_usd) {
        (None, None) => Err(EngineError::MissingAmount(
            "transaction must have at least one of amount EGP or amount USD".to_string(),
        )),
        (Some(egp), Some(usd)) => Ok((egp, usd)),
        (None, Some(usd)) => Ok((round_money(usd * delivered_rate), usd)),
        (Some(egp), None) => Ok((egp, round_money(egp / delivered_rate))),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Owning balance (keyed by account id).
    pub account_id: i64,
    pub channel_id: i64,
    pub kind: TransactionKind,
    pub amount_egp: Decimal,
    pub amount_usd: Decimal,
    /// EGP per USD applied to the client.
    pub delivered_rate: Decimal,
    /// EGP per USD on the market.
    pub real_rate: Decimal,
    pub date: NaiveDate,
    pub paid: bool,
    /// Latch: ledger effects already applied.
    pub paid_flag: bool,
    pub paid_at: Option<DateTime<Utc>>,
    /// Pool row whose settlement absorbed this deposit.
    pub settled_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Ledger effects produced by a paid transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaidEffects {
    pub kind: TransactionKind,
    /// Signed spread: positive is company revenue, negative an expense.
    pub spread: Decimal,
    pub amount_usd: Decimal,
}

impl Transaction {
    /// Build an unsaved, unpaid transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: i64,
        channel_id: i64,
        kind: TransactionKind,
        amount_egp: Option<Decimal>,
        amount_usd: Option<Decimal>,
        delivered_rate: Decimal,
        real_rate: Decimal,
        date: NaiveDate,
    ) -> ResultEngine<Self> {
        if real_rate <= Decimal::ZERO {
            return Err(EngineError::InvalidRate("real rate must be > 0".to_string()));
        }
        let (amount_egp, amount_usd) = resolve_amounts(amount_egp, amount_usd, delivered_rate)?;
        Ok(Self {
            id: 0,
            account_id,
            channel_id,
            kind,
            amount_egp,
            amount_usd,
            delivered_rate,
            real_rate,
            date,
            paid: false,
            paid_flag: false,
            paid_at: None,
            settled_by: None,
            created_at: Utc::now(),
        })
    }

    /// USD value of the EGP leg at the real market rate.
    #[must_use]
    pub fn real_usd_value(&self) -> Decimal {
        self.amount_egp / self.real_rate
    }

    /// Signed spread earned (positive) or lost (negative) by the company.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        match self.kind {
            TransactionKind::Deposit => self.amount_usd - self.real_usd_value(),
            TransactionKind::Withdrawal => self.real_usd_value() - self.amount_usd,
        }
    }

    /// Reject withdrawals larger than the account balance.
    pub fn ensure_covered(&self, balance: &Balance) -> ResultEngine<()> {
        if self.kind == TransactionKind::Withdrawal && self.amount_usd > balance.balance {
            return Err(EngineError::InsufficientFunds(format!(
                "current balance {} is lower than the transaction amount {}",
                balance.balance, self.amount_usd
            )));
        }
        Ok(())
    }

    /// Move the USD amount in or out of the main wallet.
    ///
    /// A withdrawal larger than the main wallet is first covered by positive
    /// P/L: the shortfall is taken from `pl`, what is left becomes the new
    /// main wallet and `pl` is cleared.
    pub fn apply_to_wallet(&self, balance: &mut Balance) {
        match self.kind {
            TransactionKind::Deposit => balance.main_wallet += self.amount_usd,
            TransactionKind::Withdrawal => {
                if self.amount_usd > balance.main_wallet && balance.pl > Decimal::ZERO {
                    balance.pl -= self.amount_usd - balance.main_wallet;
                    balance.main_wallet = balance.pl;
                    balance.pl = Decimal::ZERO;
                } else {
                    balance.main_wallet -= self.amount_usd;
                }
            }
        }
    }

    /// Paid transition.
    ///
    /// Returns `None` when the latch is already closed, leaving both the
    /// transaction and the balance untouched. Otherwise validates funds,
    /// applies the wallet movement and closes the latch. The caller refreshes
    /// and persists the balance.
    pub fn mark_paid(
        &mut self,
        balance: &mut Balance,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Option<PaidEffects>> {
        if self.paid_flag {
            return Ok(None);
        }
        self.ensure_covered(balance)?;
        self.apply_to_wallet(balance);
        self.paid = true;
        self.paid_flag = true;
        self.paid_at = Some(paid_at);
        Ok(Some(PaidEffects {
            kind: self.kind,
            spread: self.spread(),
            amount_usd: self.amount_usd,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub channel_id: i64,
    pub kind: String,
    pub amount_egp: String,
    pub amount_usd: String,
    pub delivered_rate: String,
    pub real_rate: String,
    pub date: Date,
    pub paid: bool,
    pub paid_flag: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub settled_by: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balances::Entity",
        from = "Column::AccountId",
        to = "super::balances::Column::AccountId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Balances,
    #[sea_orm(
        belongs_to = "super::channels::Entity",
        from = "Column::ChannelId",
        to = "super::channels::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Channels,
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl Related<super::channels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Channels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::NotSet,
            account_id: ActiveValue::Set(tx.account_id),
            channel_id: ActiveValue::Set(tx.channel_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_egp: ActiveValue::Set(decimal_to_db(tx.amount_egp)),
            amount_usd: ActiveValue::Set(decimal_to_db(tx.amount_usd)),
            delivered_rate: ActiveValue::Set(decimal_to_db(tx.delivered_rate)),
            real_rate: ActiveValue::Set(decimal_to_db(tx.real_rate)),
            date: ActiveValue::Set(tx.date),
            paid: ActiveValue::Set(tx.paid),
            paid_flag: ActiveValue::Set(tx.paid_flag),
            paid_at: ActiveValue::Set(tx.paid_at),
            settled_by: ActiveValue::Set(tx.settled_by),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            channel_id: model.channel_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_egp: parse_decimal(&model.amount_egp, "amount_egp")?,
            amount_usd: parse_decimal(&model.amount_usd, "amount_usd")?,
            delivered_rate: parse_decimal(&model.delivered_rate, "delivered_rate")?,
            real_rate: parse_decimal(&model.real_rate, "real_rate")?,
            date: model.date,
            paid: model.paid,
            paid_flag: model.paid_flag,
            paid_at: model.paid_at,
            settled_by: model.settled_by,
            created_at: model.created_at,
        })
    }
}
