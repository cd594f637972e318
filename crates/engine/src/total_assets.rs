//! Fund-wide pool snapshots, one row per settlement.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    util::{decimal_to_db, parse_decimal},
};

/// Pool state recorded by a settlement pass.
///
/// Rows are append-only. The only later mutation is the withdrawal counter of
/// the latest row, bumped when a withdrawal is paid between two settlements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalAsset {
    pub id: i64,
    pub total: Decimal,
    /// Pool P/L since the previous row.
    pub pls: Decimal,
    /// Paid deposits folded into `total` by this row.
    pub deposits: Decimal,
    /// Withdrawals paid against this row.
    pub withdrawals: Decimal,
    /// Part of `withdrawals` already subtracted from `total`.
    pub previous_withdrawals: Decimal,
    pub created_at: DateTime<Utc>,
}

impl TotalAsset {
    #[must_use]
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            total: Decimal::ZERO,
            pls: Decimal::ZERO,
            deposits: Decimal::ZERO,
            withdrawals: Decimal::ZERO,
            previous_withdrawals: Decimal::ZERO,
            created_at,
        }
    }

    /// Subtract withdrawals not yet reflected in `total`. Returns `true` when
    /// the total changed.
    pub fn reconcile_withdrawals(&mut self) -> bool {
        if self.withdrawals == self.previous_withdrawals {
            return false;
        }
        self.total -= self.withdrawals - self.previous_withdrawals;
        self.previous_withdrawals = self.withdrawals;
        true
    }

    /// Net movement of the pool for the period.
    #[must_use]
    pub fn overall_value(&self) -> Decimal {
        self.pls + self.deposits - self.withdrawals
    }

    /// Friday closing the trading week this row reports on.
    #[must_use]
    pub fn weekend_date(&self) -> NaiveDate {
        last_friday(self.created_at.date_naive())
    }
}

/// For a weekday, the Friday of the previous week; for a weekend day, the
/// Friday just passed.
fn last_friday(date: NaiveDate) -> NaiveDate {
    let weekday = i64::from(date.weekday().num_days_from_monday());
    let friday = date - Duration::days(weekday) + Duration::days(4);
    if weekday < 5 {
        friday - Duration::weeks(1)
    } else {
        friday
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "total_assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub total: String,
    pub pls: String,
    pub deposits: String,
    pub withdrawals: String,
    pub previous_withdrawals: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TotalAsset> for ActiveModel {
    fn from(value: &TotalAsset) -> Self {
        Self {
            id: if value.id == 0 {
                ActiveValue::NotSet
            } else {
                ActiveValue::Unchanged(value.id)
            },
            total: ActiveValue::Set(decimal_to_db(value.total)),
            pls: ActiveValue::Set(decimal_to_db(value.pls)),
            deposits: ActiveValue::Set(decimal_to_db(value.deposits)),
            withdrawals: ActiveValue::Set(decimal_to_db(value.withdrawals)),
            previous_withdrawals: ActiveValue::Set(decimal_to_db(value.previous_withdrawals)),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for TotalAsset {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            total: parse_decimal(&model.total, "total")?,
            pls: parse_decimal(&model.pls, "pls")?,
            deposits: parse_decimal(&model.deposits, "deposits")?,
            withdrawals: parse_decimal(&model.withdrawals, "withdrawals")?,
            previous_withdrawals: parse_decimal(
                &model.previous_withdrawals,
                "previous_withdrawals",
            )?,
            created_at: model.created_at,
        })
    }
}
