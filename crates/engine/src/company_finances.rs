//! Company finance ledger: revenue and expense events.
//!
//! Entries are append-only. Transaction spreads are the only producer today:
//! a positive spread is revenue, a negative one an expense, both recorded as
//! positive amounts rounded to cents.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, FinanceKind,
    money::round_money,
    util::{decimal_to_db, parse_decimal},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFinance {
    pub id: i64,
    pub name: String,
    pub kind: FinanceKind,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Totals over the whole ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub revenues: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

impl FinanceSummary {
    #[must_use]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a CompanyFinance>) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.kind {
                FinanceKind::Revenues => summary.revenues += entry.amount,
                FinanceKind::Expenses => summary.expenses += entry.amount,
            }
        }
        summary.net = summary.revenues - summary.expenses;
        summary
    }
}

/// Classify a signed spread.
///
/// Returns `None` when the spread rounds to zero cents.
#[must_use]
pub fn classify_spread(spread: Decimal) -> Option<(FinanceKind, Decimal)> {
    let amount = round_money(spread);
    if amount.is_zero() {
        None
    } else if amount.is_sign_positive() {
        Some((FinanceKind::Revenues, amount))
    } else {
        Some((FinanceKind::Expenses, -amount))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "company_finances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub finance_type_id: i64,
    pub amount: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::finance_types::Entity",
        from = "Column::FinanceTypeId",
        to = "super::finance_types::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    FinanceTypes,
}

impl Related<super::finance_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinanceTypes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn entry(finance_type_id: i64, amount: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ActiveValue::NotSet,
            finance_type_id: ActiveValue::Set(finance_type_id),
            amount: ActiveValue::Set(decimal_to_db(amount)),
            created_at: ActiveValue::Set(created_at),
        }
    }
}

impl TryFrom<(Model, super::finance_types::Model)> for CompanyFinance {
    type Error = EngineError;

    fn try_from(
        (model, finance_type): (Model, super::finance_types::Model),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: finance_type.name,
            kind: FinanceKind::try_from(finance_type.kind.as_str())?,
            amount: parse_decimal(&model.amount, "finance amount")?,
            created_at: model.created_at,
        })
    }
}
