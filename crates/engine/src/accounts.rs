//! The module contains `Account` struct and its implementation.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An investor account.
///
/// The fee tier (`bundle_id`) is derived: the ledger recomputes it every time
/// the account's main wallet changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Public identifier, e.g. `I12` for the individual account with id 12.
    pub account_id: Option<String>,
    pub first_name: String,
    pub mid_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: String,
    pub mobile: String,
    pub address: Option<String>,
    pub account_type: String,
    pub date_of_investment: NaiveDate,
    pub bundle_id: Option<i64>,
    pub vod_cash_number: Option<String>,
    pub last_contacted: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Name as shown in the back office: `Ahmed M. Hassan`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let first = capitalize(&self.first_name);
        let last = capitalize(&self.last_name);
        match self.mid_name.as_deref().and_then(|m| m.chars().next()) {
            Some(initial) => format!("{first} {}. {last}", initial.to_uppercase()),
            None => format!("{first} {last}"),
        }
    }

    /// Age in whole years on `today`. `None` without a birth date or when
    /// `today` precedes it.
    #[must_use]
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        today.years_since(self.date_of_birth?)
    }

    #[must_use]
    pub fn has_vod_cash(&self) -> bool {
        self.vod_cash_number.is_some()
    }
}

/// Public account id: upper-cased first letter of the account type followed
/// by the numeric id.
pub(crate) fn public_account_id(account_type: &str, id: i64) -> String {
    let prefix: String = account_type
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default();
    format!("{prefix}{id}")
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: Option<String>,
    pub first_name: String,
    pub mid_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<Date>,
    pub email: String,
    pub mobile: String,
    pub address: Option<String>,
    pub account_type: String,
    pub date_of_investment: Date,
    pub bundle_id: Option<i64>,
    pub vod_cash_number: Option<String>,
    pub last_contacted: Option<DateTimeUtc>,
    pub comment: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account_types::Entity",
        from = "Column::AccountType",
        to = "super::account_types::Column::Name",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    AccountTypes,
    #[sea_orm(
        belongs_to = "super::bundles::Entity",
        from = "Column::BundleId",
        to = "super::bundles::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Bundles,
    #[sea_orm(has_one = "super::balances::Entity")]
    Balances,
}

impl Related<super::account_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountTypes.def()
    }
}

impl Related<super::bundles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bundles.def()
    }
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            first_name: model.first_name,
            mid_name: model.mid_name,
            last_name: model.last_name,
            date_of_birth: model.date_of_birth,
            email: model.email,
            mobile: model.mobile,
            address: model.address,
            account_type: model.account_type,
            date_of_investment: model.date_of_investment,
            bundle_id: model.bundle_id,
            vod_cash_number: model.vod_cash_number,
            last_contacted: model.last_contacted,
            comment: model.comment,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
