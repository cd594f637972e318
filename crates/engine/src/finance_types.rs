//! Company revenue/expense categories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinanceKind {
    Revenues,
    Expenses,
}

impl FinanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revenues => "Revenues",
            Self::Expenses => "Expenses",
        }
    }
}

impl TryFrom<&str> for FinanceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Revenues" => Ok(Self::Revenues),
            "Expenses" => Ok(Self::Expenses),
            other => Err(EngineError::InvalidStoredValue(format!(
                "invalid finance kind: {other}"
            ))),
        }
    }
}

/// `(name, kind)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "finance_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::company_finances::Entity")]
    CompanyFinances,
}

impl Related<super::company_finances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompanyFinances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
