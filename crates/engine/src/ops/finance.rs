use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    CompanyFinance, EngineError, FinanceKind, FinanceSummary, ResultEngine, classify_spread,
    company_finances, finance_types,
};

use super::Engine;

/// Book a signed spread under `name`. Nothing is written when it rounds to
/// zero cents.
pub(super) async fn record_spread(
    db: &DatabaseTransaction,
    name: &str,
    spread: Decimal,
    at: DateTime<Utc>,
) -> ResultEngine<Option<(FinanceKind, Decimal)>> {
    let Some((kind, amount)) = classify_spread(spread) else {
        return Ok(None);
    };

    let finance_type_id = match finance_types::Entity::find()
        .filter(finance_types::Column::Name.eq(name))
        .filter(finance_types::Column::Kind.eq(kind.as_str()))
        .one(db)
        .await?
    {
        Some(model) => model.id,
        None => {
            finance_types::ActiveModel {
                id: ActiveValue::NotSet,
                name: ActiveValue::Set(name.to_string()),
                kind: ActiveValue::Set(kind.as_str().to_string()),
            }
            .insert(db)
            .await?
            .id
        }
    };

    company_finances::ActiveModel::entry(finance_type_id, amount, at)
        .insert(db)
        .await?;
    tracing::debug!(finance = name, kind = kind.as_str(), amount = %amount, "spread recorded");
    Ok(Some((kind, amount)))
}

impl Engine {
    /// Return every company finance entry, oldest first.
    pub async fn company_finances(&self) -> ResultEngine<Vec<CompanyFinance>> {
        company_finances::Entity::find()
            .find_also_related(finance_types::Entity)
            .order_by_asc(company_finances::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|(entry, finance_type)| {
                let finance_type = finance_type.ok_or_else(|| {
                    EngineError::KeyNotFound(format!("finance type of entry {}", entry.id))
                })?;
                CompanyFinance::try_from((entry, finance_type))
            })
            .collect()
    }

    /// Total revenues, expenses and their difference.
    pub async fn finance_summary(&self) -> ResultEngine<FinanceSummary> {
        let entries = self.company_finances().await?;
        Ok(FinanceSummary::from_entries(&entries))
    }
}
