use rust_decimal::Decimal;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Balance, ResultEngine, SettleCmd, SettlementInput, TotalAsset, Transaction, TransactionKind,
    balances, settlement::rebase_shares, total_assets, transactions,
};

use super::{Engine, with_tx};

async fn latest_row(db: &impl ConnectionTrait) -> ResultEngine<Option<TotalAsset>> {
    total_assets::Entity::find()
        .order_by_desc(total_assets::Column::Id)
        .one(db)
        .await?
        .map(TotalAsset::try_from)
        .transpose()
}

async fn all_balances(db: &DatabaseTransaction) -> ResultEngine<Vec<Balance>> {
    balances::Entity::find()
        .order_by_asc(balances::Column::AccountId)
        .all(db)
        .await?
        .into_iter()
        .map(Balance::try_from)
        .collect()
}

async fn save_balances(db: &DatabaseTransaction, rows: &[Balance]) -> ResultEngine<()> {
    for balance in rows {
        let model: balances::ActiveModel = balance.into();
        model.update(db).await?;
    }
    Ok(())
}

/// Count a paid withdrawal against the latest pool row, reconcile it and
/// rebase every share on the new total.
///
/// Returns `None` when no settlement ran yet.
pub(super) async fn apply_withdrawal_to_pool(
    db: &DatabaseTransaction,
    amount_usd: Decimal,
) -> ResultEngine<Option<TotalAsset>> {
    let Some(mut row) = latest_row(db).await? else {
        tracing::warn!(amount = %amount_usd, "withdrawal paid before any settlement, pool untouched");
        return Ok(None);
    };

    row.withdrawals += amount_usd;
    row.reconcile_withdrawals();
    let model: total_assets::ActiveModel = (&row).into();
    model.update(db).await?;

    let mut balances = all_balances(db).await?;
    if rebase_shares(&mut balances, row.total) {
        save_balances(db, &balances).await?;
    }
    tracing::debug!(total_asset_id = row.id, total = %row.total, "withdrawal reconciled");
    Ok(Some(row))
}

impl Engine {
    /// Run the weekly settlement and append its pool row.
    ///
    /// Every balance is credited with its part of the pool P/L and rebased on
    /// the new total in the same database transaction as the row insert. Paid
    /// deposits no earlier settlement absorbed are folded into the total and
    /// marked with the new row id.
    ///
    /// Fails with `OutOfOrder` when `cmd.as_of` precedes the latest row.
    pub async fn settle(&self, cmd: SettleCmd) -> ResultEngine<TotalAsset> {
        with_tx!(write self, |db_tx| {
            let previous = latest_row(&db_tx).await?;
            let mut balances = all_balances(&db_tx).await?;
            let deposits = transactions::Entity::find()
                .filter(transactions::Column::Kind.eq(TransactionKind::Deposit.as_str()))
                .filter(transactions::Column::PaidFlag.eq(true))
                .filter(transactions::Column::SettledBy.is_null())
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let plan = crate::plan_settlement(
                &SettlementInput {
                    previous: previous.as_ref(),
                    reported_total: cmd.reported_total,
                    recompute_from_wallets: cmd.recompute_from_wallets,
                    deposits: &deposits,
                    as_of: cmd.as_of,
                },
                &mut balances,
            )?;

            let mut row = plan.total_asset;
            let model: total_assets::ActiveModel = (&row).into();
            row.id = model.insert(&db_tx).await?.id;
            save_balances(&db_tx, &balances).await?;

            if !plan.absorbed.is_empty() {
                transactions::Entity::update_many()
                    .col_expr(transactions::Column::SettledBy, Expr::value(row.id))
                    .filter(transactions::Column::Id.is_in(plan.absorbed.clone()))
                    .exec(&db_tx)
                    .await?;
            }

            tracing::info!(
                total_asset_id = row.id,
                first = previous.is_none(),
                total = %row.total,
                pls = %row.pls,
                deposits = %row.deposits,
                absorbed = plan.absorbed.len(),
                accounts = balances.len(),
                shares_rebased = plan.shares_rebased,
                "settlement applied"
            );
            Ok(row)
        })
    }

    /// Return the latest pool row, if any settlement ran.
    pub async fn latest_total_asset(&self) -> ResultEngine<Option<TotalAsset>> {
        latest_row(&self.database).await
    }

    /// Return every pool row, oldest first.
    pub async fn total_assets(&self) -> ResultEngine<Vec<TotalAsset>> {
        total_assets::Entity::find()
            .order_by_asc(total_assets::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(TotalAsset::try_from)
            .collect()
    }
}
