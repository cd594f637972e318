use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionCmd, TransactionKind, channels,
    transactions, util,
};

use super::{
    Engine, finance::record_spread, load_catalog, persist_ledger, require_balance,
    settlement::apply_withdrawal_to_pool, with_tx,
};

/// Paid transition of a stored transaction.
///
/// Order matters: wallet movement and tier refresh first, then the spread,
/// then the pool withdrawal counter, and the transaction row last.
async fn apply_paid(
    db: &DatabaseTransaction,
    mut tx: Transaction,
    paid_at: DateTime<Utc>,
) -> ResultEngine<Transaction> {
    let catalog = load_catalog(db).await?;
    let mut balance = require_balance(db, tx.account_id).await?;

    let Some(effects) = tx.mark_paid(&mut balance, paid_at)? else {
        return Err(EngineError::AlreadyApplied(format!("transaction {}", tx.id)));
    };
    let refresh = balance.refresh(&catalog)?;
    persist_ledger(db, &balance, refresh).await?;

    let booked = record_spread(db, effects.kind.spread_name(), effects.spread, paid_at).await?;
    if effects.kind == TransactionKind::Withdrawal {
        apply_withdrawal_to_pool(db, effects.amount_usd).await?;
    }

    transactions::ActiveModel {
        id: ActiveValue::Set(tx.id),
        paid: ActiveValue::Set(tx.paid),
        paid_flag: ActiveValue::Set(tx.paid_flag),
        paid_at: ActiveValue::Set(tx.paid_at),
        ..Default::default()
    }
    .update(db)
    .await?;

    tracing::info!(
        transaction_id = tx.id,
        account_id = tx.account_id,
        kind = tx.kind.as_str(),
        amount_usd = %tx.amount_usd,
        main_wallet = %balance.main_wallet,
        bundle_id = refresh.bundle_id,
        floored = refresh.floored,
        spread = ?booked,
        "transaction paid"
    );
    Ok(tx)
}

async fn require_transaction(db: &DatabaseTransaction, id: i64) -> ResultEngine<Transaction> {
    let model = transactions::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("transaction {id}")))?;
    Transaction::try_from(model)
}

impl Engine {
    /// Register a transaction channel (bank transfer, Vodafone cash, ...).
    pub async fn new_channel(&self, name: &str) -> ResultEngine<i64> {
        let name = util::normalize_required_name(name, "channel")?;
        with_tx!(write self, |db_tx| {
            let exists = channels::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }
            let model = channels::ActiveModel {
                id: ActiveValue::NotSet,
                name: ActiveValue::Set(name),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            Ok(model.id)
        })
    }

    /// Record a deposit or a withdrawal.
    ///
    /// Amounts and rates are validated up front, withdrawals are checked
    /// against the current balance. When `cmd.paid_at` is set the paid
    /// transition runs in the same database transaction.
    pub async fn record_transaction(&self, cmd: TransactionCmd) -> ResultEngine<Transaction> {
        let mut tx = Transaction::new(
            cmd.account_id,
            cmd.channel_id,
            cmd.kind,
            cmd.amount_egp,
            cmd.amount_usd,
            cmd.delivered_rate,
            cmd.real_rate,
            cmd.date,
        )?;

        with_tx!(write self, |db_tx| {
            let balance = require_balance(&db_tx, cmd.account_id).await?;
            channels::Entity::find_by_id(cmd.channel_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("channel {}", cmd.channel_id)))?;
            tx.ensure_covered(&balance)?;

            let model: transactions::ActiveModel = (&tx).into();
            tx.id = model.insert(&db_tx).await?.id;
            tracing::debug!(
                transaction_id = tx.id,
                account_id = tx.account_id,
                kind = tx.kind.as_str(),
                amount_usd = %tx.amount_usd,
                "transaction recorded"
            );

            if let Some(paid_at) = cmd.paid_at {
                tx = apply_paid(&db_tx, tx, paid_at).await?;
            }
            Ok(tx)
        })
    }

    /// Mark a recorded transaction as paid and apply its ledger effects.
    ///
    /// Fails with `AlreadyApplied` when the transaction was paid before. The
    /// latch is checked before any write, so nothing changes in that case and
    /// a retried payment can treat the error as done.
    pub async fn mark_paid(&self, id: i64, paid_at: DateTime<Utc>) -> ResultEngine<Transaction> {
        with_tx!(write self, |db_tx| {
            let tx = require_transaction(&db_tx, id).await?;
            apply_paid(&db_tx, tx, paid_at).await
        })
    }

    /// Return a transaction by id.
    pub async fn transaction(&self, id: i64) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| require_transaction(&db_tx, id).await)
    }

    /// Return the transactions of an account, oldest first.
    pub async fn transactions_for_account(&self, account_id: i64) -> ResultEngine<Vec<Transaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_asc(transactions::Column::Date)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}
