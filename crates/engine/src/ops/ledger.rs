use rust_decimal::Decimal;
use sea_orm::TransactionTrait;

use crate::{Balance, ResultEngine};

use super::{Engine, load_catalog, persist_ledger, require_balance, with_tx};

impl Engine {
    /// Return the balance of an account.
    pub async fn balance(&self, account_id: i64) -> ResultEngine<Balance> {
        with_tx!(self, |db_tx| require_balance(&db_tx, account_id).await)
    }

    /// Overwrite the main wallet (opening capital or operator correction) and
    /// run the ledger pipeline.
    pub async fn set_main_wallet(&self, account_id: i64, value: Decimal) -> ResultEngine<Balance> {
        with_tx!(write self, |db_tx| {
            let catalog = load_catalog(&db_tx).await?;
            let mut balance = require_balance(&db_tx, account_id).await?;
            let previous = balance.main_wallet;
            balance.main_wallet = value;
            let refresh = balance.refresh(&catalog)?;
            persist_ledger(&db_tx, &balance, refresh).await?;
            tracing::info!(
                account_id,
                previous = %previous,
                main_wallet = %balance.main_wallet,
                bundle_id = refresh.bundle_id,
                "main wallet set"
            );
            Ok(balance)
        })
    }
}
