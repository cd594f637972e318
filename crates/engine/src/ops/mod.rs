use sea_orm::{ActiveValue, DatabaseConnection, DatabaseTransaction, prelude::*};
use tokio::sync::Mutex;

use crate::{Balance, Bundle, BundleCatalog, EngineError, LedgerRefresh, ResultEngine};

mod accounts;
mod bundles;
mod finance;
mod ledger;
mod settlement;
mod transactions;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The `write` form also holds the engine writer guard for the whole block, so
/// ledger mutations never interleave.
macro_rules! with_tx {
    (write $self:expr, |$tx:ident| $body:expr) => {{
        let _writer = $self.writer.lock().await;
        with_tx!($self, |$tx| $body)
    }};
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    writer: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Load every bundle and validate them as a catalog.
async fn load_catalog(db: &DatabaseTransaction) -> ResultEngine<BundleCatalog> {
    let bundles = crate::bundles::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(Bundle::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    BundleCatalog::new(bundles)
}

async fn require_balance(db: &DatabaseTransaction, account_id: i64) -> ResultEngine<Balance> {
    let model = crate::balances::Entity::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("balance of account {account_id}")))?;
    Balance::try_from(model)
}

/// Write a refreshed balance and the account's tier.
async fn persist_ledger(
    db: &DatabaseTransaction,
    balance: &Balance,
    refresh: LedgerRefresh,
) -> ResultEngine<()> {
    let balance_model: crate::balances::ActiveModel = balance.into();
    balance_model.update(db).await?;

    let account_model = crate::accounts::ActiveModel {
        id: ActiveValue::Set(balance.account_id),
        bundle_id: ActiveValue::Set(Some(refresh.bundle_id)),
        updated_at: ActiveValue::Set(chrono::Utc::now()),
        ..Default::default()
    };
    account_model.update(db).await?;
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            writer: Mutex::new(()),
        })
    }
}
