use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Account, Balance, EngineError, NewAccountCmd, ResultEngine, account_types,
    accounts::{self, public_account_id},
    balances, transactions, util,
};

use super::{Engine, load_catalog, with_tx};

impl Engine {
    /// Register an account type such as `Individual`.
    pub async fn new_account_type(&self, name: &str) -> ResultEngine<String> {
        let name = util::normalize_required_name(name, "account type")?;
        with_tx!(write self, |db_tx| {
            if account_types::Entity::find_by_id(name.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(name));
            }
            account_types::ActiveModel {
                name: ActiveValue::Set(name.clone()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            Ok(name)
        })
    }

    /// Open an account together with its zeroed balance.
    ///
    /// The public `account_id` is derived from the database id right after
    /// insert, and the balance goes through the ledger pipeline so the account
    /// starts in the lowest tier.
    pub async fn open_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let first_name = util::normalize_required_name(&cmd.first_name, "first")?;
        let last_name = util::normalize_required_name(&cmd.last_name, "last")?;
        let now = Utc::now();

        with_tx!(write self, |db_tx| {
            account_types::Entity::find_by_id(cmd.account_type.clone())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(cmd.account_type.clone()))?;
            let catalog = load_catalog(&db_tx).await?;

            let model = accounts::ActiveModel {
                id: ActiveValue::NotSet,
                account_id: ActiveValue::Set(None),
                first_name: ActiveValue::Set(first_name),
                mid_name: ActiveValue::Set(util::normalize_optional_text(cmd.mid_name.as_deref())),
                last_name: ActiveValue::Set(last_name),
                date_of_birth: ActiveValue::Set(cmd.date_of_birth),
                email: ActiveValue::Set(cmd.email.trim().to_string()),
                mobile: ActiveValue::Set(cmd.mobile.trim().to_string()),
                address: ActiveValue::Set(util::normalize_optional_text(cmd.address.as_deref())),
                account_type: ActiveValue::Set(cmd.account_type.clone()),
                date_of_investment: ActiveValue::Set(cmd.date_of_investment),
                bundle_id: ActiveValue::Set(None),
                vod_cash_number: ActiveValue::Set(util::normalize_optional_text(
                    cmd.vod_cash_number.as_deref(),
                )),
                last_contacted: ActiveValue::Set(None),
                comment: ActiveValue::Set(util::normalize_optional_text(cmd.comment.as_deref())),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            let mut balance = Balance::new(model.id);
            let refresh = balance.refresh(&catalog)?;
            let balance_model: balances::ActiveModel = (&balance).into();
            balance_model.insert(&db_tx).await?;

            let mut model: accounts::ActiveModel = model.into();
            let public_id = public_account_id(&cmd.account_type, balance.account_id);
            model.account_id = ActiveValue::Set(Some(public_id));
            model.bundle_id = ActiveValue::Set(Some(refresh.bundle_id));
            let model = model.update(&db_tx).await?;

            tracing::info!(account_id = model.id, public_id = ?model.account_id, "account opened");
            Ok(Account::from(model))
        })
    }

    /// Return an account by id.
    pub async fn account(&self, id: i64) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("account {id}")))?;
        Ok(Account::from(model))
    }

    /// Delete an account with its balance and transactions.
    pub async fn delete_account(&self, id: i64) -> ResultEngine<()> {
        with_tx!(write self, |db_tx| {
            accounts::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("account {id}")))?;

            // Children first so the delete does not depend on the FK pragma.
            transactions::Entity::delete_many()
                .filter(transactions::Column::AccountId.eq(id))
                .exec(&db_tx)
                .await?;
            balances::Entity::delete_by_id(id).exec(&db_tx).await?;
            accounts::Entity::delete_by_id(id).exec(&db_tx).await?;

            tracing::info!(account_id = id, "account deleted");
            Ok(())
        })
    }
}
