use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{Bundle, BundleCatalog, EngineError, NewBundleCmd, ResultEngine, bundles, util};

use super::{Engine, load_catalog, with_tx};

impl Engine {
    /// Add a fee tier.
    ///
    /// The bundle is checked on its own and against the existing ones: names
    /// are unique (case-insensitive) and ranges may not overlap. Whether the
    /// whole catalog covers every wallet value is only checked when the
    /// catalog is used.
    pub async fn new_bundle(&self, cmd: NewBundleCmd) -> ResultEngine<Bundle> {
        let name = util::normalize_required_name(&cmd.name, "bundle")?;
        let mut bundle = Bundle {
            id: 0,
            name,
            min_value: cmd.min_value,
            max_value: cmd.max_value,
            bundle_per: cmd.bundle_per,
            referral_per: cmd.referral_per,
            referral_breakeven_lvl: cmd.referral_breakeven_lvl,
        };
        bundle.validate()?;

        with_tx!(write self, |db_tx| {
            let exists = bundles::Entity::find()
                .filter(Expr::cust("LOWER(name)").eq(bundle.name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(bundle.name));
            }

            for model in bundles::Entity::find().all(&db_tx).await? {
                let existing = Bundle::try_from(model)?;
                if existing.overlaps(&bundle) {
                    return Err(EngineError::InvalidBundle(format!(
                        "bundle '{}' overlaps '{}'",
                        bundle.name, existing.name
                    )));
                }
            }

            let model: bundles::ActiveModel = (&bundle).into();
            bundle.id = model.insert(&db_tx).await?.id;
            tracing::info!(bundle_id = bundle.id, name = %bundle.name, "bundle created");
            Ok(bundle)
        })
    }

    /// Return every bundle ordered by lower bound.
    pub async fn bundles(&self) -> ResultEngine<Vec<Bundle>> {
        let mut bundles = bundles::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(Bundle::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        bundles.sort_by(|a, b| a.min_value.cmp(&b.min_value));
        Ok(bundles)
    }

    /// Return the validated catalog.
    pub async fn bundle_catalog(&self) -> ResultEngine<BundleCatalog> {
        with_tx!(self, |db_tx| load_catalog(&db_tx).await)
    }
}
