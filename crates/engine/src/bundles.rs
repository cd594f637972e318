//! Fee tiers ("bundles") and the catalog used to pick one for a wallet.
//!
//! A bundle covers a closed range of main-wallet values and carries the
//! percentage the fund keeps from the profit of accounts in that range. An
//! account keeps `(100 - bundle_per) / 100` of its share of the weekly P/L.
//!
//! Catalog bounds are whole units, so `[0, 999]` followed by `[1000, ∞)` is a
//! complete catalog. A value falling in the seam between two whole-unit ranges
//! (for instance `999.50`) belongs to the lower range.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    util::{decimal_to_db, optional_decimal_to_db, parse_decimal, parse_optional_decimal},
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: i64,
    pub name: String,
    pub min_value: Decimal,
    /// Upper bound, inclusive. `None` means unbounded.
    pub max_value: Option<Decimal>,
    /// Fee percentage kept by the fund, in `[0, 100]`.
    pub bundle_per: Decimal,
    pub referral_per: Decimal,
    pub referral_breakeven_lvl: Decimal,
}

impl Bundle {
    /// Check the bundle on its own: bounds and percentages.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.min_value < Decimal::ZERO {
            return Err(EngineError::InvalidBundle(format!(
                "bundle '{}': min_value must be >= 0",
                self.name
            )));
        }
        if let Some(max) = self.max_value
            && max < self.min_value
        {
            return Err(EngineError::InvalidBundle(format!(
                "bundle '{}': max_value must be >= min_value",
                self.name
            )));
        }
        for (label, value) in [
            ("bundle_per", self.bundle_per),
            ("referral_per", self.referral_per),
            ("referral_breakeven_lvl", self.referral_breakeven_lvl),
        ] {
            if value < Decimal::ZERO || value > HUNDRED {
                return Err(EngineError::InvalidBundle(format!(
                    "bundle '{}': {label} must be in [0, 100]",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Fraction of the profit the account keeps once the fee is netted.
    #[must_use]
    pub fn profit_per(&self) -> Decimal {
        (HUNDRED - self.bundle_per) / HUNDRED
    }

    #[must_use]
    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min_value && self.max_value.is_none_or(|max| value <= max)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Bundle) -> bool {
        let starts_before_other_ends = other.max_value.is_none_or(|max| self.min_value <= max);
        let other_starts_before_end = self.max_value.is_none_or(|max| other.min_value <= max);
        starts_before_other_ends && other_starts_before_end
    }
}

/// Validated, ordered set of bundles.
#[derive(Clone, Debug)]
pub struct BundleCatalog {
    bundles: Vec<Bundle>,
}

impl BundleCatalog {
    /// Build a catalog, rejecting configurations that leave wallet values
    /// without a tier.
    pub fn new(mut bundles: Vec<Bundle>) -> ResultEngine<Self> {
        if bundles.is_empty() {
            return Err(EngineError::InvalidBundle(
                "no bundle configured".to_string(),
            ));
        }
        for bundle in &bundles {
            bundle.validate()?;
        }
        bundles.sort_by(|a, b| a.min_value.cmp(&b.min_value));

        if !bundles[0].min_value.is_zero() {
            return Err(EngineError::InvalidBundle(format!(
                "bundle '{}' must start at 0",
                bundles[0].name
            )));
        }

        for pair in bundles.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let Some(lower_max) = lower.max_value else {
                return Err(EngineError::InvalidBundle(format!(
                    "bundle '{}' is unbounded but '{}' follows it",
                    lower.name, upper.name
                )));
            };
            if upper.min_value <= lower_max {
                return Err(EngineError::InvalidBundle(format!(
                    "bundles '{}' and '{}' overlap",
                    lower.name, upper.name
                )));
            }
            if upper.min_value - lower_max > Decimal::ONE {
                return Err(EngineError::InvalidBundle(format!(
                    "gap between bundles '{}' and '{}'",
                    lower.name, upper.name
                )));
            }
        }

        if let Some(last) = bundles.last()
            && last.max_value.is_some()
        {
            return Err(EngineError::InvalidBundle(format!(
                "last bundle '{}' must be unbounded",
                last.name
            )));
        }

        Ok(Self { bundles })
    }

    /// Return the bundle covering `wallet_value`.
    pub fn resolve(&self, wallet_value: Decimal) -> ResultEngine<&Bundle> {
        let candidate = self
            .bundles
            .iter()
            .rev()
            .find(|bundle| bundle.min_value <= wallet_value);

        match candidate {
            Some(bundle) if bundle.contains(wallet_value) => Ok(bundle),
            // Seam between two whole-unit ranges: stays in the lower tier.
            Some(bundle) if bundle.max_value.is_some() => Ok(bundle),
            _ => Err(EngineError::NoMatchingBundle(wallet_value.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bundles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub min_value: String,
    pub max_value: Option<String>,
    pub bundle_per: String,
    pub referral_per: String,
    pub referral_breakeven_lvl: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounts::Entity")]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bundle> for ActiveModel {
    fn from(value: &Bundle) -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(value.name.clone()),
            min_value: ActiveValue::Set(decimal_to_db(value.min_value)),
            max_value: ActiveValue::Set(optional_decimal_to_db(value.max_value)),
            bundle_per: ActiveValue::Set(decimal_to_db(value.bundle_per)),
            referral_per: ActiveValue::Set(decimal_to_db(value.referral_per)),
            referral_breakeven_lvl: ActiveValue::Set(decimal_to_db(value.referral_breakeven_lvl)),
            created_at: ActiveValue::Set(Utc::now()),
        }
    }
}

impl TryFrom<Model> for Bundle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            min_value: parse_decimal(&model.min_value, "bundle min_value")?,
            max_value: parse_optional_decimal(model.max_value.as_deref(), "bundle max_value")?,
            bundle_per: parse_decimal(&model.bundle_per, "bundle_per")?,
            referral_per: parse_decimal(&model.referral_per, "referral_per")?,
            referral_breakeven_lvl: parse_decimal(
                &model.referral_breakeven_lvl,
                "referral_breakeven_lvl",
            )?,
            name: model.name,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub(crate) fn bundle(id: i64, name: &str, min: &str, max: Option<&str>, per: &str) -> Bundle {
        Bundle {
            id,
            name: name.to_string(),
            min_value: d(min),
            max_value: max.map(d),
            bundle_per: d(per),
            referral_per: Decimal::ZERO,
            referral_breakeven_lvl: Decimal::ZERO,
        }
    }

    pub(crate) fn two_tier_catalog() -> BundleCatalog {
        BundleCatalog::new(vec![
            bundle(2, "Gold", "1000", None, "3"),
            bundle(1, "Silver", "0", Some("999"), "5"),
        ])
        .unwrap()
    }

    #[test]
    fn resolve_picks_containing_range() {
        let catalog = two_tier_catalog();
        assert_eq!(catalog.resolve(d("0")).unwrap().name, "Silver");
        assert_eq!(catalog.resolve(d("500")).unwrap().name, "Silver");
        assert_eq!(catalog.resolve(d("999")).unwrap().name, "Silver");
        assert_eq!(catalog.resolve(d("1000")).unwrap().name, "Gold");
        assert_eq!(catalog.resolve(d("1100")).unwrap().name, "Gold");
        assert_eq!(catalog.resolve(d("1000000")).unwrap().name, "Gold");
    }

    #[test]
    fn resolve_keeps_seam_values_in_lower_tier() {
        let catalog = two_tier_catalog();
        assert_eq!(catalog.resolve(d("999.50")).unwrap().name, "Silver");
    }

    #[test]
    fn resolve_rejects_negative_values() {
        let catalog = two_tier_catalog();
        assert_eq!(
            catalog.resolve(d("-1")).unwrap_err(),
            EngineError::NoMatchingBundle("-1".to_string())
        );
    }

    #[test]
    fn profit_per_nets_the_fee() {
        assert_eq!(bundle(1, "Silver", "0", Some("999"), "5").profit_per(), d("0.95"));
        assert_eq!(bundle(2, "Gold", "1000", None, "3").profit_per(), d("0.97"));
    }

    #[test]
    fn catalog_rejects_gaps_overlaps_and_open_ends() {
        let gap = BundleCatalog::new(vec![
            bundle(1, "A", "0", Some("999"), "5"),
            bundle(2, "B", "1500", None, "3"),
        ]);
        assert!(matches!(gap, Err(EngineError::InvalidBundle(_))));

        let overlap = BundleCatalog::new(vec![
            bundle(1, "A", "0", Some("1000"), "5"),
            bundle(2, "B", "1000", None, "3"),
        ]);
        assert!(matches!(overlap, Err(EngineError::InvalidBundle(_))));

        let bounded = BundleCatalog::new(vec![bundle(1, "A", "0", Some("999"), "5")]);
        assert!(matches!(bounded, Err(EngineError::InvalidBundle(_))));

        let late_start = BundleCatalog::new(vec![bundle(1, "A", "10", None, "5")]);
        assert!(matches!(late_start, Err(EngineError::InvalidBundle(_))));

        assert!(matches!(
            BundleCatalog::new(Vec::new()),
            Err(EngineError::InvalidBundle(_))
        ));
    }

    #[test]
    fn bundle_percentages_are_bounded() {
        let bad = bundle(1, "A", "0", None, "101");
        assert!(matches!(bad.validate(), Err(EngineError::InvalidBundle(_))));
        let inverted = bundle(1, "A", "10", Some("5"), "1");
        assert!(matches!(inverted.validate(), Err(EngineError::InvalidBundle(_))));
    }

    #[test]
    fn overlap_detection() {
        let a = bundle(1, "A", "0", Some("999"), "5");
        let b = bundle(2, "B", "1000", None, "3");
        let c = bundle(3, "C", "500", Some("1200"), "4");
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }
}
