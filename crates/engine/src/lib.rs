pub use accounts::Account;
pub use balances::{Balance, LedgerRefresh};
pub use bundles::{Bundle, BundleCatalog};
pub use commands::{NewAccountCmd, NewBundleCmd, SettleCmd, TransactionCmd};
pub use company_finances::{CompanyFinance, FinanceSummary, classify_spread};
pub use error::{EngineError, ErrorKind};
pub use finance_types::FinanceKind;
pub use money::Usd;
pub use ops::{Engine, EngineBuilder};
pub use settlement::{SettlementInput, SettlementPlan, plan_settlement};
pub use total_assets::TotalAsset;
pub use transactions::{
    DEPOSIT_SPREAD, PaidEffects, Transaction, TransactionKind, WITHDRAWAL_SPREAD, resolve_amounts,
};

mod account_types;
mod accounts;
mod balances;
mod bundles;
mod channels;
mod commands;
mod company_finances;
mod error;
mod finance_types;
pub mod money;
mod ops;
mod settlement;
mod total_assets;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
