//! Weekly settlement planning.
//!
//! [`plan_settlement`] is pure: it takes a snapshot of the previous pool row,
//! every balance and the paid deposits, mutates the balances in place and
//! returns the new pool row. The engine loads the snapshot and writes the
//! result back inside one database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    Balance, EngineError, ResultEngine, TotalAsset, Transaction, TransactionKind,
    money::round_money,
};

/// Settlement inputs besides the balances.
#[derive(Clone, Debug)]
pub struct SettlementInput<'a> {
    /// Latest pool row, `None` on the first settlement.
    pub previous: Option<&'a TotalAsset>,
    /// Pool total reported by the trading desk.
    pub reported_total: Decimal,
    /// First settlement only: ignore `reported_total` and sum the main
    /// wallets instead.
    pub recompute_from_wallets: bool,
    /// Candidate deposits; only paid ones no settlement absorbed yet count.
    pub deposits: &'a [Transaction],
    pub as_of: DateTime<Utc>,
}

/// Outcome of a settlement pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub total_asset: TotalAsset,
    /// Deposits folded into `total_asset.deposits`, to be marked settled.
    pub absorbed: Vec<i64>,
    /// `false` when the pool total was zero and shares were left as they were.
    pub shares_rebased: bool,
}

/// Paid deposits not absorbed by an earlier settlement.
///
/// Business timestamps play no part: a deposit enters the pool exactly once,
/// in the first settlement that runs after it was paid.
pub fn pending_deposits(deposits: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    deposits.iter().filter(|tx| {
        tx.kind == TransactionKind::Deposit && tx.paid_flag && tx.settled_by.is_none()
    })
}

/// Sum the pending deposits, rounded to cents.
#[must_use]
pub fn period_deposits(deposits: &[Transaction]) -> Decimal {
    round_money(pending_deposits(deposits).map(|tx| tx.amount_usd).sum())
}

/// Run one settlement pass over `balances`.
///
/// Fails with `OutOfOrder` when `as_of` is earlier than the previous row.
pub fn plan_settlement(
    input: &SettlementInput<'_>,
    balances: &mut [Balance],
) -> ResultEngine<SettlementPlan> {
    let mut row = TotalAsset::new(input.as_of);

    match input.previous {
        None => {
            row.total = if input.recompute_from_wallets {
                balances.iter().map(|b| b.main_wallet).sum()
            } else {
                input.reported_total
            };
        }
        Some(previous) => {
            if input.as_of < previous.created_at {
                return Err(EngineError::OutOfOrder(format!(
                    "settlement as of {} precedes the previous one at {}",
                    input.as_of, previous.created_at
                )));
            }
            row.total = input.reported_total;
            row.pls = row.total - previous.total;
            for balance in balances.iter_mut() {
                balance.credit_weekly_result(row.pls);
            }
        }
    }
    row.deposits = period_deposits(input.deposits);
    row.total += row.deposits;
    row.reconcile_withdrawals();

    let shares_rebased = rebase_shares(balances, row.total);
    Ok(SettlementPlan {
        total_asset: row,
        absorbed: pending_deposits(input.deposits).map(|tx| tx.id).collect(),
        shares_rebased,
    })
}

/// Recompute every share against `total`. Leaves shares untouched and returns
/// `false` when `total` is zero.
pub fn rebase_shares(balances: &mut [Balance], total: Decimal) -> bool {
    if total.is_zero() {
        tracing::warn!("pool total is zero, shares left unchanged");
        return false;
    }
    for balance in balances.iter_mut() {
        balance.rebase_share(total);
    }
    true
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::bundles::tests::d;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 8, day, 12, 0, 0).unwrap()
    }

    fn wallet(account_id: i64, main_wallet: &str) -> Balance {
        let mut balance = Balance::new(account_id);
        balance.main_wallet = d(main_wallet);
        balance.balance = d(main_wallet);
        balance
    }

    fn paid_deposit(usd: &str, paid_at: DateTime<Utc>) -> Transaction {
        let mut tx = Transaction::new(
            1,
            1,
            TransactionKind::Deposit,
            None,
            Some(d(usd)),
            d("15.7"),
            d("15.5"),
            NaiveDate::from_ymd_opt(2021, 8, 1).unwrap(),
        )
        .unwrap();
        tx.paid = true;
        tx.paid_flag = true;
        tx.paid_at = Some(paid_at);
        tx
    }

    #[test]
    fn first_settlement_sums_wallets() {
        let mut balances = vec![wallet(1, "1000"), wallet(2, "3000")];
        let plan = plan_settlement(
            &SettlementInput {
                previous: None,
                reported_total: d("123"),
                recompute_from_wallets: true,
                deposits: &[],
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();
        assert_eq!(plan.total_asset.total, d("4000"));
        assert_eq!(plan.total_asset.pls, Decimal::ZERO);
        assert_eq!(plan.total_asset.deposits, Decimal::ZERO);
        assert!(plan.shares_rebased);
        assert_eq!(balances[0].share, d("0.25"));
        assert_eq!(balances[1].share, d("0.75"));
    }

    #[test]
    fn first_settlement_can_trust_reported_total() {
        let mut balances = vec![wallet(1, "1000"), wallet(2, "3000")];
        let plan = plan_settlement(
            &SettlementInput {
                previous: None,
                reported_total: d("5000"),
                recompute_from_wallets: false,
                deposits: &[],
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();
        assert_eq!(plan.total_asset.total, d("5000"));
        assert_eq!(balances[0].share, d("0.2"));
    }

    #[test]
    fn subsequent_settlement_distributes_pls() {
        let mut previous = TotalAsset::new(at(7));
        previous.total = d("4000");
        let mut balances = vec![wallet(1, "1000"), wallet(2, "3000")];
        balances[0].share = d("0.25");
        balances[0].profit_per = d("0.95");
        balances[1].share = d("0.75");
        balances[1].profit_per = d("0.97");

        let plan = plan_settlement(
            &SettlementInput {
                previous: Some(&previous),
                reported_total: d("4400"),
                recompute_from_wallets: true,
                deposits: &[],
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();

        assert_eq!(plan.total_asset.pls, d("400"));
        assert_eq!(plan.total_asset.total, d("4400"));
        assert_eq!(balances[0].trading_result_last_week, d("95"));
        assert_eq!(balances[0].balance, d("1095"));
        assert_eq!(balances[1].trading_result_last_week, d("291"));
        assert_eq!(balances[1].balance, d("3291"));
        for balance in &balances {
            assert_eq!(balance.balance, balance.pl + balance.main_wallet);
        }
        // Fees stay in the pool, so the accounts hold slightly less than all of it.
        let shares: Decimal = balances.iter().map(|b| b.share).sum();
        assert!((shares - d("4386") / d("4400")).abs() < d("0.000001"), "{shares}");
    }

    #[test]
    fn only_unsettled_deposits_are_counted() {
        let mut previous = TotalAsset::new(at(7));
        previous.id = 1;
        previous.total = d("4000");
        let mut absorbed = paid_deposit("100", at(6));
        absorbed.id = 1;
        absorbed.settled_by = Some(1);
        // Stamped before the previous row but paid after it ran.
        let mut backdated = paid_deposit("600", at(5));
        backdated.id = 2;
        let mut dust = paid_deposit("0.005", at(11));
        dust.id = 3;
        let deposits = vec![absorbed, backdated, dust];
        let mut balances = vec![wallet(1, "4000")];
        balances[0].share = Decimal::ONE;
        balances[0].profit_per = Decimal::ONE;

        let plan = plan_settlement(
            &SettlementInput {
                previous: Some(&previous),
                reported_total: d("4000"),
                recompute_from_wallets: true,
                deposits: &deposits,
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();
        assert_eq!(plan.total_asset.deposits, d("600.00"));
        assert_eq!(plan.total_asset.total, d("4600"));
        assert_eq!(plan.absorbed, vec![2, 3]);
    }

    #[test]
    fn deposit_stamped_after_as_of_is_still_counted_once() {
        let mut late = paid_deposit("600", at(20));
        late.id = 7;
        let mut balances = vec![wallet(1, "1000")];
        let plan = plan_settlement(
            &SettlementInput {
                previous: None,
                reported_total: Decimal::ZERO,
                recompute_from_wallets: true,
                deposits: std::slice::from_ref(&late),
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();
        assert_eq!(plan.total_asset.deposits, d("600"));
        assert_eq!(plan.absorbed, vec![7]);

        late.settled_by = Some(1);
        assert_eq!(period_deposits(std::slice::from_ref(&late)), Decimal::ZERO);
    }

    #[test]
    fn settlement_before_previous_row_is_rejected() {
        let mut previous = TotalAsset::new(at(14));
        previous.total = d("1000");
        let mut balances = vec![wallet(1, "1000")];
        balances[0].share = Decimal::ONE;

        let err = plan_settlement(
            &SettlementInput {
                previous: Some(&previous),
                reported_total: d("1200"),
                recompute_from_wallets: true,
                deposits: &[],
                as_of: at(13),
            },
            &mut balances,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrder(_)));
        assert_eq!(balances[0].pl, Decimal::ZERO);
    }

    #[test]
    fn first_settlement_counts_every_paid_deposit() {
        let mut unpaid = paid_deposit("50", at(3));
        unpaid.paid = false;
        unpaid.paid_flag = false;
        unpaid.paid_at = None;
        let deposits = vec![paid_deposit("100", at(2)), unpaid];
        assert_eq!(period_deposits(&deposits), d("100"));
    }

    #[test]
    fn zero_total_keeps_shares() {
        let mut balances = vec![wallet(1, "0")];
        balances[0].share = d("0.4");
        let plan = plan_settlement(
            &SettlementInput {
                previous: None,
                reported_total: Decimal::ZERO,
                recompute_from_wallets: true,
                deposits: &[],
                as_of: at(14),
            },
            &mut balances,
        )
        .unwrap();
        assert!(!plan.shares_rebased);
        assert_eq!(balances[0].share, d("0.4"));
    }
}
