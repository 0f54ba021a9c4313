//! Trial balance, profit-and-loss and balance audit.
//!
//! Everything here is pure aggregation over [`AccountMovement`]s, the per-account
//! debit/credit totals the persistence layer returns from a single aggregate
//! select. Only posted entries contribute movements.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use karatbook_core::{AccountId, DomainError, DomainResult};

use crate::account::{AccountKind, LedgerAccount};
use crate::ledger::LedgerEntryDetail;

/// Gross debit/credit movement of one account over some date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMovement {
    pub account_id: AccountId,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
}

fn add(total: Decimal, by: Decimal, what: &str) -> DomainResult<Decimal> {
    total
        .checked_add(by)
        .ok_or_else(|| DomainError::invariant(format!("{what} overflow")))
}

/// Fold detail rows into per-account movements (ordered by account id).
pub fn movements_from_details<'a>(
    details: impl IntoIterator<Item = &'a LedgerEntryDetail>,
) -> DomainResult<Vec<AccountMovement>> {
    let mut by_account: BTreeMap<AccountId, (Decimal, Decimal)> = BTreeMap::new();
    for d in details {
        let totals = by_account
            .entry(d.account_id)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        totals.0 = add(totals.0, d.debit, "debit total")?;
        totals.1 = add(totals.1, d.credit, "credit total")?;
    }
    Ok(by_account
        .into_iter()
        .map(|(account_id, (debit_total, credit_total))| AccountMovement {
            account_id,
            debit_total,
            credit_total,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    /// Closing balance signed by the account's normal side.
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        self.total_debits == self.total_credits
    }
}

fn index_movements(
    accounts: &[LedgerAccount],
    movements: &[AccountMovement],
) -> DomainResult<HashMap<AccountId, AccountMovement>> {
    let known: HashMap<AccountId, &LedgerAccount> = accounts.iter().map(|a| (a.id, a)).collect();
    let mut index = HashMap::with_capacity(movements.len());
    for m in movements {
        if !known.contains_key(&m.account_id) {
            return Err(DomainError::invariant(format!(
                "movement references unknown account {}",
                m.account_id
            )));
        }
        let slot = index.entry(m.account_id).or_insert(AccountMovement {
            account_id: m.account_id,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
        });
        slot.debit_total = add(slot.debit_total, m.debit_total, "debit total")?;
        slot.credit_total = add(slot.credit_total, m.credit_total, "credit total")?;
    }
    Ok(index)
}

/// Build the trial balance from movements up to and including `as_of`.
///
/// Every account gets a row, even without movement. Unequal column totals
/// mean the stored details are corrupt and are reported as an invariant
/// violation.
pub fn trial_balance(
    as_of: NaiveDate,
    accounts: &[LedgerAccount],
    movements: &[AccountMovement],
) -> DomainResult<TrialBalance> {
    let index = index_movements(accounts, movements)?;

    let mut rows: Vec<TrialBalanceRow> = accounts
        .iter()
        .map(|a| {
            let (debit_total, credit_total) = index
                .get(&a.id)
                .map(|m| (m.debit_total, m.credit_total))
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            TrialBalanceRow {
                account_id: a.id,
                code: a.code.clone(),
                name: a.name.clone(),
                kind: a.kind,
                debit_total,
                credit_total,
                balance: a.kind.balance_from_totals(debit_total, credit_total),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.code.cmp(&b.code));

    let total_debits = rows
        .iter()
        .try_fold(Decimal::ZERO, |t, r| add(t, r.debit_total, "trial balance debits"))?;
    let total_credits = rows
        .iter()
        .try_fold(Decimal::ZERO, |t, r| add(t, r.credit_total, "trial balance credits"))?;

    let tb = TrialBalance {
        as_of,
        rows,
        total_debits,
        total_credits,
    };
    if !tb.is_balanced() {
        return Err(DomainError::invariant(format!(
            "trial balance out of balance (debits {total_debits}, credits {total_credits})"
        )));
    }
    Ok(tb)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
}

/// Income less expense over `[from, to]` (both inclusive).
///
/// `movements` must already be restricted to that window.
pub fn profit_and_loss(
    from: NaiveDate,
    to: NaiveDate,
    accounts: &[LedgerAccount],
    movements: &[AccountMovement],
) -> DomainResult<ProfitAndLoss> {
    if from > to {
        return Err(DomainError::validation(format!(
            "period start {from} is after period end {to}"
        )));
    }
    let index = index_movements(accounts, movements)?;

    let mut revenue = Decimal::ZERO;
    let mut cost = Decimal::ZERO;
    for account in accounts {
        let Some(m) = index.get(&account.id) else {
            continue;
        };
        match account.kind {
            AccountKind::Income => {
                revenue = add(revenue, m.credit_total - m.debit_total, "revenue")?;
            }
            AccountKind::Expense => {
                cost = add(cost, m.debit_total - m.credit_total, "cost")?;
            }
            _ => {}
        }
    }
    let profit = revenue
        .checked_sub(cost)
        .ok_or_else(|| DomainError::invariant("profit overflow"))?;

    Ok(ProfitAndLoss {
        from,
        to,
        revenue,
        cost,
        profit,
    })
}

/// A cached account balance that disagrees with its posted details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub account_id: AccountId,
    pub code: String,
    pub cached: Decimal,
    pub recomputed: Decimal,
}

/// Compare every cached balance against all-time movements.
pub fn balance_drift(
    accounts: &[LedgerAccount],
    movements: &[AccountMovement],
) -> DomainResult<Vec<BalanceDrift>> {
    let index = index_movements(accounts, movements)?;
    let mut drift: Vec<BalanceDrift> = accounts
        .iter()
        .filter_map(|a| {
            let recomputed = index
                .get(&a.id)
                .map(|m| a.kind.balance_from_totals(m.debit_total, m.credit_total))
                .unwrap_or(Decimal::ZERO);
            (recomputed != a.current_balance).then(|| BalanceDrift {
                account_id: a.id,
                code: a.code.clone(),
                cached: a.current_balance,
                recomputed,
            })
        })
        .collect();
    drift.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{EntryStatus, PostEntry, PostingLineInput, validate};
    use karatbook_core::{EntryId, OrganizationId};
    use proptest::prelude::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn account(org: OrganizationId, code: &str, kind: AccountKind) -> LedgerAccount {
        LedgerAccount::open(org, code, code, kind).unwrap()
    }

    fn post(
        org: OrganizationId,
        lines: Vec<PostingLineInput>,
    ) -> Vec<LedgerEntryDetail> {
        let cmd = PostEntry::new(org, date(1), "test", lines);
        validate(&cmd)
            .unwrap()
            .into_records(EntryId::new(), EntryStatus::Posted)
            .1
    }

    #[test]
    fn scenario_single_balanced_posting() {
        let org = OrganizationId::new();
        let a = account(org, "1000", AccountKind::Asset);
        let b = account(org, "4000", AccountKind::Income);
        let details = post(
            org,
            vec![
                PostingLineInput::debit(a.id, Decimal::new(1000, 0)),
                PostingLineInput::credit(b.id, Decimal::new(1000, 0)),
            ],
        );

        let movements = movements_from_details(&details).unwrap();
        let tb = trial_balance(date(2), &[a.clone(), b.clone()], &movements).unwrap();
        let row_a = tb.rows.iter().find(|r| r.account_id == a.id).unwrap();
        let row_b = tb.rows.iter().find(|r| r.account_id == b.id).unwrap();
        assert_eq!(row_a.debit_total, Decimal::new(1000, 0));
        assert_eq!(row_b.credit_total, Decimal::new(1000, 0));
        assert_eq!(tb.total_debits, Decimal::new(1000, 0));
        assert_eq!(tb.total_credits, Decimal::new(1000, 0));
    }

    #[test]
    fn no_movements_yields_zero_rows() {
        let org = OrganizationId::new();
        let accounts = vec![
            account(org, "1000", AccountKind::Asset),
            account(org, "2000", AccountKind::Liability),
        ];
        let tb = trial_balance(date(1), &accounts, &[]).unwrap();
        assert_eq!(tb.rows.len(), 2);
        assert!(tb.rows.iter().all(|r| r.debit_total.is_zero() && r.credit_total.is_zero()));
        assert!(tb.total_debits.is_zero() && tb.total_credits.is_zero());

        let pl = profit_and_loss(date(1), date(31), &accounts, &[]).unwrap();
        assert!(pl.revenue.is_zero() && pl.cost.is_zero() && pl.profit.is_zero());
    }

    #[test]
    fn rows_are_ordered_by_code() {
        let org = OrganizationId::new();
        let accounts = vec![
            account(org, "5000", AccountKind::Expense),
            account(org, "1000", AccountKind::Asset),
        ];
        let tb = trial_balance(date(1), &accounts, &[]).unwrap();
        assert_eq!(tb.rows[0].code, "1000");
    }

    #[test]
    fn unequal_columns_are_an_invariant_violation() {
        let org = OrganizationId::new();
        let a = account(org, "1000", AccountKind::Asset);
        let movements = [AccountMovement {
            account_id: a.id,
            debit_total: Decimal::new(10, 0),
            credit_total: Decimal::ZERO,
        }];
        assert!(matches!(
            trial_balance(date(1), &[a], &movements),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn overflowing_totals_are_errors_not_panics() {
        let org = OrganizationId::new();
        let cash = account(org, "1000", AccountKind::Asset);
        let sales = account(org, "4000", AccountKind::Income);
        let half = Decimal::MAX / Decimal::TWO + Decimal::ONE;
        let movements = [
            AccountMovement {
                account_id: cash.id,
                debit_total: half,
                credit_total: Decimal::ZERO,
            },
            AccountMovement {
                account_id: cash.id,
                debit_total: half,
                credit_total: Decimal::ZERO,
            },
            AccountMovement {
                account_id: sales.id,
                debit_total: Decimal::ZERO,
                credit_total: half,
            },
        ];
        let accounts = [cash, sales];
        assert!(trial_balance(date(1), &accounts, &movements).is_err());
        assert!(profit_and_loss(date(1), date(2), &accounts, &movements).is_err());
    }

    #[test]
    fn profit_is_income_less_expense() {
        let org = OrganizationId::new();
        let cash = account(org, "1000", AccountKind::Asset);
        let sales = account(org, "4000", AccountKind::Income);
        let wages = account(org, "6000", AccountKind::Expense);
        let mut details = post(
            org,
            vec![
                PostingLineInput::debit(cash.id, Decimal::new(5000, 0)),
                PostingLineInput::credit(sales.id, Decimal::new(5000, 0)),
            ],
        );
        details.extend(post(
            org,
            vec![
                PostingLineInput::debit(wages.id, Decimal::new(1200, 0)),
                PostingLineInput::credit(cash.id, Decimal::new(1200, 0)),
            ],
        ));

        let pl = profit_and_loss(
            date(1),
            date(31),
            &[cash, sales, wages],
            &movements_from_details(&details).unwrap(),
        )
        .unwrap();
        assert_eq!(pl.revenue, Decimal::new(5000, 0));
        assert_eq!(pl.cost, Decimal::new(1200, 0));
        assert_eq!(pl.profit, Decimal::new(3800, 0));
    }

    #[test]
    fn inverted_period_is_rejected() {
        assert!(matches!(
            profit_and_loss(date(10), date(1), &[], &[]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn drift_reports_only_mismatched_accounts() {
        let org = OrganizationId::new();
        let mut cash = account(org, "1000", AccountKind::Asset);
        let capital = account(org, "3000", AccountKind::Equity);
        let details = post(
            org,
            vec![
                PostingLineInput::debit(cash.id, Decimal::new(300, 0)),
                PostingLineInput::credit(capital.id, Decimal::new(300, 0)),
            ],
        );
        cash.current_balance = Decimal::new(300, 0);

        let movements = movements_from_details(&details).unwrap();
        let drift = balance_drift(&[cash.clone(), capital.clone()], &movements).unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].account_id, capital.id);
        assert_eq!(drift[0].recomputed, Decimal::new(300, 0));
    }

    fn kind_strategy() -> impl Strategy<Value = AccountKind> {
        prop_oneof![
            Just(AccountKind::Asset),
            Just(AccountKind::Liability),
            Just(AccountKind::Equity),
            Just(AccountKind::Income),
            Just(AccountKind::Expense),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Random balanced postings keep both trial-balance columns equal and
        /// profit exactly equal to revenue minus cost.
        #[test]
        fn aggregates_hold_for_random_postings(
            kinds in prop::collection::vec(kind_strategy(), 2..6),
            postings in prop::collection::vec((0usize..6, 0usize..6, 1i64..10_000_000i64), 0..20),
        ) {
            let org = OrganizationId::new();
            let accounts: Vec<LedgerAccount> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| account(org, &format!("{:04}", i), *k))
                .collect();

            let mut details = Vec::new();
            for (dr, cr, cents) in postings {
                let dr = &accounts[dr % accounts.len()];
                let cr = &accounts[cr % accounts.len()];
                let amount = Decimal::new(cents, 2);
                details.extend(post(org, vec![
                    PostingLineInput::debit(dr.id, amount),
                    PostingLineInput::credit(cr.id, amount),
                ]));
            }
            let movements = movements_from_details(&details).unwrap();

            let tb = trial_balance(date(28), &accounts, &movements).unwrap();
            prop_assert_eq!(tb.total_debits, tb.total_credits);

            let pl = profit_and_loss(date(1), date(28), &accounts, &movements).unwrap();
            prop_assert_eq!(pl.profit, pl.revenue - pl.cost);
        }
    }
}
