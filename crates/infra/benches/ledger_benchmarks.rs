use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::NaiveDate;
use karatbook_accounting::{
    AccountKind, AccountMovement, LedgerAccount, PostEntry, PostingLineInput, trial_balance,
};
use karatbook_core::OrganizationId;
use karatbook_infra::ledger::LedgerService;
use karatbook_infra::store::InMemoryDataStore;
use rust_decimal::Decimal;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
}

/// Chart of `n` accounts with one balanced pair of movements per two accounts.
fn chart(n: usize) -> (Vec<LedgerAccount>, Vec<AccountMovement>) {
    let org = OrganizationId::new();
    let accounts: Vec<LedgerAccount> = (0..n)
        .map(|i| {
            let kind = if i % 2 == 0 {
                AccountKind::Asset
            } else {
                AccountKind::Income
            };
            LedgerAccount::open(org, format!("{:04}", 1000 + i), format!("Account {i}"), kind)
                .unwrap()
        })
        .collect();
    let movements = accounts
        .chunks(2)
        .filter(|pair| pair.len() == 2)
        .flat_map(|pair| {
            let amount = Decimal::new(12_500, 2);
            [
                AccountMovement {
                    account_id: pair[0].id,
                    debit_total: amount,
                    credit_total: Decimal::ZERO,
                },
                AccountMovement {
                    account_id: pair[1].id,
                    debit_total: Decimal::ZERO,
                    credit_total: amount,
                },
            ]
        })
        .collect();
    (accounts, movements)
}

fn bench_trial_balance_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("trial_balance_aggregation");

    for n in [10usize, 100, 1_000] {
        let (accounts, movements) = chart(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| trial_balance(black_box(as_of()), &accounts, &movements).unwrap());
        });
    }

    group.finish();
}

fn bench_posting_to_memory_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("posting");
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let store = Arc::new(InMemoryDataStore::new());
    let ledger = LedgerService::new(store);
    let org = OrganizationId::new();
    let accounts = rt.block_on(ledger.seed_default_chart(org)).unwrap();
    let (debit, credit) = (accounts[0].id, accounts[1].id);

    group.bench_function("post_entry_two_lines", |b| {
        b.iter(|| {
            let entry = PostEntry::new(
                org,
                as_of(),
                "bench",
                vec![
                    PostingLineInput::debit(debit, black_box(Decimal::new(1_000, 0))),
                    PostingLineInput::credit(credit, Decimal::new(1_000, 0)),
                ],
            );
            rt.block_on(ledger.post_entry(&entry)).unwrap();
        });
    });

    group.bench_function("trial_balance_from_store", |b| {
        b.iter(|| rt.block_on(ledger.trial_balance(org, as_of())).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_trial_balance_aggregation,
    bench_posting_to_memory_store
);
criterion_main!(benches);
