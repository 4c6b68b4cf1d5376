//! Settlement throughput benchmarks

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledger_engine::{Account, Ledger, Transaction};
use rust_decimal::Decimal;

fn funded_ledger() -> Ledger {
    let ledger = Ledger::new();
    ledger.register_account(Account::create("A", Decimal::from(1_000_000_000), true).unwrap());
    ledger.register_account(Account::create("B", Decimal::from(1_000_000_000), true).unwrap());
    ledger
}

fn bench_withdrawal(c: &mut Criterion) {
    let ledger = funded_ledger();
    let now = Utc::now();

    c.bench_function("process_withdrawal", |b| {
        b.iter(|| {
            let t = Transaction::withdrawal("A", Decimal::new(1, 2), now).unwrap();
            black_box(ledger.process_transaction(t).unwrap());
        })
    });
}

fn bench_transfer(c: &mut Criterion) {
    let ledger = funded_ledger();
    let now = Utc::now();

    c.bench_function("process_transfer", |b| {
        b.iter(|| {
            let t = Transaction::transfer("B", "A", Decimal::new(1, 2), now).unwrap();
            black_box(ledger.process_transaction(t).unwrap());
        })
    });
}

criterion_group!(benches, bench_withdrawal, bench_transfer);
criterion_main!(benches);
