use criterion::{criterion_group, criterion_main, Criterion};

use adya_core::history::types::{Operation, Transaction, TransactionId};
use adya_core::{check, History, IsolationLevel};

/// Deterministic synthetic history: `n` transactions over `k` keys, each
/// reading the latest value of one key and overwriting another.
fn synthetic_history(n: u64, k: u64) -> History<u64, u64> {
    let init: Vec<(u64, u64)> = (0..k).map(|key| (key, 0)).collect();
    let mut latest: Vec<u64> = vec![0; k as usize];
    let mut transactions = Vec::new();
    for id in 1..=n {
        let read_key = (id * 7) % k;
        let write_key = (id * 13) % k;
        let ops = vec![
            Operation::read(read_key, latest[read_key as usize]),
            Operation::write(write_key, id),
        ];
        latest[write_key as usize] = id;
        transactions.push(
            Transaction::committed(TransactionId(id), ops).with_stamps(id * 10, id * 10 + 5),
        );
    }
    History::new(init, transactions).expect("synthetic history is well formed")
}

fn bench_check(c: &mut Criterion) {
    let small = synthetic_history(100, 10);
    let large = synthetic_history(1000, 50);

    c.bench_function("check_serializable_100", |b| {
        b.iter(|| check(&small, IsolationLevel::Serializable, None).unwrap());
    });
    c.bench_function("check_serializable_1000", |b| {
        b.iter(|| check(&large, IsolationLevel::Serializable, None).unwrap());
    });
    c.bench_function("check_read_committed_1000", |b| {
        b.iter(|| check(&large, IsolationLevel::ReadCommitted, None).unwrap());
    });
}

criterion_group!(benches, bench_check);
criterion_main!(benches);
