use blockstore_core::{pow::MiningStrategy, ProofOfWork};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_pow(c: &mut Criterion) {
    let pow = ProofOfWork::new(16).expect("valid difficulty");

    c.bench_function("mine_block_target_16", |b| {
        b.iter(|| {
            let _mined = pow.mine(1_600_000_000, b"Genesis Block".to_vec(), vec![]);
        });
    });

    c.bench_function("mine_block_target_16_parallel", |b| {
        b.iter(|| {
            let _mined = pow.mine_with(
                MiningStrategy::Parallel,
                1_600_000_000,
                b"Genesis Block".to_vec(),
                vec![],
            );
        });
    });

    let block = pow.mine(1_600_000_000, b"Genesis Block".to_vec(), vec![]);
    c.bench_function("validate_block", |b| b.iter(|| pow.validate(&block)));
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
