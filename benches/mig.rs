use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use migsat::*;

/// A ripple-carry adder: sum bits built from majorities, carries chained.
fn adder(bits: usize) -> Mig {
    let mut mig = Mig::new();
    let a: Vec<Signal> = (0..bits).map(|_| mig.create_input()).collect();
    let b: Vec<Signal> = (0..bits).map(|_| mig.create_input()).collect();
    let mut carry = mig.constant(false);
    for i in 0..bits {
        let next = mig.create_maj(a[i], b[i], carry);
        let partial = mig.create_maj(a[i], b[i], !carry);
        let sum = mig.create_maj(!next, carry, partial);
        mig.create_output(sum);
        carry = next;
    }
    mig.create_output(carry);
    mig
}

fn settings(iter_limit: usize) -> CompilerSettings {
    CompilerSettings {
        limits: RunnerLimits {
            iter_limit,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn bench_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewrite_adder");
    for bits in [2, 4, 8] {
        let mig = adder(bits);
        group.bench_with_input(BenchmarkId::from_parameter(bits), &mig, |b, mig| {
            b.iter(|| rewrite(settings(8), black_box(mig), Discard).unwrap())
        });
    }
    group.finish();
}

fn bench_phases(c: &mut Criterion) {
    let mig = adder(8);
    c.bench_function("preoptimize_adder_8", |b| {
        b.iter(|| preoptimize(black_box(&mig)).unwrap())
    });
    c.bench_function("hash_cons_only_adder_8", |b| {
        let no_op = CompilerSettings {
            preoptimize: false,
            rewrite: false,
            ..Default::default()
        };
        b.iter(|| compile(no_op, black_box(&mig), Discard).unwrap())
    });

    let translation = mig.send(EGraphReceiver::default()).unwrap();
    let runner = Runner::new(settings(8).limits)
        .with_egraph(translation.egraph.clone())
        .run(REWRITE_RULES.iter());
    c.bench_function("extract_adder_8", |b| {
        b.iter(|| Extractor::new(black_box(&runner.egraph), MajorityCount))
    });
}

criterion_group!(benches, bench_rewrite, bench_phases);
criterion_main!(benches);
