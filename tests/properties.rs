use migsat::*;

/// xorshift64, so the generated networks are the same on every run.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    fn coin(&mut self) -> bool {
        self.next() & 1 == 1
    }
}

fn random_mig(seed: u64) -> Mig {
    let mut rng = Rng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);
    let mut mig = Mig::new();
    let n_inputs = 3 + rng.below(4);
    let mut signals = vec![mig.constant(false)];
    for _ in 0..n_inputs {
        signals.push(mig.create_input());
    }
    let n_gates = 4 + rng.below(9);
    for _ in 0..n_gates {
        let mut pick = || {
            let s = signals[rng.below(signals.len())];
            s ^ rng.coin()
        };
        let (a, b, c) = (pick(), pick(), pick());
        let m = mig.create_maj(a, b, c);
        signals.push(m);
    }
    let n_outputs = 1 + rng.below(3);
    for i in 0..n_outputs {
        // the last gate always feeds an output
        let s = if i == 0 {
            signals[signals.len() - 1]
        } else {
            signals[1 + rng.below(signals.len() - 1)]
        };
        let inverted = rng.coin();
        mig.create_output(s ^ inverted);
    }
    mig
}

fn settings() -> CompilerSettings {
    CompilerSettings {
        limits: RunnerLimits {
            iter_limit: 6,
            node_limit: 3_000,
            class_limit: usize::MAX,
            time_limit: std::time::Duration::from_secs(600),
        },
        ..Default::default()
    }
}

fn without_timings(mut stats: CompilerStatistics) -> CompilerStatistics {
    stats.t_runner = 0;
    stats.t_extractor = 0;
    stats.t_compiler = 0;
    stats
}

const SEEDS: std::ops::Range<u64> = 1..17;

#[test]
fn rewriting_preserves_function() {
    let _ = env_logger::builder().is_test(true).try_init();
    for seed in SEEDS {
        let mig = random_mig(seed);
        let (opt, stats, copy) = rewrite(settings(), &mig, Mig::new()).unwrap();
        assert_eq!(opt.simulate(), mig.simulate(), "seed {}", seed);
        assert_eq!(copy.simulate(), mig.simulate(), "seed {}", seed);
        assert_eq!(opt.num_inputs(), mig.num_inputs());
        assert_eq!(opt.num_gates(), stats.instruction_count);
    }
}

#[test]
fn cost_never_increases() {
    for seed in SEEDS {
        let mig = random_mig(seed);
        for preoptimize in [true, false] {
            let settings = CompilerSettings {
                preoptimize,
                ..settings()
            };
            let (_, stats) = compile(settings, &mig, Discard).unwrap();
            assert!(
                stats.instruction_count <= mig.num_gates(),
                "seed {}: {} > {}",
                seed,
                stats.instruction_count,
                mig.num_gates()
            );
        }
    }
}

#[test]
fn no_op_configuration_only_shares() {
    let no_op = CompilerSettings {
        preoptimize: false,
        rewrite: false,
        ..Default::default()
    };
    for seed in SEEDS {
        let mig = random_mig(seed);
        let hash_consed = mig.send(Mig::new()).unwrap();
        let (opt, stats, ()) = rewrite(no_op, &mig, Discard).unwrap();
        assert_eq!(stats.instruction_count, hash_consed.num_gates(), "seed {}", seed);
        assert_eq!(opt.simulate(), mig.simulate());
    }
}

#[test]
fn saturation_keeps_congruence() {
    for seed in SEEDS {
        let mig = random_mig(seed);
        let translation = mig.send(EGraphReceiver::default()).unwrap();
        let runner = Runner::new(settings().limits)
            .with_egraph(translation.egraph)
            .run(REWRITE_RULES.iter());
        let egraph = &runner.egraph;
        assert!(egraph.is_clean());
        assert!(egraph.is_congruent(), "seed {}", seed);
        for class in egraph.classes() {
            let id = class.id;
            assert_eq!(egraph.find(id), id);
            assert_eq!(egraph.find(egraph.find(id)), egraph.find(id));
        }
        for &(out, _) in &translation.outputs {
            let canon = egraph.find(out);
            assert_eq!(egraph.find(canon), canon);
        }
    }
}

#[test]
fn runs_are_deterministic() {
    for seed in SEEDS.step_by(3) {
        let mig = random_mig(seed);
        let (first, first_stats, ()) = rewrite(settings(), &mig, Discard).unwrap();
        let (second, second_stats, ()) = rewrite(settings(), &mig, Discard).unwrap();
        assert_eq!(first, second, "seed {}", seed);
        assert_eq!(without_timings(first_stats), without_timings(second_stats));
    }
}

#[test]
fn inverters_are_free() {
    let mut mig = Mig::new();
    let a = mig.create_input();
    let b = mig.create_input();
    mig.create_output(!a);
    mig.create_output(!!b);
    mig.create_output(!mig.constant(false));
    let (opt, stats, ()) = rewrite(CompilerSettings::default(), &mig, Discard).unwrap();
    assert_eq!(stats.instruction_count, 0);
    assert_eq!(opt.num_gates(), 0);
    assert_eq!(opt.simulate(), mig.simulate());

    let expr: RecExpr<MigLanguage> = "(! (! (! (! (! x0)))))".parse().unwrap();
    let mut egraph = EGraph::default();
    let root = egraph.add_expr(&expr);
    egraph.rebuild();
    let extractor = Extractor::new(&egraph, MajorityCount);
    assert_eq!(extractor.find_best_cost(root), Some(0));
}
