//! The `compile` and `rewrite` entry points.
use log::*;
use thiserror::Error;

use crate::{
    util::Instant, EGraphReceiver, ExtractionError, Extractor, MajorityCount, Mig, Network,
    NetworkBuilder, NetworkError, Receiver, Runner, RunnerLimits, StopReason, REWRITE_RULES,
};

/// What a call to [`compile`] or [`rewrite`] should do.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct CompilerSettings {
    /// Print the optimized network.
    pub print_program: bool,
    /// Print the runner report, the optimized network and timings.
    pub verbose: bool,
    /// Simplify the network before it enters the egraph. Default: true
    pub preoptimize: bool,
    /// Saturate the egraph. When unset, extraction only removes
    /// structural duplicates. Default: true
    pub rewrite: bool,
    /// The saturation budget.
    pub limits: RunnerLimits,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            print_program: false,
            verbose: false,
            preoptimize: true,
            rewrite: true,
            limits: RunnerLimits::default(),
        }
    }
}

/// Sizes and timings of one call to [`compile`] or [`rewrite`].
///
/// Timings are in milliseconds; everything else is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize))]
pub struct CompilerStatistics {
    /// Number of eclasses in the final egraph.
    pub egraph_classes: usize,
    /// Number of enodes summed over all eclasses of the final egraph.
    pub egraph_nodes: usize,
    /// Number of distinct enodes in the final egraph.
    pub egraph_size: usize,
    /// Number of majority gates in the result.
    pub instruction_count: usize,
    /// Time spent saturating.
    pub t_runner: u64,
    /// Time spent choosing enodes.
    pub t_extractor: u64,
    /// Time spent rebuilding the network.
    pub t_compiler: u64,
    /// Why saturation stopped, `None` if it was skipped.
    pub stop_reason: Option<StopReason>,
    /// Number of saturation rounds that searched and applied rules.
    pub iterations: usize,
}

impl CompilerStatistics {
    /// Prints the timings, one per line.
    pub fn print_timings(&self) {
        println!("t_runner: {}ms", self.t_runner);
        println!("t_extractor: {}ms", self.t_extractor);
        println!("t_compiler: {}ms", self.t_compiler);
    }
}

/// Why a call to [`compile`] or [`rewrite`] failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input network is malformed.
    #[error("invalid network: {0}")]
    Network(#[from] NetworkError),
    /// The egraph lost an invariant on the way.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

fn millis(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Optimizes `ntk` and returns the result, its statistics, and what
/// `receiver` made of the result.
///
/// The input is validated (and preoptimized if asked to) before it is
/// translated into an egraph, saturated with [`REWRITE_RULES`] within
/// `settings.limits`, and read back out with [`MajorityCount`]. If the
/// extracted network has more majority gates than the network that went
/// into the egraph, that network is returned instead.
///
/// # Example
/// ```
/// use migsat::*;
///
/// let mut mig = Mig::new();
/// let a = mig.create_input();
/// let b = mig.create_input();
/// let c = mig.create_input();
/// let m = mig.create_maj(a, b, c);
/// let n = mig.create_maj(!m, a, b);
/// mig.create_output(n);
///
/// let (opt, stats, ()) = rewrite(CompilerSettings::default(), &mig, Discard).unwrap();
/// assert!(stats.instruction_count <= 2);
/// assert_eq!(opt.simulate(), mig.simulate());
/// ```
pub fn rewrite<N, R>(
    settings: CompilerSettings,
    ntk: &N,
    receiver: R,
) -> Result<(Mig, CompilerStatistics, R::Result), Error>
where
    N: Network,
    R: Receiver,
{
    let input = if settings.preoptimize {
        crate::preoptimize(ntk)?
    } else {
        ntk.send(Mig::new())?
    };
    let translation = input.send(EGraphReceiver::default())?;
    let mut stats = CompilerStatistics::default();

    let mut egraph = translation.egraph;
    if settings.rewrite {
        let start = Instant::now();
        let runner = Runner::new(settings.limits)
            .with_egraph(egraph)
            .run(REWRITE_RULES.iter());
        stats.t_runner = millis(start);
        if settings.verbose {
            println!("== Runner Report");
            runner.print_report();
        }
        stats.iterations = runner.rounds();
        stats.stop_reason = runner.stop_reason;
        egraph = runner.egraph;
    } else {
        egraph.rebuild();
    }
    stats.egraph_classes = egraph.number_of_classes();
    stats.egraph_nodes = egraph.total_number_of_nodes();
    stats.egraph_size = egraph.total_size();

    let start = Instant::now();
    let extractor = Extractor::new(&egraph, MajorityCount);
    stats.t_extractor = millis(start);

    let start = Instant::now();
    let mut output = NetworkBuilder::new(&egraph, &extractor, translation.num_inputs)
        .build(&translation.outputs)?;
    if output.num_gates() > input.num_gates() {
        info!(
            "Extracted {} gates from an input of {}, keeping the input",
            output.num_gates(),
            input.num_gates()
        );
        output = input;
    }
    stats.instruction_count = output.num_gates();
    let result = output.send(receiver)?;
    stats.t_compiler = millis(start);

    if settings.print_program || settings.verbose {
        if settings.verbose {
            println!("== Program");
        }
        println!("{}", output);
    }
    if settings.verbose {
        println!("== Timings");
        stats.print_timings();
    }
    info!(
        "Optimized to {} gates ({:?})",
        stats.instruction_count, stats.stop_reason
    );
    Ok((output, stats, result))
}

/// Optimizes `ntk` into `receiver` and returns what the receiver made
/// of it together with the statistics.
///
/// This is [`rewrite`] without handing back the optimized [`Mig`].
pub fn compile<N, R>(
    settings: CompilerSettings,
    ntk: &N,
    receiver: R,
) -> Result<(R::Result, CompilerStatistics), Error>
where
    N: Network,
    R: Receiver,
{
    let (_, stats, result) = rewrite(settings, ntk, receiver)?;
    Ok((result, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{util::Duration, Discard, Signal};

    fn majority_chain() -> Mig {
        let mut mig = Mig::new();
        let x: Vec<Signal> = (0..4).map(|_| mig.create_input()).collect();
        let m1 = mig.create_maj(x[0], x[1], x[2]);
        let m2 = mig.create_maj(x[0], x[1], m1);
        let m3 = mig.create_maj(m2, !x[3], x[2]);
        mig.create_output(m3);
        mig.create_output(!m2);
        mig
    }

    fn bounded() -> CompilerSettings {
        CompilerSettings {
            limits: RunnerLimits {
                iter_limit: 8,
                time_limit: Duration::from_secs(600),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn default_settings() {
        let settings = CompilerSettings::default();
        assert!(settings.preoptimize);
        assert!(settings.rewrite);
        assert!(!settings.verbose);
        assert!(!settings.print_program);
        assert_eq!(settings.limits, RunnerLimits::default());
    }

    #[test]
    fn rewrite_keeps_function() {
        crate::init_logger();
        let mig = majority_chain();
        let (opt, stats, copy) = rewrite(bounded(), &mig, Mig::new()).unwrap();
        assert_eq!(opt.simulate(), mig.simulate());
        assert_eq!(copy.num_gates(), opt.num_gates());
        assert_eq!(copy.simulate(), opt.simulate());
        assert_eq!(stats.instruction_count, opt.num_gates());
        assert!(stats.instruction_count <= mig.num_gates());
        assert!(stats.stop_reason.is_some());
    }

    #[test]
    fn associativity_finds_a_smaller_network() {
        crate::init_logger();
        // maj(a, b, maj(a, b, c)) is maj(a, b, c)
        let mig = majority_chain();
        let (opt, stats) = compile(bounded(), &mig, Mig::new()).unwrap();
        assert_eq!(opt.simulate(), mig.simulate());
        assert_eq!(stats.instruction_count, 2);
    }

    #[test]
    fn skipping_saturation() {
        let mig = majority_chain();
        let settings = CompilerSettings {
            rewrite: false,
            preoptimize: false,
            ..Default::default()
        };
        let (_, stats) = compile(settings, &mig, Discard).unwrap();
        assert_eq!(stats.instruction_count, 3);
        assert_eq!(stats.stop_reason, None);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.t_runner, 0);
        assert_eq!(stats.egraph_nodes, stats.egraph_size);
    }

    #[test]
    fn budget_is_not_an_error() {
        let mig = majority_chain();
        let settings = CompilerSettings {
            limits: RunnerLimits {
                time_limit: Duration::from_secs(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let (opt, stats, ()) = rewrite(settings, &mig, Discard).unwrap();
        assert!(matches!(stats.stop_reason, Some(StopReason::TimeLimit(_))));
        assert_eq!(opt.simulate(), mig.simulate());
    }

    #[test]
    fn error_messages() {
        let err = Error::from(NetworkError::Cycle { node: 4 });
        assert_eq!(err.to_string(), "invalid network: node 4 depends on itself");
    }
}
