use log::*;

use crate::{
    util::{env_var, Duration, IndexMap, IndexSet, Instant},
    EGraph, Id, MigLanguage, RecExpr, Rewrite, SearchMatches,
};

/** Saturates an [`EGraph`] with [`Rewrite`]s under a budget.

Every round searches all rules against the same egraph, applies the
matches in rule order and rebuilds. The [`Runner`] stops when a round
adds nothing ([`StopReason::Saturated`]) or when one of its
[`RunnerLimits`] is exhausted. The limits are checked before a round,
before every eclass a rule searches and after every rule is applied, so
a deadline also cuts a single long search short. A round that is cut
short still rebuilds, so the egraph is always ready for an
[`Extractor`](crate::Extractor).

Rules that match too often are held back by a [`RewriteScheduler`];
[`BackoffScheduler`] is the default.

# Example

```
use migsat::*;

let start: RecExpr<MigLanguage> = "(maj x0 (! (! x0)) x1)".parse().unwrap();
let runner = Runner::default()
    .with_iter_limit(3)
    .with_node_limit(10_000)
    .with_expr(&start)
    .with_scheduler(SimpleScheduler)
    .run(REWRITE_RULES.iter());

println!(
    "Stopped after {} iterations, reason: {:?}",
    runner.iterations.len(),
    runner.stop_reason
);
let x0 = runner.egraph.lookup(MigLanguage::Input(0)).unwrap();
assert_eq!(runner.egraph.find(runner.roots[0]), x0);
```
*/
pub struct Runner {
    /// The [`EGraph`] used.
    pub egraph: EGraph,
    /// One record per round, plus a final one carrying the stop reason.
    pub iterations: Vec<Iteration>,
    /// The roots of expressions added by
    /// [`with_expr`](Runner::with_expr()), in insertion order.
    pub roots: Vec<Id>,
    /// Why the `Runner` stopped, `None` until it has.
    pub stop_reason: Option<StopReason>,

    /// The hooks added by [`with_hook`](Runner::with_hook()).
    #[allow(clippy::type_complexity)]
    pub hooks: Vec<Box<dyn FnMut(&mut Self) -> Result<(), String>>>,

    limits: RunnerLimits,
    start_time: Option<Instant>,
    scheduler: Box<dyn RewriteScheduler>,
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new(RunnerLimits::default())
    }
}

/// The budget of a [`Runner`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct RunnerLimits {
    /// Maximum number of iterations. Default: 30
    pub iter_limit: usize,
    /// Maximum number of enodes. Default: 10,000
    pub node_limit: usize,
    /// Maximum number of eclasses. Default: unlimited
    pub class_limit: usize,
    /// Wall-clock deadline, measured from the first iteration. Default: 5 seconds
    pub time_limit: Duration,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            iter_limit: 30,
            node_limit: 10_000,
            class_limit: usize::MAX,
            time_limit: Duration::from_secs(5),
        }
    }
}

impl RunnerLimits {
    /// The default limits, overridden by any of `MIGSAT_ITER_LIMIT`,
    /// `MIGSAT_NODE_LIMIT`, `MIGSAT_CLASS_LIMIT` and `MIGSAT_TIME_LIMIT`
    /// (in seconds) that are set.
    ///
    /// # Panics
    /// If one of the variables is set but doesn't parse.
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        if let Some(n) = env_var("MIGSAT_ITER_LIMIT") {
            limits.iter_limit = n;
        }
        if let Some(n) = env_var("MIGSAT_NODE_LIMIT") {
            limits.node_limit = n;
        }
        if let Some(n) = env_var("MIGSAT_CLASS_LIMIT") {
            limits.class_limit = n;
        }
        if let Some(secs) = env_var::<f64>("MIGSAT_TIME_LIMIT") {
            limits.time_limit = Duration::from_secs_f64(secs);
        }
        debug!("Runner limits: {:?}", limits);
        limits
    }

    fn check(&self, egraph: &EGraph, iterations: usize, elapsed: Duration) -> RunnerResult<()> {
        if elapsed >= self.time_limit {
            return Err(StopReason::TimeLimit(elapsed.as_secs_f64()));
        }

        let size = egraph.total_size();
        if size > self.node_limit {
            return Err(StopReason::NodeLimit(size));
        }

        let classes = egraph.number_of_classes();
        if classes > self.class_limit {
            return Err(StopReason::ClassLimit(classes));
        }

        if iterations >= self.iter_limit {
            return Err(StopReason::IterationLimit(iterations));
        }

        Ok(())
    }
}

/// Why a [`Runner`] stopped.
///
/// Every variant except `Other` is a normal way to finish. The limit
/// variants carry what was measured when the limit tripped, not the
/// limit itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// A round applied no rule that changed the egraph.
    Saturated,
    /// The number of rounds run, equal to the iteration limit.
    IterationLimit(usize),
    /// The number of enodes, which exceeded the enode limit.
    NodeLimit(usize),
    /// The number of eclasses, which exceeded the eclass limit.
    ClassLimit(usize),
    /// The seconds elapsed since the first round, at least the time limit.
    TimeLimit(f64),
    /// A hook asked to stop.
    Other(String),
}

/// The outcome of a budget check: `Err` carries the reason to stop.
pub type RunnerResult<T> = std::result::Result<T, StopReason>;

/// A budget check handed to searches, shareable between threads.
pub type BudgetCheck<'a> = dyn Fn(&EGraph) -> RunnerResult<()> + Sync + 'a;

/// What one round of a [`Runner`] did. Times are in seconds.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Iteration {
    /// Enodes in the egraph when the round started.
    pub egraph_nodes: usize,
    /// Eclasses in the egraph when the round started.
    pub egraph_classes: usize,
    /// How often each rule changed the egraph, by rule name.
    pub applied: IndexMap<String, usize>,
    /// Running hooks.
    pub hook_time: f64,
    /// Searching all rules.
    pub search_time: f64,
    /// Applying the matches.
    pub apply_time: f64,
    /// The closing [`rebuild`](EGraph::rebuild()).
    pub rebuild_time: f64,
    /// The whole round, hooks included.
    pub total_time: f64,
    /// Unions performed by the closing rebuild.
    pub n_rebuilds: usize,
    /// Set only on the record pushed when the runner stops.
    pub stop_reason: Option<StopReason>,
}

impl Iteration {
    fn stopped(egraph: &EGraph, stop_reason: StopReason) -> Self {
        Self {
            egraph_nodes: egraph.total_size(),
            egraph_classes: egraph.number_of_classes(),
            applied: IndexMap::default(),
            hook_time: 0.0,
            search_time: 0.0,
            apply_time: 0.0,
            rebuild_time: 0.0,
            total_time: 0.0,
            n_rebuilds: 0,
            stop_reason: Some(stop_reason),
        }
    }
}

impl Runner {
    /// Create a new `Runner` with the given limits and an empty egraph.
    pub fn new(limits: RunnerLimits) -> Self {
        Self {
            limits,

            egraph: EGraph::default(),
            roots: vec![],
            iterations: vec![],
            stop_reason: None,
            hooks: vec![],

            start_time: None,
            scheduler: Box::<BackoffScheduler>::default(),
        }
    }

    /// Replaces all the limits at once.
    pub fn with_limits(self, limits: RunnerLimits) -> Self {
        Self { limits, ..self }
    }

    /// Sets the iteration limit. Default: 30
    pub fn with_iter_limit(mut self, iter_limit: usize) -> Self {
        self.limits.iter_limit = iter_limit;
        self
    }

    /// Sets the egraph size limit (in enodes). Default: 10,000
    pub fn with_node_limit(mut self, node_limit: usize) -> Self {
        self.limits.node_limit = node_limit;
        self
    }

    /// Sets the egraph size limit (in eclasses). Default: unlimited
    pub fn with_class_limit(mut self, class_limit: usize) -> Self {
        self.limits.class_limit = class_limit;
        self
    }

    /// Sets the runner time limit. Default: 5 seconds
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.limits.time_limit = time_limit;
        self
    }

    /// Adds a hook that runs at the start of every round. Returning an
    /// `Err` stops the runner with [`StopReason::Other`].
    ///
    /// # Example
    /// ```
    /// # use migsat::*;
    /// let runner = Runner::default()
    ///     .with_expr(&"(maj x0 x1 (maj x0 x1 x2))".parse().unwrap())
    ///     .with_hook(|runner| {
    ///          println!("Egraph is this big: {}", runner.egraph.total_size());
    ///          Ok(())
    ///     })
    ///     .with_hook(|runner| match runner.iterations.len() {
    ///          1 => Err("enough".into()),
    ///          _ => Ok(()),
    ///     })
    ///     .run(REWRITE_RULES.iter());
    /// assert_eq!(runner.stop_reason, Some(StopReason::Other("enough".into())));
    /// assert_eq!(runner.rounds(), 1);
    /// ```
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Self) -> Result<(), String> + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Replaces the [`RewriteScheduler`]. Default: [`BackoffScheduler`]
    pub fn with_scheduler(self, scheduler: impl RewriteScheduler + 'static) -> Self {
        let scheduler = Box::new(scheduler);
        Self { scheduler, ..self }
    }

    /// Adds an expression to the egraph and records its eclass in
    /// [`roots`](Runner::roots).
    pub fn with_expr(mut self, expr: &RecExpr<MigLanguage>) -> Self {
        let id = self.egraph.add_expr(expr);
        self.roots.push(id);
        self
    }

    /// Replace the [`EGraph`] of this `Runner`.
    pub fn with_egraph(self, egraph: EGraph) -> Self {
        Self { egraph, ..self }
    }

    /// Runs rounds until the runner stops.
    /// Afterwards [`stop_reason`](Runner::stop_reason) is always set.
    pub fn run<'a, R>(mut self, rules: R) -> Self
    where
        R: IntoIterator<Item = &'a Rewrite>,
    {
        let rules: Vec<&Rewrite> = rules.into_iter().collect();
        warn_duplicate_names(&rules);
        self.egraph.rebuild();
        let stop_reason = loop {
            if let Err(stop_reason) = self.run_one(&rules) {
                break stop_reason;
            }
        };
        info!("Stopping: {:?}", stop_reason);
        self.iterations
            .push(Iteration::stopped(&self.egraph, stop_reason.clone()));
        self.stop_reason = Some(stop_reason);
        self
    }

    /// The number of iterations that actually searched and applied rules.
    pub fn rounds(&self) -> usize {
        self.iterations
            .iter()
            .filter(|it| it.stop_reason.is_none())
            .count()
    }

    /// Prints the stop reason, the final egraph size and where the time went.
    pub fn print_report(&self) {
        let rounds = self.rounds();
        let sum = |f: fn(&Iteration) -> f64| -> f64 { self.iterations.iter().map(f).sum() };
        let total = sum(|it| it.total_time);
        let share = |t: f64| if total > 0.0 { t / total } else { 0.0 };
        let unions: usize = self.iterations.iter().map(|it| it.n_rebuilds).sum();

        println!("Stopped: {:?} after {} rounds", self.stop_reason, rounds);
        println!(
            "EGraph: {} classes, {} enodes, {} in memo",
            self.egraph.number_of_classes(),
            self.egraph.total_number_of_nodes(),
            self.egraph.total_size()
        );
        println!("Rebuild unions: {}", unions);
        println!("Time: {:.4}s", total);
        for (phase, t) in [
            ("search", sum(|it| it.search_time)),
            ("apply", sum(|it| it.apply_time)),
            ("rebuild", sum(|it| it.rebuild_time)),
            ("hooks", sum(|it| it.hook_time)),
        ] {
            println!("  {:<8} {:.4}s ({:.0}%)", phase, t, 100.0 * share(t));
        }
    }

    fn run_one(&mut self, rules: &[&Rewrite]) -> RunnerResult<()> {
        assert!(self.stop_reason.is_none());

        let i = self.iterations.len();
        info!("\nIteration {}", i);

        let run_start = *self.start_time.get_or_insert_with(Instant::now);
        let limits = self.limits;
        let check = move |egraph: &EGraph| limits.check(egraph, i, run_start.elapsed());
        check(&self.egraph)?;

        let round_start = Instant::now();
        let mut hooks = std::mem::take(&mut self.hooks);
        let hook_result = hooks.iter_mut().try_for_each(|hook| hook(self));
        self.hooks = hooks;
        hook_result.map_err(StopReason::Other)?;
        let hook_time = round_start.elapsed().as_secs_f64();

        let egraph_nodes = self.egraph.total_size();
        let egraph_classes = self.egraph.number_of_classes();
        trace!("EGraph {:?}", self.egraph.dump());

        let search_start = Instant::now();
        let searched = self
            .scheduler
            .search_rewrites(i, &self.egraph, rules, &check);
        let search_time = search_start.elapsed().as_secs_f64();
        info!("Search time: {}", search_time);

        let apply_start = Instant::now();
        let mut applied: IndexMap<String, usize> = IndexMap::default();
        let result = searched.and_then(|matches| {
            for (rw, ms) in rules.iter().zip(matches) {
                let total: usize = ms.iter().map(|m| m.substs.len()).sum();
                if total == 0 {
                    continue;
                }
                debug!("Applying {} {} times", rw.name, total);
                let changed = self.scheduler.apply_rewrite(i, &mut self.egraph, rw, ms);
                if changed > 0 {
                    *applied.entry(rw.name.clone()).or_default() += changed;
                    debug!("Applied {} {} times", rw.name, changed);
                }
                check(&self.egraph)?;
            }
            Ok(())
        });
        let apply_time = apply_start.elapsed().as_secs_f64();
        info!("Apply time: {}", apply_time);

        let rebuild_start = Instant::now();
        let n_rebuilds = self.egraph.rebuild();
        let rebuild_time = rebuild_start.elapsed().as_secs_f64();
        info!("Rebuild time: {}", rebuild_time);
        info!(
            "Size: n={}, e={}",
            self.egraph.total_size(),
            self.egraph.number_of_classes()
        );

        let saturated = result.is_ok() && applied.is_empty() && self.scheduler.can_stop(i);
        self.iterations.push(Iteration {
            egraph_nodes,
            egraph_classes,
            applied,
            hook_time,
            search_time,
            apply_time,
            rebuild_time,
            total_time: round_start.elapsed().as_secs_f64(),
            n_rebuilds,
            stop_reason: None,
        });

        result?;
        if saturated {
            Err(StopReason::Saturated)
        } else {
            Ok(())
        }
    }
}

fn warn_duplicate_names(rules: &[&Rewrite]) {
    let mut counts: IndexMap<&str, usize> = IndexMap::default();
    for rw in rules {
        *counts.entry(rw.name.as_str()).or_default() += 1;
    }
    for (name, count) in counts.into_iter().filter(|&(_, n)| n > 1) {
        warn!(
            "Rule '{}' appears {} times, which confuses reports and scheduling",
            name, count
        );
    }
}

/// Decides which rules a [`Runner`] searches and applies in a round.
#[allow(unused_variables)]
pub trait RewriteScheduler {
    /// Whether a round that changed nothing may end the run. Default: `true`
    fn can_stop(&mut self, iteration: usize) -> bool {
        true
    }

    /// Searches one rule. `check` must be honored while searching.
    ///
    /// Default: an unlimited [`Rewrite::search_with_limit`].
    fn search_rewrite(
        &mut self,
        iteration: usize,
        egraph: &EGraph,
        rewrite: &Rewrite,
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<SearchMatches>> {
        rewrite.search_with_limit(egraph, usize::MAX, check)
    }

    /// Searches every rule, in order, for one round.
    fn search_rewrites(
        &mut self,
        iteration: usize,
        egraph: &EGraph,
        rules: &[&Rewrite],
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<Vec<SearchMatches>>> {
        rules
            .iter()
            .map(|rule| self.search_rewrite(iteration, egraph, rule, check))
            .collect()
    }

    /// Applies one rule's matches and returns how many changed the
    /// egraph. Default: [`Rewrite::apply`]
    fn apply_rewrite(
        &mut self,
        iteration: usize,
        egraph: &mut EGraph,
        rewrite: &Rewrite,
        matches: Vec<SearchMatches>,
    ) -> usize {
        rewrite.apply(egraph, &matches).len()
    }
}

/// Runs every rule in every round.
pub struct SimpleScheduler;

impl RewriteScheduler for SimpleScheduler {}

/// Searches all rules of a round at once on the `rayon` thread pool.
///
/// Only searching is parallel; matches are still applied one rule at a
/// time, in rule order, on the calling thread, so the result is the
/// same as with [`SimpleScheduler`].
#[cfg(feature = "parallel")]
pub struct ParallelScheduler;

#[cfg(feature = "parallel")]
impl RewriteScheduler for ParallelScheduler {
    fn search_rewrites(
        &mut self,
        _iteration: usize,
        egraph: &EGraph,
        rules: &[&Rewrite],
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<Vec<SearchMatches>>> {
        use rayon::prelude::*;

        rules
            .par_iter()
            .map(|rule| rule.search_with_limit(egraph, usize::MAX, check))
            .collect()
    }
}

/// Temporarily bans rules that match too often.
///
/// A rule may match at most its threshold, which starts at the initial
/// match limit and doubles with every ban. A rule that finds more is
/// dropped for the round and banned for the ban length, which doubles
/// too. Its search stops as soon as the threshold is exceeded.
///
/// When every rule that is not banned is saturated, the bans are
/// fast-forwarded instead of stopping the runner.
pub struct BackoffScheduler {
    initial_match_limit: usize,
    ban_length: usize,
    bans: IndexMap<String, Ban>,
    exempt: IndexSet<String>,
}

#[derive(Default)]
struct Ban {
    times_banned: u32,
    until: usize,
}

impl Ban {
    fn threshold(&self, initial: usize) -> usize {
        doubled(initial, self.times_banned)
    }
}

fn doubled(n: usize, times: u32) -> usize {
    n.saturating_mul(1usize.checked_shl(times).unwrap_or(usize::MAX))
}

impl BackoffScheduler {
    /// Sets how many matches a rule may have before its first ban.
    /// Default: 1,000
    pub fn with_initial_match_limit(self, initial_match_limit: usize) -> Self {
        Self {
            initial_match_limit,
            ..self
        }
    }

    /// Sets the length of a first ban, in rounds. Default: 5
    pub fn with_ban_length(self, ban_length: usize) -> Self {
        Self { ban_length, ..self }
    }

    /// Never ban the named rule.
    pub fn do_not_ban(mut self, name: impl Into<String>) -> Self {
        self.exempt.insert(name.into());
        self
    }
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self {
            initial_match_limit: 1_000,
            ban_length: 5,
            bans: IndexMap::default(),
            exempt: IndexSet::default(),
        }
    }
}

impl RewriteScheduler for BackoffScheduler {
    fn can_stop(&mut self, iteration: usize) -> bool {
        let next_unban = self
            .bans
            .values()
            .map(|b| b.until)
            .filter(|&until| until > iteration)
            .min();
        let Some(next_unban) = next_unban else {
            return true;
        };

        let skip = next_unban - iteration;
        for ban in self.bans.values_mut().filter(|b| b.until > iteration) {
            ban.until -= skip;
        }
        info!("All unbanned rules saturated, skipping {} rounds of bans", skip);
        false
    }

    fn search_rewrite(
        &mut self,
        iteration: usize,
        egraph: &EGraph,
        rewrite: &Rewrite,
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<SearchMatches>> {
        if self.exempt.contains(&rewrite.name) {
            return rewrite.search_with_limit(egraph, usize::MAX, check);
        }

        let ban = self.bans.entry(rewrite.name.clone()).or_default();
        if iteration < ban.until {
            debug!("Skipping {}, banned until {}", rewrite.name, ban.until);
            return Ok(vec![]);
        }

        let threshold = ban.threshold(self.initial_match_limit);
        let matches = rewrite.search_with_limit(egraph, threshold.saturating_add(1), check)?;
        let found: usize = matches.iter().map(|m| m.substs.len()).sum();
        if found <= threshold {
            return Ok(matches);
        }

        let length = doubled(self.ban_length, ban.times_banned);
        ban.times_banned += 1;
        ban.until = iteration + length;
        info!(
            "Banning {} for {} rounds: more than {} matches",
            rewrite.name, length, threshold
        );
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REWRITE_RULES;

    fn expr(s: &str) -> RecExpr<MigLanguage> {
        s.parse().unwrap()
    }

    #[test]
    fn saturates_small_input() {
        crate::init_logger();
        let runner = Runner::default()
            .with_iter_limit(5)
            .with_node_limit(2_000)
            .with_expr(&expr("(maj x0 (! (! x0)) x1)"))
            .with_scheduler(SimpleScheduler)
            .run(REWRITE_RULES.iter());

        let x0 = runner.egraph.lookup(MigLanguage::Input(0)).unwrap();
        assert_eq!(runner.egraph.find(runner.roots[0]), x0);
        assert!(runner.egraph.is_congruent());
        assert!(runner.stop_reason.is_some());
    }

    #[test]
    fn zero_iterations_only_rebuilds() {
        crate::init_logger();
        let runner = Runner::default()
            .with_iter_limit(0)
            .with_expr(&expr("(maj x0 (! (! x0)) x1)"))
            .run(REWRITE_RULES.iter());

        assert_eq!(runner.stop_reason, Some(StopReason::IterationLimit(0)));
        assert_eq!(runner.rounds(), 0);
        // x0, x1, !x0, !!x0, maj
        assert_eq!(runner.egraph.number_of_classes(), 5);
    }

    #[test]
    fn node_limit_stops_growth() {
        crate::init_logger();
        let runner = Runner::default()
            .with_node_limit(20)
            .with_scheduler(SimpleScheduler)
            .with_expr(&expr("(maj x0 x1 (maj x2 x3 (maj x4 x5 x6)))"))
            .run(REWRITE_RULES.iter());

        match runner.stop_reason {
            Some(StopReason::NodeLimit(size)) => {
                assert!(size > 20);
                assert_eq!(size, runner.egraph.total_size());
            }
            other => panic!("expected a node limit, got {:?}", other),
        }
        assert!(runner.egraph.is_congruent());
    }

    #[test]
    fn class_limit_stops_growth() {
        crate::init_logger();
        let runner = Runner::default()
            .with_class_limit(12)
            .with_scheduler(SimpleScheduler)
            .with_expr(&expr("(maj x0 x1 (maj x2 x3 (maj x4 x5 x6)))"))
            .run(REWRITE_RULES.iter());

        match runner.stop_reason {
            Some(StopReason::ClassLimit(classes)) => assert!(classes > 12),
            other => panic!("expected a class limit, got {:?}", other),
        }
    }

    #[test]
    fn time_limit_zero() {
        let runner = Runner::default()
            .with_time_limit(Duration::from_secs(0))
            .with_expr(&expr("(maj x0 x1 (maj x2 x3 x4))"))
            .run(REWRITE_RULES.iter());

        assert!(matches!(runner.stop_reason, Some(StopReason::TimeLimit(_))));
        assert_eq!(runner.rounds(), 0);
    }

    #[test]
    fn deadline_interrupts_a_round() {
        crate::init_logger();
        let time_limit = Duration::from_millis(200);
        let start = Instant::now();
        let runner = Runner::default()
            .with_iter_limit(usize::MAX)
            .with_node_limit(usize::MAX)
            .with_time_limit(time_limit)
            .with_scheduler(SimpleScheduler)
            .with_expr(&expr("(maj (maj x0 x1 x2) (! x0) x2)"))
            .run(REWRITE_RULES.iter());
        let elapsed = start.elapsed();

        match runner.stop_reason {
            Some(StopReason::TimeLimit(secs)) => assert!(secs >= time_limit.as_secs_f64()),
            other => panic!("expected a time limit, got {:?}", other),
        }
        assert!(elapsed < Duration::from_secs(5), "ran for {:?}", elapsed);
        assert!(runner.egraph.is_congruent());
    }

    #[test]
    fn limits_from_env() {
        std::env::set_var("MIGSAT_CLASS_LIMIT", "77");
        std::env::set_var("MIGSAT_TIME_LIMIT", "0.5");
        let limits = RunnerLimits::from_env();
        std::env::remove_var("MIGSAT_CLASS_LIMIT");
        std::env::remove_var("MIGSAT_TIME_LIMIT");

        assert_eq!(limits.class_limit, 77);
        assert_eq!(limits.time_limit, Duration::from_millis(500));
        assert_eq!(limits.node_limit, RunnerLimits::default().node_limit);
    }

    #[test]
    fn backoff_bans_explosive_rules() {
        crate::init_logger();
        let runner = Runner::default()
            .with_iter_limit(8)
            .with_time_limit(Duration::from_secs(600))
            .with_scheduler(BackoffScheduler::default().with_initial_match_limit(4))
            .with_expr(&expr("(maj x0 x1 (maj x2 x3 (maj x4 x5 x6)))"))
            .run(REWRITE_RULES.iter());

        assert!(runner.stop_reason.is_some());
        assert!(runner.rounds() <= 8);
        assert!(runner.egraph.is_congruent());
    }

    #[test]
    fn backoff_threshold_doubles() {
        let mut ban = Ban::default();
        assert_eq!(ban.threshold(10), 10);
        ban.times_banned = 3;
        assert_eq!(ban.threshold(10), 80);
        ban.times_banned = 100;
        assert_eq!(ban.threshold(10), usize::MAX);
    }

    #[test]
    fn exhausted_budget_aborts_a_search() {
        let mut egraph = EGraph::default();
        egraph.add_expr(&expr("(maj x0 x1 (maj x0 x1 x2))"));
        egraph.rebuild();

        let rule = &REWRITE_RULES[0];
        let stop = |_: &EGraph| -> RunnerResult<()> { Err(StopReason::Other("stop".into())) };
        let mut scheduler = SimpleScheduler;
        assert_eq!(
            scheduler.search_rewrite(0, &egraph, rule, &stop),
            Err(StopReason::Other("stop".into()))
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_search_matches_sequential() {
        use crate::{Extractor, MajorityCount};

        fn saturate(scheduler: impl RewriteScheduler + 'static) -> Runner {
            Runner::default()
                .with_iter_limit(3)
                .with_time_limit(Duration::from_secs(600))
                .with_scheduler(scheduler)
                .with_expr(&expr("(maj x0 (! x1) (maj x1 x2 (! x0)))"))
                .run(REWRITE_RULES.iter())
        }

        let sequential = saturate(SimpleScheduler);
        let parallel = saturate(ParallelScheduler);
        assert_eq!(sequential.stop_reason, parallel.stop_reason);
        assert_eq!(sequential.egraph.total_size(), parallel.egraph.total_size());
        assert_eq!(
            sequential.egraph.number_of_classes(),
            parallel.egraph.number_of_classes()
        );
        assert_eq!(
            sequential.egraph.total_number_of_nodes(),
            parallel.egraph.total_number_of_nodes()
        );
        assert!(parallel.egraph.is_congruent());

        let best = |runner: &Runner| {
            Extractor::new(&runner.egraph, MajorityCount)
                .find_best(runner.roots[0])
                .unwrap()
        };
        assert_eq!(best(&sequential), best(&parallel));
    }
}
