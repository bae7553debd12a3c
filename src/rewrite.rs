use std::fmt::{self, Debug};
use std::sync::Arc;

use log::*;

use crate::{BudgetCheck, EGraph, Id, Pattern, RunnerResult, SearchMatches, Subst, Var};

/// A rewrite that searches for the lefthand side and applies the righthand side.
///
/// The [`rewrite!`] macro is the easiest way to create rewrites.
///
/// A [`Rewrite`] consists principally of a [`Searcher`] (the lefthand
/// side) and an [`Applier`] (the righthand side).
/// It additionally stores a name used to refer to the rewrite.
///
/// Rewrites are shared between threads through the global rule table,
/// so searchers and appliers must be `Send + Sync`.
///
/// [`rewrite!`]: crate::rewrite!
#[derive(Clone)]
#[non_exhaustive]
pub struct Rewrite {
    /// The name of the rewrite.
    pub name: String,
    /// The searcher (left-hand side) of the rewrite.
    pub searcher: Arc<dyn Searcher + Sync + Send>,
    /// The applier (right-hand side) of the rewrite.
    pub applier: Arc<dyn Applier + Sync + Send>,
}

impl Debug for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Rewrite");
        d.field("name", &self.name);

        if let Some(pat) = self.searcher.get_pattern_ast() {
            d.field("searcher", &format_args!("{}", pat));
        } else {
            d.field("searcher", &"<< searcher >>");
        }

        if let Some(pat) = self.applier.get_pattern_ast() {
            d.field("applier", &format_args!("{}", pat));
        } else {
            d.field("applier", &"<< applier >>");
        }

        d.finish()
    }
}

impl Rewrite {
    /// Create a new [`Rewrite`]. You typically want to use the
    /// [`rewrite!`](crate::rewrite!) macro instead.
    ///
    /// Fails if the applier uses a variable the searcher never binds.
    pub fn new(
        name: impl Into<String>,
        searcher: impl Searcher + Send + Sync + 'static,
        applier: impl Applier + Send + Sync + 'static,
    ) -> Result<Self, String> {
        let name = name.into();
        let searcher = Arc::new(searcher);
        let applier = Arc::new(applier);

        let bound_vars = searcher.vars();
        for v in applier.vars() {
            if !bound_vars.contains(&v) {
                return Err(format!("Rewrite {} refers to unbound var {}", name, v));
            }
        }

        Ok(Self {
            name,
            searcher,
            applier,
        })
    }

    /// Call [`search`] on the [`Searcher`].
    ///
    /// [`search`]: Searcher::search()
    pub fn search(&self, egraph: &EGraph) -> Vec<SearchMatches> {
        self.searcher.search(egraph)
    }

    /// Call [`search_with_limit`] on the [`Searcher`].
    ///
    /// [`search_with_limit`]: Searcher::search_with_limit()
    pub fn search_with_limit(
        &self,
        egraph: &EGraph,
        limit: usize,
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<SearchMatches>> {
        self.searcher.search_with_limit(egraph, limit, check)
    }

    /// Call [`apply_matches`] on the [`Applier`].
    ///
    /// [`apply_matches`]: Applier::apply_matches()
    pub fn apply(&self, egraph: &mut EGraph, matches: &[SearchMatches]) -> Vec<Id> {
        self.applier.apply_matches(egraph, matches, &self.name)
    }

    /// This `run` is for testing use only. You should use things
    /// from the `migsat::run` module
    #[cfg(test)]
    pub(crate) fn run(&self, egraph: &mut EGraph) -> Vec<Id> {
        let start = crate::util::Instant::now();

        let matches = self.search(egraph);
        debug!("Found rewrite {} {} times", self.name, matches.len());

        let ids = self.apply(egraph, &matches);
        let elapsed = start.elapsed();
        debug!(
            "Applied rewrite {} {} times in {}.{:03}",
            self.name,
            ids.len(),
            elapsed.as_secs(),
            elapsed.subsec_millis()
        );

        egraph.rebuild();
        ids
    }
}

/// The lefthand side of a [`Rewrite`].
///
/// A [`Searcher`] is something that can search the egraph and find
/// matching substitutions.
/// Right now the only significant [`Searcher`] is [`Pattern`].
pub trait Searcher {
    /// Search one eclass, returning None if no matches can be found.
    /// This should not return a SearchMatches with no substs.
    fn search_eclass(&self, egraph: &EGraph, eclass: Id) -> Option<SearchMatches>;

    /// Search the whole [`EGraph`], returning a list of all the
    /// [`SearchMatches`] where something was found.
    ///
    /// This calls [`search_eclass`](Searcher::search_eclass) on each
    /// eclass in ascending id order, so the result is deterministic.
    fn search(&self, egraph: &EGraph) -> Vec<SearchMatches> {
        egraph
            .class_ids()
            .into_iter()
            .filter_map(|id| self.search_eclass(egraph, id))
            .collect()
    }

    /// Like [`search`](Searcher::search), but stops once at least `limit`
    /// substitutions were found.
    ///
    /// `check` runs before every eclass; its error aborts the search.
    fn search_with_limit(
        &self,
        egraph: &EGraph,
        limit: usize,
        check: &BudgetCheck<'_>,
    ) -> RunnerResult<Vec<SearchMatches>> {
        let mut matches = vec![];
        let mut found = 0;
        for id in egraph.class_ids() {
            if found >= limit {
                break;
            }
            check(egraph)?;
            if let Some(m) = self.search_eclass(egraph, id) {
                found += m.substs.len();
                matches.push(m);
            }
        }
        Ok(matches)
    }

    /// Returns a list of the variables bound by this Searcher
    fn vars(&self) -> Vec<Var>;

    /// For patterns, return the ast directly as a reference
    fn get_pattern_ast(&self) -> Option<&Pattern> {
        None
    }
}

/// The righthand side of a [`Rewrite`].
///
/// An [`Applier`] is anything that can do something with a
/// substitution ([`Subst`]). This allows you to implement rewrites
/// that determine when and how to respond to a match using custom
/// logic.
///
/// Notably, [`Pattern`] implements [`Applier`], which suffices in
/// most cases.
/// Additionally, this crate provides [`ConditionalApplier`] to stack
/// [`Condition`]s onto an [`Applier`], which in many cases can save
/// you from having to implement your own applier.
pub trait Applier {
    /// Apply many substitutions.
    ///
    /// This method should call [`apply_one`] for each match and then
    /// unify the results with the matched eclass.
    /// This should return a list of [`Id`]s where the union actually
    /// did something.
    ///
    /// The default implementation does this and should suffice for
    /// most use cases.
    ///
    /// [`apply_one`]: Applier::apply_one()
    fn apply_matches(
        &self,
        egraph: &mut EGraph,
        matches: &[SearchMatches],
        rule_name: &str,
    ) -> Vec<Id> {
        let mut added = vec![];
        for mat in matches {
            for subst in &mat.substs {
                let ids = self.apply_one(egraph, mat.eclass, subst);
                for id in ids {
                    if egraph.union(id, mat.eclass) {
                        trace!("{} unioned {} with {}", rule_name, id, mat.eclass);
                        added.push(egraph.find(id));
                    }
                }
            }
        }
        added
    }

    /// Apply a single substitution.
    ///
    /// An [`Applier`] should only add things to the egraph here,
    /// _not_ union them with the id `eclass`.
    /// That is the responsibility of the [`apply_matches`] method.
    /// The `eclass` parameter allows the implementer to inspect the
    /// eclass where the match was found if they need to.
    ///
    /// This should return a list of [`Id`]s of things you'd like to
    /// be unioned with `eclass`. There can be zero, one, or many.
    ///
    /// [`apply_matches`]: Applier::apply_matches()
    fn apply_one(&self, egraph: &mut EGraph, eclass: Id, subst: &Subst) -> Vec<Id>;

    /// Returns a list of variables that this Applier assumes are bound.
    ///
    /// `migsat` will check that the corresponding `Searcher` binds those
    /// variables.
    /// By default this return an empty `Vec`, which basically turns off the
    /// checking.
    fn vars(&self) -> Vec<Var> {
        vec![]
    }

    /// For patterns, get the ast directly as a reference.
    fn get_pattern_ast(&self) -> Option<&Pattern> {
        None
    }
}

/// An [`Applier`] that checks a [`Condition`] before applying.
///
/// A [`ConditionalApplier`] simply calls [`check`] on the
/// [`Condition`] before calling [`apply_one`] on the inner
/// [`Applier`].
///
/// See the [`rewrite!`](crate::rewrite!) macro documentation for an example.
///
/// [`apply_one`]: Applier::apply_one()
/// [`check`]: Condition::check()
#[derive(Clone, Debug)]
pub struct ConditionalApplier<C, A> {
    /// The [`Condition`] to [`check`] before calling [`apply_one`] on
    /// `applier`.
    ///
    /// [`apply_one`]: Applier::apply_one()
    /// [`check`]: Condition::check()
    pub condition: C,
    /// The inner [`Applier`] to call once `condition` passes.
    pub applier: A,
}

impl<C, A> Applier for ConditionalApplier<C, A>
where
    A: Applier,
    C: Condition,
{
    fn apply_one(&self, egraph: &mut EGraph, eclass: Id, subst: &Subst) -> Vec<Id> {
        if self.condition.check(egraph, eclass, subst) {
            self.applier.apply_one(egraph, eclass, subst)
        } else {
            vec![]
        }
    }

    fn vars(&self) -> Vec<Var> {
        let mut vars = self.applier.vars();
        vars.extend(self.condition.vars());
        vars
    }

    fn get_pattern_ast(&self) -> Option<&Pattern> {
        self.applier.get_pattern_ast()
    }
}

/// A condition to check in a [`ConditionalApplier`].
///
/// See the [`ConditionalApplier`] docs.
///
/// Notably, any function ([`Fn`]) that doesn't mutate other state
/// and matches the signature of [`check`] implements [`Condition`].
///
/// [`check`]: Condition::check()
pub trait Condition {
    /// Check a condition.
    ///
    /// `eclass` is the eclass [`Id`] where the match (`subst`) occured.
    /// If this is true, then the [`ConditionalApplier`] will fire.
    fn check(&self, egraph: &mut EGraph, eclass: Id, subst: &Subst) -> bool;

    /// Returns a list of variables that this Condition assumes are bound.
    fn vars(&self) -> Vec<Var> {
        vec![]
    }
}

impl<F> Condition for F
where
    F: Fn(&mut EGraph, Id, &Subst) -> bool,
{
    fn check(&self, egraph: &mut EGraph, eclass: Id, subst: &Subst) -> bool {
        self(egraph, eclass, subst)
    }
}

/// A [`Condition`] that checks if two terms are equivalent.
///
/// This condition adds its two [`Pattern`]s to the egraph and passes
/// if and only if they are equivalent (in the same eclass).
#[derive(Debug)]
pub struct ConditionEqual {
    p1: Pattern,
    p2: Pattern,
}

impl ConditionEqual {
    /// Create a new [`ConditionEqual`] condition given two patterns.
    pub fn new(p1: Pattern, p2: Pattern) -> Self {
        ConditionEqual { p1, p2 }
    }

    /// Create a ConditionEqual by parsing two pattern strings.
    ///
    /// This panics if the parsing fails.
    pub fn parse(a1: &str, a2: &str) -> Self {
        Self {
            p1: a1.parse().unwrap(),
            p2: a2.parse().unwrap(),
        }
    }
}

impl Condition for ConditionEqual {
    fn check(&self, egraph: &mut EGraph, _eclass: Id, subst: &Subst) -> bool {
        let a1 = self.p1.instantiate(egraph, subst);
        let a2 = self.p2.instantiate(egraph, subst);
        egraph.find(a1) == egraph.find(a2)
    }

    fn vars(&self) -> Vec<Var> {
        let mut vars = self.p1.vars();
        vars.extend(self.p2.vars());
        vars
    }
}
