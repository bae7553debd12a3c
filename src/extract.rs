use std::cmp::Ordering;
use std::fmt::Debug;

use log::*;
use thiserror::Error;

use crate::{
    util::{HashMap, HashSet},
    EClass, EGraph, Id, Language, MigLanguage, RecExpr,
};

/** Extracting a single MIG from an [`EGraph`].

The [`Extractor`] looks at every eclass and picks the cheapest enode
according to a [`CostFunction`], repeatedly, until a full pass over
all eclasses improves nothing. Costs start out unknown; an enode only
gets a cost once all of its children have one, so eclasses that can
only be built through themselves stay unknown.

Enodes that mention their own eclass are never chosen.

# Example
```
use migsat::*;

let mut egraph = EGraph::default();
let expr: RecExpr<MigLanguage> = "(maj x0 x0 (! (! x1)))".parse().unwrap();
let root = egraph.add_expr(&expr);
let x0 = egraph.add(MigLanguage::Input(0));
egraph.union(root, x0);
egraph.rebuild();

let extractor = Extractor::new(&egraph, MajorityCount);
let (best_cost, best) = extractor.find_best(root).unwrap();
assert_eq!(best_cost, 0);
assert_eq!(best.to_string(), "x0");
```
*/
#[derive(Debug)]
pub struct Extractor<'a, CF: CostFunction> {
    cost_function: CF,
    costs: HashMap<Id, (CF::Cost, MigLanguage)>,
    egraph: &'a EGraph,
}

/** A cost function that can be used by an [`Extractor`].

To extract an expression from an [`EGraph`], the [`Extractor`]
requires a cost function to performs its greedy search.
`migsat` provides [`MajorityCount`], which counts majority gates
in the expression tree.

A cost function must be monotone: an enode never costs less than
any of its children. This is what keeps the chosen enodes acyclic.
*/
pub trait CostFunction {
    /// The `Cost` type. It only requires `PartialOrd` so you can use
    /// floating point types, but failed comparisons (`NaN`s) will
    /// result in a panic.
    type Cost: PartialOrd + Debug + Clone;

    /// Calculates the cost of an enode whose children are `Cost`s.
    ///
    /// For this to work properly, your cost function should be
    /// _monotonic_, i.e. `cost` should return a `Cost` greater than
    /// any of the child costs of the given enode.
    fn cost<C>(&mut self, enode: &MigLanguage, costs: C) -> Self::Cost
    where
        C: FnMut(Id) -> Self::Cost;
}

/// Counts the majority gates of the expression tree.
///
/// Inverters and leaves are free, since inversion lives on edges.
/// Shared subterms are counted once per use.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityCount;

impl CostFunction for MajorityCount {
    type Cost = usize;

    fn cost<C>(&mut self, enode: &MigLanguage, mut costs: C) -> Self::Cost
    where
        C: FnMut(Id) -> Self::Cost,
    {
        match enode {
            MigLanguage::False | MigLanguage::Input(_) => 0,
            MigLanguage::Not(a) => costs(*a),
            MigLanguage::Maj(ids) => ids
                .iter()
                .fold(1usize, |sum, &id| sum.saturating_add(costs(id))),
        }
    }
}

/// Failure to read a network back out of the egraph.
///
/// Either one indicates a broken invariant, not a bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No enode of this eclass can be built without going through itself.
    #[error("e-class {class} has no acyclic representative")]
    NoAcyclicSupport {
        /// The eclass without a cost.
        class: Id,
    },
    /// Following the chosen enodes leads back to an eclass being built.
    #[error("chosen e-nodes form a cycle through e-class {class}")]
    Cycle {
        /// The eclass reached twice.
        class: Id,
    },
}

fn cmp<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b)
        .unwrap_or_else(|| panic!("Costs cannot be compared"))
}

impl<'a, CF> Extractor<'a, CF>
where
    CF: CostFunction,
{
    /// Create a new `Extractor` given an `EGraph` and a
    /// `CostFunction`.
    ///
    /// The extraction does all the work on creation, so this function
    /// performs the greedy search for cheapest representative of each
    /// eclass.
    pub fn new(egraph: &'a EGraph, cost_function: CF) -> Self {
        let costs = HashMap::default();
        let mut extractor = Extractor {
            costs,
            egraph,
            cost_function,
        };
        extractor.find_costs();

        extractor
    }

    /// Find the cheapest (lowest cost) represented expression in the
    /// given eclass, shared as a DAG.
    pub fn find_best(
        &self,
        eclass: Id,
    ) -> Result<(CF::Cost, RecExpr<MigLanguage>), ExtractionError> {
        let root = self.egraph.find(eclass);
        let cost = self
            .find_best_cost(root)
            .ok_or(ExtractionError::NoAcyclicSupport { class: root })?;

        let mut expr = RecExpr::default();
        let mut built: HashMap<Id, Id> = HashMap::default();
        let mut on_stack: HashSet<Id> = HashSet::default();
        let mut stack = vec![root];
        while let Some(&id) = stack.last() {
            if built.contains_key(&id) {
                stack.pop();
                continue;
            }
            let node = self.best_node(id)?;
            let pending: Vec<Id> = node
                .children()
                .iter()
                .map(|&c| self.egraph.find(c))
                .filter(|c| !built.contains_key(c))
                .collect();
            if pending.is_empty() {
                let node = node.map_children(|c| built[&self.egraph.find(c)]);
                built.insert(id, expr.add(node));
                on_stack.remove(&id);
                stack.pop();
            } else if !on_stack.insert(id) {
                return Err(ExtractionError::Cycle { class: id });
            } else {
                stack.extend(pending);
            }
        }
        Ok((cost, expr))
    }

    /// The chosen enode of the given eclass, or an error if it has none.
    pub fn best_node(&self, eclass: Id) -> Result<MigLanguage, ExtractionError> {
        let class = self.egraph.find(eclass);
        self.find_best_node(class)
            .copied()
            .ok_or(ExtractionError::NoAcyclicSupport { class })
    }

    /// Find the cheapest enode in the given eclass.
    pub fn find_best_node(&self, eclass: Id) -> Option<&MigLanguage> {
        self.costs
            .get(&self.egraph.find(eclass))
            .map(|(_, node)| node)
    }

    /// Find the cost of the term that would be extracted from this eclass.
    pub fn find_best_cost(&self, eclass: Id) -> Option<CF::Cost> {
        self.costs
            .get(&self.egraph.find(eclass))
            .map(|(cost, _)| cost.clone())
    }

    fn node_total_cost(&mut self, node: &MigLanguage) -> Option<CF::Cost> {
        let eg = self.egraph;
        let has_cost = |id| self.costs.contains_key(&eg.find(id));
        if node.children().iter().all(|&id| has_cost(id)) {
            let costs = &self.costs;
            Some(
                self.cost_function
                    .cost(node, |id| costs[&eg.find(id)].0.clone()),
            )
        } else {
            None
        }
    }

    fn find_costs(&mut self) {
        let egraph = self.egraph;
        let ids = egraph.class_ids();
        let mut did_something = true;
        let mut loops = 0;
        while did_something {
            did_something = false;

            for &id in &ids {
                let class = &egraph[id];
                let pass = self.make_pass(class);
                match (self.costs.get(&class.id), pass) {
                    (None, Some(new)) => {
                        self.costs.insert(class.id, new);
                        did_something = true;
                    }
                    (Some(old), Some(new)) if cmp(&new.0, &old.0) == Ordering::Less => {
                        self.costs.insert(class.id, new);
                        did_something = true;
                    }
                    _ => (),
                }
            }

            loops += 1;
        }

        for &id in &ids {
            if !self.costs.contains_key(&id) {
                debug!("Failed to compute cost for eclass {}: {:?}", id, egraph[id].nodes);
            }
        }

        info!("Took {} loops to find costs", loops);
    }

    fn make_pass(&mut self, eclass: &EClass) -> Option<(CF::Cost, MigLanguage)> {
        let egraph = self.egraph;
        let (cost, node) = eclass
            .iter()
            .filter(|n| !n.any(|c| egraph.find(c) == eclass.id))
            .map(|n| (self.node_total_cost(n), n))
            .min_by(|a, b| match (&a.0, &b.0) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => cmp(a, b),
            })?;
        cost.map(|c| (c, *node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> RecExpr<MigLanguage> {
        s.parse().unwrap()
    }

    #[test]
    fn majority_count() {
        let mut egraph = EGraph::default();
        let root = egraph.add_expr(&parse("(maj x0 (! (maj x1 x2 x3)) (maj x1 x2 x3))"));
        egraph.rebuild();

        let extractor = Extractor::new(&egraph, MajorityCount);
        // the shared gate is counted once per use
        assert_eq!(extractor.find_best_cost(root), Some(3));

        let (_, best) = extractor.find_best(root).unwrap();
        // but built only once
        let n_maj = best
            .as_ref()
            .iter()
            .filter(|n| matches!(n, MigLanguage::Maj(_)))
            .count();
        assert_eq!(n_maj, 2);
    }

    #[test]
    fn picks_cheaper_representative() {
        crate::init_logger();
        let mut egraph = EGraph::default();
        let big = egraph.add_expr(&parse("(maj x0 x1 (maj x0 x1 x2))"));
        let small = egraph.add_expr(&parse("(maj x0 x1 x2)"));
        egraph.union(big, small);
        egraph.rebuild();

        let extractor = Extractor::new(&egraph, MajorityCount);
        let (cost, best) = extractor.find_best(big).unwrap();
        assert_eq!(cost, 1);
        assert_eq!(best.to_string(), "(maj x0 x1 x2)");
    }

    #[test]
    fn self_referencing_nodes_are_skipped() {
        let mut egraph = EGraph::default();
        let x0 = egraph.add(MigLanguage::Input(0));
        let x1 = egraph.add(MigLanguage::Input(1));
        let m = egraph.add(MigLanguage::Maj([x0, x0, x1]));
        egraph.union(m, x0);
        egraph.rebuild();

        // x0's class now holds maj(x0, x0, x1)
        assert_eq!(egraph[x0].len(), 2);
        let extractor = Extractor::new(&egraph, MajorityCount);
        assert_eq!(extractor.find_best_node(m), Some(&MigLanguage::Input(0)));
    }

    #[test]
    fn inverter_cycles_resolve() {
        let mut egraph = EGraph::default();
        let a = egraph.add(MigLanguage::Input(0));
        let b = egraph.add(MigLanguage::Not(a));
        let c = egraph.add(MigLanguage::Not(b));
        egraph.union(a, c);
        egraph.rebuild();

        // a = !b and b = !a, but a also holds the input itself
        let extractor = Extractor::new(&egraph, MajorityCount);
        assert_eq!(extractor.find_best_node(a), Some(&MigLanguage::Input(0)));
        let (cost, best) = extractor.find_best(b).unwrap();
        assert_eq!(cost, 0);
        assert_eq!(best.to_string(), "(! x0)");
    }

    #[test]
    fn error_messages() {
        let err = ExtractionError::NoAcyclicSupport { class: Id::from(7usize) };
        assert_eq!(err.to_string(), "e-class 7 has no acyclic representative");
    }
}
