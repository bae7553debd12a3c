use std::fmt::{self, Debug};
use std::ops::Index;

use log::*;

use crate::{
    util::{concat_vecs, HashMap, Instant},
    EClass, Id, Language, MigLanguage, RecExpr, UnionFind,
};

/** A data structure to keep track of equalities between MIG terms.

An [`EGraph`] holds [`EClass`]es of [`MigLanguage`] enodes. Enode
children are eclass [`Id`]s, never enodes, so cyclic equivalences
(a class containing an enode that reaches back into the same class)
are just ids in flat tables.

# Invariants

- [`find`](EGraph::find) is idempotent.
- After [`rebuild`](EGraph::rebuild), every enode refers to canonical
  ids only, and congruent enodes (same operator, children equal under
  `find`) live in the same eclass.

Merging with [`union`](EGraph::union) breaks the second invariant
until the next rebuild; unlike a naive e-graph, this one defers all
congruence maintenance to that explicit step, which is much cheaper
when many unions happen in a row.

# Example
```
use migsat::*;
let mut egraph = EGraph::default();
let a = egraph.add(MigLanguage::Input(0));
let b = egraph.add(MigLanguage::Input(1));
let c = egraph.add(MigLanguage::Input(2));
let m1 = egraph.add(MigLanguage::Maj([a, b, c]));
// majority is symmetric, so argument order doesn't matter
let m2 = egraph.add(MigLanguage::Maj([c, a, b]));
assert_eq!(m1, m2);

let d = egraph.add(MigLanguage::Input(3));
let m3 = egraph.add(MigLanguage::Maj([a, b, d]));
egraph.union(c, d);
egraph.rebuild();
assert_eq!(egraph.find(m1), egraph.find(m3));
```
**/
#[derive(Clone, Default)]
pub struct EGraph {
    unionfind: UnionFind,
    /// Canonical enode to (possibly stale) eclass id.
    memo: HashMap<MigLanguage, Id>,
    /// Parent enodes whose children changed since the last rebuild.
    pending: Vec<(MigLanguage, Id)>,
    classes: HashMap<Id, EClass>,
    clean: bool,
}

impl Debug for EGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EGraph")
            .field("memo", &self.memo)
            .field("classes", &self.classes)
            .finish()
    }
}

impl EGraph {
    /// Returns an iterator over the eclasses in the egraph.
    ///
    /// The order is arbitrary but deterministic; use
    /// [`class_ids`](EGraph::class_ids) when order matters.
    pub fn classes(&self) -> impl ExactSizeIterator<Item = &EClass> {
        self.classes.values()
    }

    /// The canonical ids of all eclasses in ascending order.
    pub fn class_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.classes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns `true` if the egraph is empty
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    /// Returns the number of enodes in the `EGraph`.
    ///
    /// Actually returns the size of the hashcons index, which may
    /// include stale entries left behind by merges.
    pub fn total_size(&self) -> usize {
        self.memo.len()
    }

    /// Iterates over the classes, returning the total number of nodes.
    pub fn total_number_of_nodes(&self) -> usize {
        self.classes().map(|c| c.len()).sum()
    }

    /// Returns the number of eclasses in the egraph.
    pub fn number_of_classes(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no unions happened since the last rebuild.
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Canonicalizes an eclass id.
    ///
    /// This corresponds to the `find` operation on the egraph's
    /// underlying unionfind data structure.
    pub fn find(&self, id: Id) -> Id {
        self.unionfind.find(id)
    }

    fn find_mut(&mut self, id: Id) -> Id {
        self.unionfind.find_mut(id)
    }

    fn class_mut(&mut self, id: Id) -> &mut EClass {
        let id = self.find_mut(id);
        self.classes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Invalid id {}", id))
    }

    /// Lookup the eclass of the given enode.
    pub fn lookup(&self, enode: MigLanguage) -> Option<Id> {
        let enode = enode.canonical(|id| self.find(id));
        self.memo.get(&enode).map(|&id| self.find(id))
    }

    /// Lookup the eclass of the given [`RecExpr`].
    pub fn lookup_expr(&self, expr: &RecExpr<MigLanguage>) -> Option<Id> {
        let mut ids: Vec<Id> = Vec::with_capacity(expr.len());
        for node in expr.as_ref() {
            let node = node.map_children(|i| ids[usize::from(i)]);
            ids.push(self.lookup(node)?);
        }
        ids.last().copied()
    }

    /// Adds a [`RecExpr`] to the [`EGraph`], returning the id of the
    /// root's eclass.
    pub fn add_expr(&mut self, expr: &RecExpr<MigLanguage>) -> Id {
        let mut ids: Vec<Id> = Vec::with_capacity(expr.len());
        for node in expr.as_ref() {
            let node = node.map_children(|i| ids[usize::from(i)]);
            ids.push(self.add(node));
        }
        *ids.last().unwrap()
    }

    /// Adds an enode to the [`EGraph`].
    ///
    /// When adding an enode, to the egraph, [`add`] it performs
    /// _hashconsing_ (sometimes called interning in other contexts).
    ///
    /// Hashconsing ensures that only one copy of that enode is in the egraph.
    /// If a copy is in the egraph, then [`add`] simply returns the id of the
    /// eclass in which the enode was found.
    ///
    /// [`add`]: EGraph::add()
    pub fn add(&mut self, mut enode: MigLanguage) -> Id {
        enode.canonicalize(|id| self.unionfind.find_mut(id));
        if let Some(&existing) = self.memo.get(&enode) {
            trace!("Added *{:4}: {:?}", existing, enode);
            return self.find_mut(existing);
        }

        let id = self.unionfind.make_set();
        trace!("Added  {:4}: {:?}", id, enode);

        // add this enode to the parent lists of its children
        enode.for_each(|child| self.class_mut(child).parents.push((enode, id)));

        let class = EClass {
            id,
            nodes: vec![enode],
            parents: Default::default(),
        };
        self.classes.insert(id, class);
        let old = self.memo.insert(enode, id);
        debug_assert_eq!(old, None);
        id
    }

    /// Unions two eclasses given their ids.
    ///
    /// The given ids need not be canonical.
    /// Returns `true` if the two classes were distinct before.
    ///
    /// Congruence closure is only restored by [`rebuild`](EGraph::rebuild).
    pub fn union(&mut self, id1: Id, id2: Id) -> bool {
        let mut id1 = self.find_mut(id1);
        let mut id2 = self.find_mut(id2);
        if id1 == id2 {
            return false;
        }
        trace!("Unioning {} and {}", id1, id2);
        self.clean = false;

        // make sure class2 has fewer parents
        if self.classes[&id1].parents.len() < self.classes[&id2].parents.len() {
            std::mem::swap(&mut id1, &mut id2);
        }

        // make id1 the new root
        self.unionfind.union(id1, id2);

        let class2 = self
            .classes
            .remove(&id2)
            .unwrap_or_else(|| panic!("Invalid id {}", id2));
        self.pending.extend(class2.parents.iter().copied());

        let class1 = self.class_mut(id1);
        debug_assert_eq!(id1, class1.id);
        concat_vecs(&mut class1.nodes, class2.nodes);
        concat_vecs(&mut class1.parents, class2.parents);
        true
    }

    fn process_unions(&mut self) -> usize {
        let mut n_unions = 0;
        while let Some((mut node, class)) = self.pending.pop() {
            node.canonicalize(|id| self.unionfind.find_mut(id));
            if let Some(memo_class) = self.memo.insert(node, class) {
                n_unions += self.union(memo_class, class) as usize;
            }
        }
        n_unions
    }

    fn rebuild_classes(&mut self) -> usize {
        let mut trimmed = 0;
        let uf = &mut self.unionfind;
        for class in self.classes.values_mut() {
            let old_len = class.len();
            for node in class.nodes.iter_mut() {
                node.canonicalize(|id| uf.find_mut(id));
            }
            class.nodes.sort_unstable();
            class.nodes.dedup();
            trimmed += old_len - class.len();

            for (node, id) in class.parents.iter_mut() {
                node.canonicalize(|id| uf.find_mut(id));
                *id = uf.find_mut(*id);
            }
            class.parents.sort_unstable();
            class.parents.dedup();
        }
        trimmed
    }

    /// Restores the egraph invariants of congruence and enode uniqueness.
    ///
    /// Repeatedly re-canonicalizes the parents of merged classes and
    /// merges any enodes that became congruent, until nothing is
    /// pending. Returns the number of unions this caused.
    pub fn rebuild(&mut self) -> usize {
        let old_hc_size = self.memo.len();
        let old_n_eclasses = self.number_of_classes();

        let start = Instant::now();

        let n_unions = self.process_unions();
        let trimmed_nodes = self.rebuild_classes();

        let elapsed = start.elapsed();
        info!(
            concat!(
                "REBUILT! in {}.{:03}s\n",
                "  Old: hc size {}, eclasses: {}\n",
                "  New: hc size {}, eclasses: {}\n",
                "  unions: {}, trimmed nodes: {}"
            ),
            elapsed.as_secs(),
            elapsed.subsec_millis(),
            old_hc_size,
            old_n_eclasses,
            self.memo.len(),
            self.number_of_classes(),
            n_unions,
            trimmed_nodes,
        );

        debug_assert!(self.pending.is_empty());
        self.clean = true;
        n_unions
    }

    /// Checks congruence closure: no two eclasses hold the same
    /// canonical enode.
    ///
    /// Only meaningful on a clean egraph.
    pub fn is_congruent(&self) -> bool {
        let mut seen: HashMap<MigLanguage, Id> = HashMap::default();
        for class in self.classes() {
            for node in &class.nodes {
                let node = node.canonical(|id| self.find(id));
                if let Some(other) = seen.insert(node, class.id) {
                    if self.find(other) != self.find(class.id) {
                        warn!("{:?} is in both {} and {}", node, other, class.id);
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Returns a more debug-able representation of the egraph.
    ///
    /// [`EGraph`]s implement [`Debug`], but it's not pretty. It
    /// prints a lot of stuff you probably don't care about.
    /// This method returns a wrapper that implements [`Debug`] in a
    /// slightly nicer way, just dumping enodes in each eclass.
    pub fn dump(&self) -> impl Debug + '_ {
        EGraphDump(self)
    }
}

impl Index<Id> for EGraph {
    type Output = EClass;
    fn index(&self, id: Id) -> &Self::Output {
        let id = self.find(id);
        self.classes
            .get(&id)
            .unwrap_or_else(|| panic!("Invalid id {}", id))
    }
}

struct EGraphDump<'a>(&'a EGraph);

impl<'a> Debug for EGraphDump<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.0.class_ids() {
            let nodes = &self.0[id].nodes;
            writeln!(f, "{}: {:?}", id, nodes)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(egraph: &mut EGraph, n: u32) -> Vec<Id> {
        (0..n).map(|i| egraph.add(MigLanguage::Input(i))).collect()
    }

    #[test]
    fn simple_add() {
        crate::init_logger();
        let mut egraph = EGraph::default();
        let x = inputs(&mut egraph, 3);

        let m1 = egraph.add(MigLanguage::Maj([x[0], x[1], x[2]]));
        let m2 = egraph.add(MigLanguage::Maj([x[2], x[1], x[0]]));
        assert_eq!(m1, m2);
        assert_eq!(egraph.number_of_classes(), 4);
        assert_eq!(egraph.total_size(), 4);
        assert!(egraph.is_congruent());
    }

    #[test]
    fn union_then_rebuild_is_congruent() {
        crate::init_logger();
        let mut egraph = EGraph::default();
        let x = inputs(&mut egraph, 4);

        let n2 = egraph.add(MigLanguage::Not(x[2]));
        let n3 = egraph.add(MigLanguage::Not(x[3]));
        let m1 = egraph.add(MigLanguage::Maj([x[0], x[1], n2]));
        let m2 = egraph.add(MigLanguage::Maj([n3, x[1], x[0]]));
        assert_ne!(egraph.find(m1), egraph.find(m2));

        assert!(egraph.union(x[2], x[3]));
        assert!(!egraph.union(x[3], x[2]));
        assert!(!egraph.is_clean());

        // upward merging: x2 = x3 implies !x2 = !x3 implies m1 = m2
        let n_unions = egraph.rebuild();
        assert_eq!(n_unions, 2);
        assert!(egraph.is_clean());
        assert_eq!(egraph.find(n2), egraph.find(n3));
        assert_eq!(egraph.find(m1), egraph.find(m2));
        assert!(egraph.is_congruent());

        // the merged class holds exactly one majority enode
        assert_eq!(egraph[m1].len(), 1);
    }

    #[test]
    fn find_is_idempotent_after_merges() {
        let mut egraph = EGraph::default();
        let x = inputs(&mut egraph, 6);
        egraph.union(x[0], x[1]);
        egraph.union(x[2], x[3]);
        egraph.union(x[1], x[3]);
        egraph.rebuild();
        for &c in &x {
            assert_eq!(egraph.find(egraph.find(c)), egraph.find(c));
        }
        assert_eq!(egraph.number_of_classes(), 3);
        assert_eq!(egraph[x[0]].len(), 4);
    }

    #[test]
    fn cyclic_classes_are_fine() {
        let mut egraph = EGraph::default();
        let x = inputs(&mut egraph, 2);
        let n = egraph.add(MigLanguage::Not(x[0]));
        let nn = egraph.add(MigLanguage::Not(n));
        egraph.union(nn, x[0]);
        egraph.rebuild();

        // x0's class now contains !(!x0), which points back at itself
        // through the class of !x0
        let class = &egraph[x[0]];
        assert!(class.nodes.contains(&MigLanguage::Not(egraph.find(n))));
        assert!(egraph.is_congruent());
    }

    #[test]
    fn lookup_expr() {
        let mut egraph = EGraph::default();
        let expr: RecExpr<MigLanguage> = "(maj x0 x1 (! x2))".parse().unwrap();
        assert_eq!(egraph.lookup_expr(&expr), None);
        let id = egraph.add_expr(&expr);

        let permuted: RecExpr<MigLanguage> = "(maj (! x2) x0 x1)".parse().unwrap();
        assert_eq!(egraph.lookup_expr(&permuted), Some(id));
        assert_eq!(egraph.add_expr(&permuted), id);
    }
}
