use std::fmt::{self, Display};

use log::*;

use crate::{Applier, EGraph, Id, Language, MigLanguage, RecExpr, Searcher, Subst, Var};

/// A pattern that can function as either a [`Searcher`] or [`Applier`].
///
/// A [`Pattern`] is essentially a for-all quantified expression with
/// [`Var`]s as the variables (in the logical sense).
///
/// When creating a [`Rewrite`], the most common thing to use as either
/// the left hand side (the [`Searcher`]) or the right hand side
/// (the [`Applier`]) is a [`Pattern`].
///
/// As a [`Searcher`], a [`Pattern`] does the intuitive
/// thing.
/// Here is a somewhat verbose formal-ish statement:
/// Searching for a pattern in an egraph yields substitutions
/// ([`Subst`]s) _s_ such that, for any _s'_ (where instead of
/// mapping a variables to an eclass as _s_ does, _s'_ maps
/// a variable to an arbitrary expression represented by that
/// eclass), _p[s']_ (the pattern under substitution _s'_) is also
/// represented by the egraph.
///
/// Majority is symmetric, so a `maj` pattern node matches a majority
/// enode under every permutation of its children. Rules therefore
/// never need to spell out commutativity.
///
/// As an [`Applier`], a [`Pattern`] performs the given substitution
/// and adds the result to the [`EGraph`].
///
/// [`Rewrite`]: crate::Rewrite
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pattern {
    /// The actual pattern as a [`RecExpr`]
    pub ast: RecExpr<ENodeOrVar>,
    vars: Vec<Var>,
}

/// The language of [`Pattern`]s.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
pub enum ENodeOrVar {
    /// An enode from the underlying [`MigLanguage`]
    ENode(MigLanguage),
    /// A pattern variable
    Var(Var),
}

impl Language for ENodeOrVar {
    fn children(&self) -> &[Id] {
        match self {
            ENodeOrVar::ENode(n) => n.children(),
            ENodeOrVar::Var(_) => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [Id] {
        match self {
            ENodeOrVar::ENode(n) => n.children_mut(),
            ENodeOrVar::Var(_) => &mut [],
        }
    }
}

impl Display for ENodeOrVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ENode(node) => Display::fmt(node, f),
            Self::Var(var) => Display::fmt(var, f),
        }
    }
}

const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

impl Pattern {
    /// Creates a new pattern from the given pattern ast.
    pub fn new(ast: RecExpr<ENodeOrVar>) -> Self {
        let mut vars = vec![];
        for n in ast.as_ref() {
            if let ENodeOrVar::Var(v) = n {
                if !vars.contains(v) {
                    vars.push(*v)
                }
            }
        }
        Pattern { ast, vars }
    }

    /// Returns a list of the [`Var`]s in this pattern.
    pub fn vars(&self) -> Vec<Var> {
        self.vars.clone()
    }

    fn match_class(&self, egraph: &EGraph, pat: Id, eclass: Id, mut subst: Subst) -> Vec<Subst> {
        let eclass = egraph.find(eclass);
        let pnode = match &self.ast[pat] {
            ENodeOrVar::Var(v) => {
                return match subst.get(*v) {
                    None => {
                        subst.insert(*v, eclass);
                        vec![subst]
                    }
                    Some(&bound) if egraph.find(bound) == eclass => vec![subst],
                    Some(_) => vec![],
                }
            }
            ENodeOrVar::ENode(pnode) => pnode,
        };

        let mut substs = vec![];
        for enode in egraph[eclass].iter().filter(|n| pnode.matches(n)) {
            match (pnode, enode) {
                (MigLanguage::Maj(pats), MigLanguage::Maj(ids)) => {
                    for perm in &PERMUTATIONS {
                        let ids = [ids[perm[0]], ids[perm[1]], ids[perm[2]]];
                        substs.extend(self.match_children(egraph, pats, &ids, subst.clone()));
                    }
                }
                _ => substs.extend(self.match_children(
                    egraph,
                    pnode.children(),
                    enode.children(),
                    subst.clone(),
                )),
            }
        }
        substs
    }

    fn match_children(&self, egraph: &EGraph, pats: &[Id], ids: &[Id], subst: Subst) -> Vec<Subst> {
        debug_assert_eq!(pats.len(), ids.len());
        let mut substs = vec![subst];
        for (&pat, &id) in pats.iter().zip(ids) {
            substs = substs
                .into_iter()
                .flat_map(|s| self.match_class(egraph, pat, id, s))
                .collect();
            if substs.is_empty() {
                break;
            }
            // permuted siblings bind the same variables to the same classes
            substs.sort_unstable();
            substs.dedup();
        }
        substs
    }

    /// Instantiates this pattern under `subst`, adding every node to
    /// the egraph, and returns the root's class.
    pub fn instantiate(&self, egraph: &mut EGraph, subst: &Subst) -> Id {
        let mut ids: Vec<Id> = Vec::with_capacity(self.ast.len());
        for node in self.ast.as_ref() {
            let id = match node {
                ENodeOrVar::Var(v) => subst[*v],
                ENodeOrVar::ENode(n) => egraph.add(n.map_children(|c| ids[usize::from(c)])),
            };
            ids.push(id);
        }
        *ids.last().unwrap()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.ast, f)
    }
}

/// The result of searching a [`Searcher`] over one eclass.
///
/// Note that one [`SearchMatches`] can contain many found
/// substitutions. So a call to [`Searcher::search`] over the whole
/// egraph returns one of these for every eclass that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatches {
    /// The eclass id that these matches were found in.
    pub eclass: Id,
    /// The distinct matches in this eclass.
    pub substs: Vec<Subst>,
}

impl Searcher for Pattern {
    fn search_eclass(&self, egraph: &EGraph, eclass: Id) -> Option<SearchMatches> {
        let mut substs = self.match_class(egraph, self.ast.root(), eclass, Subst::default());
        // different enodes of the class can bind alike
        substs.sort_unstable();
        substs.dedup();
        if substs.is_empty() {
            None
        } else {
            trace!("Found {} matches of {} in {}", substs.len(), self, eclass);
            Some(SearchMatches {
                eclass: egraph.find(eclass),
                substs,
            })
        }
    }

    fn vars(&self) -> Vec<Var> {
        Pattern::vars(self)
    }

    fn get_pattern_ast(&self) -> Option<&Pattern> {
        Some(self)
    }
}

impl Applier for Pattern {
    fn apply_one(&self, egraph: &mut EGraph, _eclass: Id, subst: &Subst) -> Vec<Id> {
        vec![self.instantiate(egraph, subst)]
    }

    fn vars(&self) -> Vec<Var> {
        Pattern::vars(self)
    }

    fn get_pattern_ast(&self) -> Option<&Pattern> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> Var {
        s.parse().unwrap()
    }

    #[test]
    fn simple_match() {
        crate::init_logger();
        let mut egraph = EGraph::default();

        let x: Vec<Id> = (0..3).map(|i| egraph.add(MigLanguage::Input(i))).collect();
        let n = egraph.add(MigLanguage::Not(x[1]));
        let m = egraph.add(MigLanguage::Maj([x[0], n, x[2]]));
        egraph.rebuild();

        // the negated child is in the middle of the pattern but the
        // enode stores it wherever sorting put it
        let pat: Pattern = "(maj ?a (! ?b) ?c)".parse().unwrap();
        let matches = pat.search(&egraph);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].eclass, m);

        // ?a and ?c can be x0/x2 in either order
        let substs = &matches[0].substs;
        assert_eq!(substs.len(), 2);
        for s in substs {
            assert_eq!(s[var("?b")], x[1]);
            assert_ne!(s[var("?a")], s[var("?c")]);
        }
    }

    #[test]
    fn repeated_vars_must_agree() {
        let mut egraph = EGraph::default();
        let a = egraph.add(MigLanguage::Input(0));
        let b = egraph.add(MigLanguage::Input(1));
        let m1 = egraph.add(MigLanguage::Maj([a, b, a]));
        let _m2 = egraph.add(MigLanguage::Maj([a, b, m1]));
        egraph.rebuild();

        let pat: Pattern = "(maj ?x ?x ?y)".parse().unwrap();
        let matches = pat.search(&egraph);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].eclass, m1);
        assert_eq!(matches[0].substs.len(), 1);
        assert_eq!(matches[0].substs[0][var("?x")], a);
        assert_eq!(matches[0].substs[0][var("?y")], b);
    }

    #[test]
    fn instantiate_adds_nodes() {
        let mut egraph = EGraph::default();
        let a = egraph.add(MigLanguage::Input(0));
        let b = egraph.add(MigLanguage::Input(1));

        let pat: Pattern = "(maj (! ?a) ?b false)".parse().unwrap();
        let mut subst = Subst::default();
        subst.insert(var("?a"), a);
        subst.insert(var("?b"), b);
        let id = pat.instantiate(&mut egraph, &subst);

        let f = egraph.lookup(MigLanguage::False).unwrap();
        let na = egraph.lookup(MigLanguage::Not(a)).unwrap();
        assert_eq!(egraph.lookup(MigLanguage::Maj([f, b, na])), Some(id));
        assert_eq!(pat.vars(), vec![var("?a"), var("?b")]);
    }

    #[test]
    fn nested_majority_matches_every_ordering() {
        let mut egraph = EGraph::default();
        let root = egraph.add_expr(&"(maj (maj x0 x1 x2) x3 x4)".parse().unwrap());
        egraph.rebuild();

        let pat: Pattern = "(maj (maj ?a ?b ?c) ?d ?e)".parse().unwrap();
        let matches = pat.search_eclass(&egraph, root).unwrap();
        // 3! orderings inside times 2! outside
        assert_eq!(matches.substs.len(), 12);
        let mut substs = matches.substs.clone();
        substs.dedup();
        assert_eq!(substs.len(), 12);
    }
}
