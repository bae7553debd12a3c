use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::ops::{Index, IndexMut};

use symbolic_expressions::Sexp;
use thiserror::Error;

use crate::Id;

/// Something whose children are e-class [`Id`]s.
///
/// [`MigLanguage`] is the only language the e-graph stores; this trait
/// exists so that [`RecExpr`] can also hold pattern nodes.
#[allow(clippy::len_without_is_empty)]
pub trait Language: Debug + Clone + Eq + Ord + Hash {
    /// Return a slice of the children `Id`s.
    fn children(&self) -> &[Id];

    /// Return a mutable slice of the children `Id`s.
    fn children_mut(&mut self) -> &mut [Id];

    /// Runs a given function on each child `Id`.
    fn for_each<F: FnMut(Id)>(&self, f: F) {
        self.children().iter().copied().for_each(f)
    }

    /// Returns the number of the children this enode has.
    fn len(&self) -> usize {
        self.children().len()
    }

    /// Returns true if this enode has no children.
    fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Runs a given function to replace the children.
    fn update_children<F: FnMut(Id) -> Id>(&mut self, mut f: F) {
        self.children_mut().iter_mut().for_each(|id| *id = f(*id))
    }

    /// Creates a new enode with children determined by the given function.
    fn map_children<F: FnMut(Id) -> Id>(mut self, f: F) -> Self {
        self.update_children(f);
        self
    }

    /// Returns true if any child satisfies the predicate.
    fn any<F: FnMut(Id) -> bool>(&self, f: F) -> bool {
        self.children().iter().copied().any(f)
    }
}

/// The e-node language of majority-inverter graphs.
///
/// Inversion is its own e-node so that rewrites can talk about it, but
/// it is free: extraction folds every [`Not`](MigLanguage::Not) back
/// onto an edge.
///
/// Majority is symmetric, so the children of a
/// [`Maj`](MigLanguage::Maj) are kept sorted once canonicalized; see
/// [`MigLanguage::canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum MigLanguage {
    /// The constant `false`. `true` is `(! false)`.
    False,
    /// The primary input with the given position.
    Input(u32),
    /// Logical inversion of a class.
    Not(Id),
    /// Three-input majority.
    Maj([Id; 3]),
}

impl Language for MigLanguage {
    fn children(&self) -> &[Id] {
        match self {
            MigLanguage::False | MigLanguage::Input(_) => &[],
            MigLanguage::Not(id) => std::slice::from_ref(id),
            MigLanguage::Maj(ids) => ids,
        }
    }

    fn children_mut(&mut self) -> &mut [Id] {
        match self {
            MigLanguage::False | MigLanguage::Input(_) => &mut [],
            MigLanguage::Not(id) => std::slice::from_mut(id),
            MigLanguage::Maj(ids) => ids,
        }
    }
}

impl MigLanguage {
    /// Returns true if this enode has the same operator (and leaf data)
    /// as `other`, ignoring children.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (MigLanguage::False, MigLanguage::False) => true,
            (MigLanguage::Input(a), MigLanguage::Input(b)) => a == b,
            (MigLanguage::Not(_), MigLanguage::Not(_)) => true,
            (MigLanguage::Maj(_), MigLanguage::Maj(_)) => true,
            _ => false,
        }
    }

    /// Resolves every child with `find` and puts majority children into
    /// sorted order, so that congruent enodes compare equal.
    pub fn canonicalize(&mut self, find: impl FnMut(Id) -> Id) {
        self.update_children(find);
        if let MigLanguage::Maj(ids) = self {
            ids.sort_unstable();
        }
    }

    /// Like [`canonicalize`](MigLanguage::canonicalize) but by value.
    pub fn canonical(mut self, find: impl FnMut(Id) -> Id) -> Self {
        self.canonicalize(find);
        self
    }

    /// Tries to build an enode from an operator string and children.
    ///
    /// Operators are `false`, `!`, `maj` and `x<n>` for inputs.
    pub fn from_op(op: &str, children: Vec<Id>) -> Result<Self, FromOpError> {
        let node = match (op, children.as_slice()) {
            ("false", []) => Some(MigLanguage::False),
            ("!", &[a]) => Some(MigLanguage::Not(a)),
            ("maj", &[a, b, c]) => Some(MigLanguage::Maj([a, b, c])),
            (op, []) if op.starts_with('x') => op[1..].parse().ok().map(MigLanguage::Input),
            _ => None,
        };
        node.ok_or_else(|| FromOpError::new(op, children))
    }
}

impl Display for MigLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigLanguage::False => f.write_str("false"),
            MigLanguage::Input(i) => write!(f, "x{}", i),
            MigLanguage::Not(_) => f.write_str("!"),
            MigLanguage::Maj(_) => f.write_str("maj"),
        }
    }
}

/// An error given when parsing an operator fails.
#[derive(Debug, Error)]
#[error("could not parse an e-node with operator {op:?} and children {children:?}")]
pub struct FromOpError {
    op: String,
    children: Vec<Id>,
}

impl FromOpError {
    /// Create a new `FromOpError` representing a failed call to
    /// [`MigLanguage::from_op`].
    pub fn new(op: &str, children: Vec<Id>) -> Self {
        Self {
            op: op.to_owned(),
            children,
        }
    }
}

/// A recursive expression stored as a flat list of nodes.
///
/// Children must refer to nodes earlier in the list; the last node is
/// the root.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct RecExpr<L> {
    nodes: Vec<L>,
}

impl<L> Default for RecExpr<L> {
    fn default() -> Self {
        Self { nodes: vec![] }
    }
}

impl<L> AsRef<[L]> for RecExpr<L> {
    fn as_ref(&self) -> &[L] {
        &self.nodes
    }
}

impl<L: Language> From<Vec<L>> for RecExpr<L> {
    fn from(nodes: Vec<L>) -> Self {
        debug_assert!(nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.children().iter().all(|&c| usize::from(c) < i)));
        Self { nodes }
    }
}

impl<L: Language> RecExpr<L> {
    /// Adds a given enode to this `RecExpr`.
    /// The enode's children `Id`s must refer to elements already in this list.
    pub fn add(&mut self, node: L) -> Id {
        debug_assert!(
            node.children()
                .iter()
                .all(|&id| usize::from(id) < self.nodes.len()),
            "node {:?} has children not in this expr: {:?}",
            node,
            self
        );
        self.nodes.push(node);
        Id::from(self.nodes.len() - 1)
    }

    /// The id of the root, i.e. the last node.
    pub fn root(&self) -> Id {
        Id::from(self.nodes.len() - 1)
    }

    /// Returns true if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes, shared or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl<L: Language + Display> RecExpr<L> {
    fn to_sexp(&self, i: Id) -> Sexp {
        let node = &self[i];
        let op = Sexp::String(node.to_string());
        if node.is_leaf() {
            op
        } else {
            let mut vec = vec![op];
            node.for_each(|id| vec.push(self.to_sexp(id)));
            Sexp::List(vec)
        }
    }
}

impl<L> Index<Id> for RecExpr<L> {
    type Output = L;
    fn index(&self, id: Id) -> &L {
        &self.nodes[usize::from(id)]
    }
}

impl<L> IndexMut<Id> for RecExpr<L> {
    fn index_mut(&mut self, id: Id) -> &mut L {
        &mut self.nodes[usize::from(id)]
    }
}

impl<L: Language + Display> Display for RecExpr<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            Display::fmt("()", f)
        } else {
            let s = self.to_sexp(self.root()).to_string();
            Display::fmt(&s, f)
        }
    }
}
