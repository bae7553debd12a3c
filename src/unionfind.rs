use crate::Id;
use std::fmt::Debug;

/// Union-find over e-class [`Id`]s.
///
/// Every id ever handed out stays valid; a merged id simply stops
/// being a root. `find` never allocates and is idempotent.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct UnionFind {
    parents: Vec<Id>,
}

impl UnionFind {
    /// Creates a fresh singleton set and returns its id.
    pub fn make_set(&mut self) -> Id {
        let id = Id::from(self.parents.len());
        self.parents.push(id);
        id
    }

    /// Number of ids ever created, canonical or not.
    pub fn size(&self) -> usize {
        self.parents.len()
    }

    fn parent(&self, query: Id) -> Id {
        self.parents[usize::from(query)]
    }

    fn parent_mut(&mut self, query: Id) -> &mut Id {
        &mut self.parents[usize::from(query)]
    }

    /// Returns the canonical representative of `current`.
    pub fn find(&self, mut current: Id) -> Id {
        while current != self.parent(current) {
            current = self.parent(current)
        }
        current
    }

    /// Same as [`find`](UnionFind::find), but halves the path on the way up.
    pub fn find_mut(&mut self, mut current: Id) -> Id {
        while current != self.parent(current) {
            let grandparent = self.parent(self.parent(current));
            *self.parent_mut(current) = grandparent;
            current = grandparent;
        }
        current
    }

    /// Given two leader ids, unions the two eclasses making root1 the leader.
    pub fn union(&mut self, root1: Id, root2: Id) -> Id {
        debug_assert_eq!(root1, self.find(root1));
        debug_assert_eq!(root2, self.find(root2));
        *self.parent_mut(root2) = root1;
        root1
    }

    /// Returns `true` if `id` is its own representative.
    pub fn is_root(&self, id: Id) -> bool {
        self.parent(id) == id
    }
}
