use std::iter::ExactSizeIterator;

use crate::{Id, Language, MigLanguage};

/// An equivalence class of enodes.
#[non_exhaustive]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct EClass {
    /// This eclass's id.
    pub id: Id,
    /// The equivalent enodes in this equivalence class.
    pub nodes: Vec<MigLanguage>,
    /// The original enodes of the parent eclasses.
    ///
    /// Used by [`rebuild`](crate::EGraph::rebuild) to re-canonicalize
    /// every enode that points at this class after a merge.
    pub(crate) parents: Vec<(MigLanguage, Id)>,
}

impl EClass {
    /// Returns `true` if the `eclass` is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of enodes in this eclass.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over the enodes in this eclass.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MigLanguage> {
        self.nodes.iter()
    }

    /// Iterates over the childless enodes in this eclass.
    pub fn leaves(&self) -> impl Iterator<Item = &MigLanguage> {
        self.nodes.iter().filter(|&n| n.is_leaf())
    }

    /// Iterates over the parent enodes of this eclass.
    pub fn parents(&self) -> impl ExactSizeIterator<Item = &(MigLanguage, Id)> {
        self.parents.iter()
    }
}
