use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use smallvec::SmallVec;

use crate::{util::IndexSet, Id};

static STRINGS: Lazy<Mutex<IndexSet<String>>> = Lazy::new(Default::default);

/// A variable for use in [`Pattern`](crate::Pattern)s or [`Subst`]s.
///
/// This implements [`FromStr`], and will only parse if it has a
/// leading `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl FromStr for Var {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > 1 && s.starts_with('?') {
            let mut strings = STRINGS.lock().unwrap_or_else(|e| e.into_inner());
            let (i, _) = strings.insert_full(s.to_owned());
            Ok(Var(i as u32))
        } else {
            Err(format!("{} doesn't start with '?'", s))
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strings = STRINGS.lock().unwrap_or_else(|e| e.into_inner());
        match strings.get_index(self.0 as usize) {
            Some(s) => f.write_str(s),
            None => write!(f, "?{}", self.0),
        }
    }
}

/// A substitution mapping [`Var`]s to eclass [`Id`]s.
///
/// Bindings are kept sorted by variable, so two substitutions with
/// the same bindings compare equal regardless of insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subst {
    vec: SmallVec<[(Var, Id); 3]>,
}

impl Subst {
    /// Create a `Subst` with the given initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vec: SmallVec::with_capacity(capacity),
        }
    }

    /// Insert something, returning the old `Id` if present.
    pub fn insert(&mut self, var: Var, id: Id) -> Option<Id> {
        match self.vec.binary_search_by_key(&var, |(v, _)| *v) {
            Ok(i) => Some(std::mem::replace(&mut self.vec[i].1, id)),
            Err(i) => {
                self.vec.insert(i, (var, id));
                None
            }
        }
    }

    /// Retrieve a `Var`, returning `None` if not present.
    #[inline(never)]
    pub fn get(&self, var: Var) -> Option<&Id> {
        self.vec
            .binary_search_by_key(&var, |(v, _)| *v)
            .ok()
            .map(|i| &self.vec[i].1)
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Iterates over the bindings in variable order.
    pub fn iter(&self) -> impl Iterator<Item = &(Var, Id)> {
        self.vec.iter()
    }
}

impl std::ops::Index<Var> for Subst {
    type Output = Id;

    fn index(&self, var: Var) -> &Self::Output {
        match self.get(var) {
            Some(id) => id,
            None => panic!("Var '{}={}' not found in {:?}", var.0, var, self),
        }
    }
}

impl fmt::Display for Subst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, id)) in self.vec.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", var, id)?;
        }
        write!(f, "}}")
    }
}
