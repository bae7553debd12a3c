use std::fmt::Debug;

pub(crate) type BuildHasher = fxhash::FxBuildHasher;

pub(crate) type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasher>;
pub(crate) type HashSet<K> = hashbrown::HashSet<K, BuildHasher>;

pub(crate) type IndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub(crate) type IndexSet<K> = indexmap::IndexSet<K, BuildHasher>;

pub(crate) type Instant = instant::Instant;
pub(crate) type Duration = instant::Duration;

pub(crate) fn concat_vecs<T>(to: &mut Vec<T>, mut from: Vec<T>) {
    if to.len() < from.len() {
        std::mem::swap(to, &mut from)
    }
    to.extend(from);
}

/// Reads and parses an environment variable, `None` if it isn't set.
///
/// Panics if the variable is set but can't be parsed; a typo in a
/// budget should not silently fall back to the default.
pub(crate) fn env_var<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: Debug,
{
    use std::env::VarError;
    match std::env::var(name) {
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(_)) => panic!("Environment variable {} isn't unicode", name),
        Ok(v) => match v.parse() {
            Ok(v) => Some(v),
            Err(err) => panic!("Couldn't parse environment variable {}={}, {:?}", name, v, err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_keeps_everything() {
        let mut to = vec![1];
        concat_vecs(&mut to, vec![2, 3, 4]);
        to.sort_unstable();
        assert_eq!(to, vec![1, 2, 3, 4]);
    }
}
