#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
/*!

`migsat` optimizes majority-inverter graphs (MIGs) with equality saturation.

A network enters through the [`Network`] trait, is simplified by
[`preoptimize`], lifted into an [`EGraph`], saturated with the
majority axioms in [`REWRITE_RULES`] by a [`Runner`], and read back out
by an [`Extractor`] that minimizes the number of majority gates.
[`rewrite`] and [`compile`] run the whole pipeline and push the result
into any [`Receiver`].

Inversion is an attribute of edges ([`Signal`]), so inverters never
count as gates.

## Logging

Many parts of `migsat` dump useful logging info using the [`log`](https://docs.rs/log/) crate.
The easiest way to see this info is to use the [`env_logger`](https://docs.rs/env_logger/)
crate in your binary or test.
The simplest way to enable `env_logger` is to put the following line near the top of your `main`:
`env_logger::init();`.
Then, set the environment variable `RUST_LOG=migsat=info`, or use `warn` or `debug` instead of info
for less or more logging.

## Example
```
use migsat::*;

let mut mig = Mig::new();
let a = mig.create_input();
let b = mig.create_input();
let c = mig.create_input();
// maj(a, b, maj(a, b, c)) is just maj(a, b, c)
let inner = mig.create_maj(a, b, c);
let outer = mig.create_maj(a, b, inner);
mig.create_output(outer);
mig.create_output(!inner);

let (opt, stats, ()) = rewrite(CompilerSettings::default(), &mig, Discard).unwrap();
assert_eq!(stats.instruction_count, 1);
assert_eq!(opt.simulate(), mig.simulate());
```
*/

mod macros;

mod compiler;
mod convert;
mod eclass;
mod egraph;
mod extract;
mod language;
mod network;
mod parse;
mod pattern;
mod preopt;
mod rewrite;
mod rules;
mod run;
mod subst;
mod unionfind;
mod util;

/// A key to identify [`EClass`]es within an
/// [`EGraph`].
#[derive(Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-1", serde(transparent))]
pub struct Id(u32);

impl From<usize> for Id {
    fn from(n: usize) -> Id {
        Id(n as u32)
    }
}

impl From<Id> for usize {
    fn from(id: Id) -> usize {
        id.0 as usize
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use {
    compiler::{compile, rewrite, CompilerSettings, CompilerStatistics, Error},
    convert::{EGraphReceiver, NetworkBuilder, Translation},
    eclass::EClass,
    egraph::EGraph,
    extract::*,
    language::*,
    network::{Discard, Mig, MigNode, Network, NetworkError, NodeId, Receiver, Signal},
    parse::ParseError,
    pattern::{ENodeOrVar, Pattern, SearchMatches},
    preopt::{preoptimize, Preoptimizer},
    rewrite::{Applier, Condition, ConditionEqual, ConditionalApplier, Rewrite, Searcher},
    rules::REWRITE_RULES,
    run::*,
    subst::{Subst, Var},
    unionfind::UnionFind,
};

#[cfg(test)]
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
