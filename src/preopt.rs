use log::*;

use crate::{Mig, MigNode, Network, NetworkError, Receiver, Signal};

/// A [`Receiver`] that applies the cheap, always-profitable majority
/// identities while the network streams in.
///
/// - `M(x, x, y) = x`
/// - `M(x, !x, y) = y`, which with `!false = true` also folds constants
/// - a gate with two or more inverted children becomes the inverted
///   gate over the complemented children (self-duality)
///
/// Structural hashing and double inversion come for free from [`Mig`]
/// and [`Signal`]. Nodes orphaned by the rules above stay in the
/// result; [`preoptimize`] drops them.
#[derive(Debug, Clone, Default)]
pub struct Preoptimizer {
    mig: Mig,
    folded: usize,
}

impl Preoptimizer {
    /// The majority of three edges, simplified.
    pub fn create_maj(&mut self, a: Signal, b: Signal, c: Signal) -> Signal {
        let mut children = [a, b, c];
        children.sort_unstable();
        let [a, b, c] = children;

        // sorted, so equal nodes are adjacent unless all three match
        for (x, y, other) in [(a, b, c), (b, c, a), (a, c, b)] {
            if x.node == y.node {
                self.folded += 1;
                return if x.inverted == y.inverted { x } else { other };
            }
        }

        if children.iter().filter(|s| s.inverted).count() >= 2 {
            !self.mig.create_maj(!a, !b, !c)
        } else {
            self.mig.create_maj(a, b, c)
        }
    }
}

impl Receiver for Preoptimizer {
    type Result = Mig;

    fn add(&mut self, node: MigNode) -> Signal {
        match node {
            MigNode::Maj([a, b, c]) => self.create_maj(a, b, c),
            node => self.mig.add(node),
        }
    }

    fn add_output(&mut self, signal: Signal) {
        self.mig.create_output(signal)
    }

    fn done(self) -> Mig {
        debug!("Preoptimizer folded {} gates", self.folded);
        self.mig
    }
}

/// Returns a functionally identical [`Mig`] that is structurally
/// hashed, has no trivially redundant gates, is normalized by
/// self-duality and holds no node unreachable from an output.
///
/// Primary inputs are all kept, in order, even unused ones.
pub fn preoptimize<N: Network>(ntk: &N) -> Result<Mig, NetworkError> {
    let simplified = ntk.send(Preoptimizer::default())?;
    let mig = simplified.send(Mig::new())?;
    info!(
        "Preoptimized to {} gates ({} before cleanup)",
        mig.num_gates(),
        simplified.num_gates()
    );
    Ok(mig)
}
