//! Moving networks in and out of an [`EGraph`].
use log::*;

use crate::{
    util::{HashMap, HashSet},
    CostFunction, EGraph, ExtractionError, Extractor, Id, Language, Mig, MigLanguage, MigNode,
    Receiver, Signal,
};

/// A network lifted into a fresh [`EGraph`].
#[derive(Debug, Clone, Default)]
pub struct Translation {
    /// The egraph holding one eclass per distinct node and inverted edge.
    pub egraph: EGraph,
    /// The eclass of every primary output, with the output's inversion.
    pub outputs: Vec<(Id, bool)>,
    /// The number of primary inputs of the network.
    pub num_inputs: usize,
}

/// A [`Receiver`] that adds every node it gets to an [`EGraph`].
///
/// The signals it hands out name eclasses. An inverted child edge
/// becomes a `Not` enode; an inverted output is recorded on the output
/// instead. Nothing is ever unioned, so two nodes only share an eclass
/// when hash-consing finds them identical.
///
/// # Example
/// ```
/// use migsat::*;
///
/// let mut mig = Mig::new();
/// let a = mig.create_input();
/// let b = mig.create_input();
/// let m = mig.create_maj(a, !b, mig.constant(false));
/// mig.create_output(!m);
///
/// let translation = mig.send(EGraphReceiver::default()).unwrap();
/// // false, x0, x1, !x1 and the gate
/// assert_eq!(translation.egraph.number_of_classes(), 5);
/// assert!(translation.outputs[0].1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EGraphReceiver {
    translation: Translation,
}

impl EGraphReceiver {
    fn edge(&mut self, signal: Signal) -> Id {
        let id = Id::from(signal.node);
        if signal.inverted {
            self.translation.egraph.add(MigLanguage::Not(id))
        } else {
            id
        }
    }
}

impl Receiver for EGraphReceiver {
    type Result = Translation;

    fn add(&mut self, node: MigNode) -> Signal {
        let enode = match node {
            MigNode::False => MigLanguage::False,
            MigNode::Input(i) => {
                self.translation.num_inputs = self.translation.num_inputs.max(i as usize + 1);
                MigLanguage::Input(i)
            }
            MigNode::Maj([a, b, c]) => MigLanguage::Maj([self.edge(a), self.edge(b), self.edge(c)]),
        };
        let id = self.translation.egraph.add(enode);
        Signal::new(usize::from(id), false)
    }

    fn add_output(&mut self, signal: Signal) {
        self.translation
            .outputs
            .push((Id::from(signal.node), signal.inverted));
    }

    fn done(self) -> Translation {
        let t = self.translation;
        debug!(
            "Translated {} inputs and {} outputs into {} eclasses",
            t.num_inputs,
            t.outputs.len(),
            t.egraph.number_of_classes()
        );
        t
    }
}

/// Rebuilds a [`Mig`] out of the enodes an [`Extractor`] chose.
///
/// Every eclass that is used becomes at most one node, so eclasses
/// shared between outputs stay shared. `Not` enodes become inverted
/// edges and never cost a node.
pub struct NetworkBuilder<'a, CF: CostFunction> {
    egraph: &'a EGraph,
    extractor: &'a Extractor<'a, CF>,
    built: HashMap<Id, Signal>,
    mig: Mig,
}

impl<'a, CF: CostFunction> NetworkBuilder<'a, CF> {
    /// Creates a builder whose network starts out with `num_inputs`
    /// primary inputs, so input positions survive even when some
    /// inputs are no longer used.
    pub fn new(egraph: &'a EGraph, extractor: &'a Extractor<'a, CF>, num_inputs: usize) -> Self {
        let mut mig = Mig::new();
        for _ in 0..num_inputs {
            mig.create_input();
        }
        Self {
            egraph,
            extractor,
            built: HashMap::default(),
            mig,
        }
    }

    /// The edge computing the given eclass, building whatever it needs.
    pub fn signal(&mut self, eclass: Id) -> Result<Signal, ExtractionError> {
        let root = self.egraph.find(eclass);
        let mut on_stack: HashSet<Id> = HashSet::default();
        let mut stack = vec![root];
        while let Some(&id) = stack.last() {
            if self.built.contains_key(&id) {
                stack.pop();
                continue;
            }
            let node = self.extractor.best_node(id)?;
            let pending: Vec<Id> = node
                .children()
                .iter()
                .map(|&c| self.egraph.find(c))
                .filter(|c| !self.built.contains_key(c))
                .collect();
            if !pending.is_empty() {
                if !on_stack.insert(id) {
                    return Err(ExtractionError::Cycle { class: id });
                }
                stack.extend(pending);
                continue;
            }

            let child = |c: Id| self.built[&self.egraph.find(c)];
            let signal = match node {
                MigLanguage::False => self.mig.constant(false),
                MigLanguage::Input(i) => self.mig.add(MigNode::Input(i)),
                MigLanguage::Not(a) => !child(a),
                MigLanguage::Maj([a, b, c]) => {
                    let (a, b, c) = (child(a), child(b), child(c));
                    self.mig.create_maj(a, b, c)
                }
            };
            trace!("{} -> {}", id, signal);
            self.built.insert(id, signal);
            on_stack.remove(&id);
            stack.pop();
        }
        Ok(self.built[&root])
    }

    /// Adds an output for every `(eclass, inverted)` pair, in order, and
    /// returns the finished network.
    pub fn build(mut self, outputs: &[(Id, bool)]) -> Result<Mig, ExtractionError> {
        for &(id, inverted) in outputs {
            let signal = self.signal(id)?;
            self.mig.create_output(signal ^ inverted);
        }
        debug!(
            "Built {} gates from {} eclasses",
            self.mig.num_gates(),
            self.built.len()
        );
        Ok(self.mig)
    }
}
