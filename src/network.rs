//! Majority-inverter graphs as seen from outside the egraph.
//!
//! A [`Network`] is anything that can be walked node by node; a
//! [`Receiver`] is anything a network can be pushed into. [`Mig`] is
//! both: a structurally hashed, append-only netlist.
use std::fmt::{self, Display};
use std::ops::{BitXor, Not};

use log::*;
use thiserror::Error;

use crate::util::{HashMap, HashSet};

/// Index of a node in a [`Network`].
pub type NodeId = usize;

/// An edge: a node, possibly inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    /// The node this edge reads.
    pub node: NodeId,
    /// Whether the value is complemented on the way.
    pub inverted: bool,
}

impl Signal {
    /// Creates a signal.
    pub fn new(node: NodeId, inverted: bool) -> Self {
        Self { node, inverted }
    }
}

impl Not for Signal {
    type Output = Signal;

    fn not(self) -> Signal {
        Signal::new(self.node, !self.inverted)
    }
}

impl BitXor<bool> for Signal {
    type Output = Signal;

    fn bitxor(self, invert: bool) -> Signal {
        Signal::new(self.node, self.inverted ^ invert)
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverted {
            write!(f, "!n{}", self.node)
        } else {
            write!(f, "n{}", self.node)
        }
    }
}

/// A node of a majority-inverter graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum MigNode {
    /// The constant `false`.
    False,
    /// The primary input with the given position.
    Input(u32),
    /// Three-input majority over the given edges.
    Maj([Signal; 3]),
}

impl MigNode {
    /// The edges this node reads.
    pub fn children(&self) -> &[Signal] {
        match self {
            MigNode::False | MigNode::Input(_) => &[],
            MigNode::Maj(children) => children,
        }
    }

    /// Sorts majority children; majority is symmetric.
    pub fn canonical(self) -> Self {
        match self {
            MigNode::Maj(mut children) => {
                children.sort_unstable();
                MigNode::Maj(children)
            }
            node => node,
        }
    }
}

/// A network that was rejected before any translation started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// A node refers to a node that doesn't exist.
    #[error("node {node} is referenced but does not exist")]
    DanglingReference {
        /// The missing node.
        node: NodeId,
    },
    /// A node depends on itself.
    #[error("node {node} depends on itself")]
    Cycle {
        /// A node on the cycle.
        node: NodeId,
    },
    /// An input node whose position is past the number of inputs.
    #[error("node {node} reads input {index} but the network only has {count} inputs")]
    InputOutOfRange {
        /// The input node.
        node: NodeId,
        /// Its input position.
        index: u32,
        /// The number of inputs of the network.
        count: usize,
    },
}

/// Read-only traversal of a majority-inverter graph.
pub trait Network {
    /// The node with the given id, if it exists.
    fn node(&self, id: NodeId) -> Option<MigNode>;

    /// The primary inputs, in position order.
    fn inputs(&self) -> Vec<NodeId>;

    /// The primary outputs, in order.
    fn outputs(&self) -> Vec<Signal>;

    /// Validates this network and pushes everything reachable from
    /// the outputs into `receiver`, children before parents.
    ///
    /// All inputs are added first, in position order, whether they are
    /// used or not. Each node is added at most once.
    fn send<R: Receiver>(&self, receiver: R) -> Result<R::Result, NetworkError>
    where
        Self: Sized,
    {
        send(self, receiver)
    }
}

/// A sink that builds something out of a network pushed node by node.
pub trait Receiver {
    /// What the receiver produces once the network is complete.
    type Result;

    /// Adds a node whose children have already been added, and
    /// returns the edge the rest of the network should use for it.
    fn add(&mut self, node: MigNode) -> Signal;

    /// Marks an edge as the next primary output.
    fn add_output(&mut self, signal: Signal);

    /// Finishes the network.
    fn done(self) -> Self::Result;
}

/// A [`Receiver`] that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Receiver for Discard {
    type Result = ();

    fn add(&mut self, _node: MigNode) -> Signal {
        Signal::default()
    }

    fn add_output(&mut self, _signal: Signal) {}

    fn done(self) {}
}

enum Visit {
    Enter(NodeId),
    Exit(NodeId, [Signal; 3]),
}

fn send<N: Network, R: Receiver>(ntk: &N, mut receiver: R) -> Result<R::Result, NetworkError> {
    let inputs = ntk.inputs();
    let count = inputs.len();
    for &id in &inputs {
        ntk.node(id)
            .ok_or(NetworkError::DanglingReference { node: id })?;
    }
    let input_signals: Vec<Signal> = (0..count)
        .map(|i| receiver.add(MigNode::Input(i as u32)))
        .collect();

    let mut done: HashMap<NodeId, Signal> = HashMap::default();
    let mut on_path: HashSet<NodeId> = HashSet::default();
    let mut stack = vec![];

    let outputs = ntk.outputs();
    let mut results = Vec::with_capacity(outputs.len());
    for out in outputs {
        stack.push(Visit::Enter(out.node));
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    if done.contains_key(&id) {
                        continue;
                    }
                    if on_path.contains(&id) {
                        return Err(NetworkError::Cycle { node: id });
                    }
                    match ntk.node(id) {
                        None => return Err(NetworkError::DanglingReference { node: id }),
                        Some(MigNode::False) => {
                            done.insert(id, receiver.add(MigNode::False));
                        }
                        Some(MigNode::Input(index)) => {
                            let signal = input_signals.get(index as usize).copied().ok_or(
                                NetworkError::InputOutOfRange {
                                    node: id,
                                    index,
                                    count,
                                },
                            )?;
                            done.insert(id, signal);
                        }
                        Some(MigNode::Maj(children)) => {
                            on_path.insert(id);
                            stack.push(Visit::Exit(id, children));
                            stack.extend(children.iter().rev().map(|c| Visit::Enter(c.node)));
                        }
                    }
                }
                Visit::Exit(id, children) => {
                    let children = children.map(|c| done[&c.node] ^ c.inverted);
                    on_path.remove(&id);
                    done.insert(id, receiver.add(MigNode::Maj(children)));
                }
            }
        }
        results.push(done[&out.node] ^ out.inverted);
    }

    for signal in results {
        receiver.add_output(signal);
    }
    trace!("Sent {} nodes", done.len());
    Ok(receiver.done())
}

/// A structurally hashed majority-inverter graph.
///
/// Node 0 is always the constant `false`; `true` is its complement.
/// Majority children are stored sorted, and adding a node that already
/// exists returns the existing one. Nothing is ever simplified or
/// removed; see [`preoptimize`](crate::preoptimize) for that.
///
/// # Example
/// ```
/// use migsat::*;
///
/// let mut mig = Mig::new();
/// let a = mig.create_input();
/// let b = mig.create_input();
/// let c = mig.create_input();
/// let m1 = mig.create_maj(a, b, !c);
/// let m2 = mig.create_maj(!c, a, b);
/// assert_eq!(m1, m2);
/// mig.create_output(!m1);
/// assert_eq!(mig.num_gates(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mig {
    nodes: Vec<MigNode>,
    inputs: Vec<NodeId>,
    outputs: Vec<Signal>,
    strash: HashMap<MigNode, NodeId>,
}

impl Default for Mig {
    fn default() -> Self {
        Self::new()
    }
}

impl Mig {
    /// An empty graph holding only the constant node.
    pub fn new() -> Self {
        let mut strash = HashMap::default();
        strash.insert(MigNode::False, 0);
        Self {
            nodes: vec![MigNode::False],
            inputs: vec![],
            outputs: vec![],
            strash,
        }
    }

    /// A constant edge.
    pub fn constant(&self, value: bool) -> Signal {
        Signal::new(0, value)
    }

    /// Appends a new primary input.
    pub fn create_input(&mut self) -> Signal {
        let node = MigNode::Input(self.inputs.len() as u32);
        let id = self.push(node);
        self.inputs.push(id);
        Signal::new(id, false)
    }

    /// The majority of three edges, reusing an existing node if there
    /// is one with the same (unordered) children.
    pub fn create_maj(&mut self, a: Signal, b: Signal, c: Signal) -> Signal {
        for s in [a, b, c] {
            debug_assert!(s.node < self.nodes.len(), "{} is not in this graph", s);
        }
        let node = MigNode::Maj([a, b, c]).canonical();
        let id = match self.strash.get(&node) {
            Some(&id) => id,
            None => self.push(node),
        };
        Signal::new(id, false)
    }

    /// Marks an edge as the next primary output.
    pub fn create_output(&mut self, signal: Signal) {
        debug_assert!(signal.node < self.nodes.len());
        self.outputs.push(signal);
    }

    fn push(&mut self, node: MigNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.strash.insert(node, id);
        id
    }

    /// Number of nodes including the constant and the inputs.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of primary inputs.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of primary outputs.
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Number of majority gates.
    pub fn num_gates(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, MigNode::Maj(_)))
            .count()
    }

    /// Iterates over `(id, node)` in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MigNode)> {
        self.nodes.iter().enumerate()
    }

    /// Evaluates every output under every input assignment.
    ///
    /// Returns one truth table per output, packed 64 assignments to a
    /// word; bit `j` of the table is the output value when input `i`
    /// is set to bit `i` of `j`. Unused bits of the last word are
    /// zero.
    ///
    /// # Panics
    /// If the graph has more than 20 inputs.
    pub fn simulate(&self) -> Vec<Vec<u64>> {
        let n = self.inputs.len();
        assert!(n <= 20, "refusing to simulate {} inputs exhaustively", n);
        let rows = 1usize << n;
        let words = (rows + 63) / 64;
        let last_mask = if rows % 64 == 0 {
            u64::MAX
        } else {
            (1u64 << rows) - 1
        };

        const PATTERNS: [u64; 6] = [
            0xAAAA_AAAA_AAAA_AAAA,
            0xCCCC_CCCC_CCCC_CCCC,
            0xF0F0_F0F0_F0F0_F0F0,
            0xFF00_FF00_FF00_FF00,
            0xFFFF_0000_FFFF_0000,
            0xFFFF_FFFF_0000_0000,
        ];

        let mut tables = vec![Vec::with_capacity(words); self.outputs.len()];
        let mut values = vec![0u64; self.nodes.len()];
        for w in 0..words {
            for (id, node) in self.nodes.iter().enumerate() {
                values[id] = match node {
                    MigNode::False => 0,
                    MigNode::Input(i) => match *i as usize {
                        i if i < 6 => PATTERNS[i],
                        i if (w >> (i - 6)) & 1 == 1 => u64::MAX,
                        _ => 0,
                    },
                    MigNode::Maj([a, b, c]) => {
                        let get = |s: &Signal| {
                            let v = values[s.node];
                            if s.inverted {
                                !v
                            } else {
                                v
                            }
                        };
                        let (a, b, c) = (get(a), get(b), get(c));
                        (a & b) | (a & c) | (b & c)
                    }
                };
            }
            let mask = if w + 1 == words { last_mask } else { u64::MAX };
            for (table, out) in tables.iter_mut().zip(&self.outputs) {
                let v = values[out.node];
                let v = if out.inverted { !v } else { v };
                table.push(v & mask);
            }
        }
        tables
    }
}

impl Network for Mig {
    fn node(&self, id: NodeId) -> Option<MigNode> {
        self.nodes.get(id).copied()
    }

    fn inputs(&self) -> Vec<NodeId> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<Signal> {
        self.outputs.clone()
    }
}

impl Receiver for Mig {
    type Result = Mig;

    fn add(&mut self, node: MigNode) -> Signal {
        match node {
            MigNode::False => self.constant(false),
            MigNode::Input(i) => {
                while self.inputs.len() <= i as usize {
                    self.create_input();
                }
                Signal::new(self.inputs[i as usize], false)
            }
            MigNode::Maj([a, b, c]) => self.create_maj(a, b, c),
        }
    }

    fn add_output(&mut self, signal: Signal) {
        self.create_output(signal)
    }

    fn done(self) -> Mig {
        self
    }
}

impl Display for Mig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.iter() {
            match node {
                MigNode::False => writeln!(f, "n{} = false", id)?,
                MigNode::Input(i) => writeln!(f, "n{} = x{}", id, i)?,
                MigNode::Maj([a, b, c]) => writeln!(f, "n{} = maj({}, {}, {})", id, a, b, c)?,
            }
        }
        for (i, out) in self.outputs.iter().enumerate() {
            writeln!(f, "y{} = {}", i, out)?;
        }
        Ok(())
    }
}
