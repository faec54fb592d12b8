use core::fmt;

use itertools::Itertools;

use crate::network::gates::Gate;

/// A node of the network: either a primary input or a logic gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Primary input, with its index
    Input(usize),
    /// Logic gate and its ordered fanins
    Logic(Gate, Box<[usize]>),
}

impl Node {
    /// Ordered fanins of the node; empty for inputs
    pub fn fanins(&self) -> &[usize] {
        match self {
            Node::Input(_) => &[],
            Node::Logic(_, f) => f,
        }
    }

    /// Gate function, if the node is a logic gate
    pub fn gate(&self) -> Option<&Gate> {
        match self {
            Node::Input(_) => None,
            Node::Logic(g, _) => Some(g),
        }
    }

    /// Returns whether the node is a primary input
    pub fn is_input(&self) -> bool {
        matches!(self, Node::Input(_))
    }
}

/// Gate-level network used as the input of test generation
///
/// The network is kept in topological order: a node is always added after its fanins,
/// so that iterating on node indices visits fanins first.
/// Outputs refer to the node that drives them, and the same node may drive several outputs.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<Node>,
    inputs: Vec<usize>,
    logic: Vec<usize>,
    outputs: Vec<usize>,
    fanouts: Vec<Vec<usize>>,
    output_count: Vec<u32>,
}

impl Network {
    /// Create a new network
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of primary inputs
    pub fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Return the number of primary outputs
    pub fn nb_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Return the number of nodes in the network, inputs included
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of logic nodes
    pub fn nb_logic(&self) -> usize {
        self.logic.len()
    }

    /// Get the node of the input at index i
    pub fn input(&self, i: usize) -> usize {
        self.inputs[i]
    }

    /// Get the node driving the output at index i
    pub fn output(&self, i: usize) -> usize {
        self.outputs[i]
    }

    /// Get the node at index i
    pub fn node(&self, i: usize) -> &Node {
        &self.nodes[i]
    }

    /// Get the ordered fanins of node i
    pub fn fanins(&self, i: usize) -> &[usize] {
        self.nodes[i].fanins()
    }

    /// Get the fanouts of node i; a node using i twice appears twice
    pub fn fanouts(&self, i: usize) -> &[usize] {
        &self.fanouts[i]
    }

    /// Logic nodes, in topological order
    pub fn logic(&self) -> &[usize] {
        &self.logic
    }

    /// Returns whether node i drives a primary output
    pub fn is_output(&self, i: usize) -> bool {
        self.output_count[i] != 0
    }

    /// Number of uses of node i, as a fanin or as an output
    pub fn nb_uses(&self, i: usize) -> usize {
        self.fanouts[i].len() + self.output_count[i] as usize
    }

    /// Add a new primary input
    pub fn add_input(&mut self) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Input(self.inputs.len()));
        self.inputs.push(id);
        self.fanouts.push(Vec::new());
        self.output_count.push(0);
        id
    }

    /// Add multiple primary inputs
    pub fn add_inputs(&mut self, nb: usize) -> Vec<usize> {
        (0..nb).map(|_| self.add_input()).collect()
    }

    /// Add a new logic gate; its fanins must already exist
    pub fn add_gate(&mut self, gate: Gate, fanins: &[usize]) -> usize {
        assert!(
            gate.accepts_arity(fanins.len()),
            "Gate {} does not accept {} inputs",
            gate,
            fanins.len()
        );
        let id = self.nodes.len();
        for &f in fanins {
            assert!(f < id, "Fanin {f} of node {id} does not exist yet");
            self.fanouts[f].push(id);
        }
        self.nodes.push(Node::Logic(gate, fanins.into()));
        self.logic.push(id);
        self.fanouts.push(Vec::new());
        self.output_count.push(0);
        id
    }

    /// Add a new primary output driven by an existing node
    pub fn add_output(&mut self, node: usize) {
        assert!(node < self.nb_nodes(), "Output node {node} does not exist");
        self.outputs.push(node);
        self.output_count[node] += 1;
    }

    /// Create an And gate
    pub fn and(&mut self, fanins: &[usize]) -> usize {
        self.add_gate(Gate::And, fanins)
    }

    /// Create an Or gate
    pub fn or(&mut self, fanins: &[usize]) -> usize {
        self.add_gate(Gate::Or, fanins)
    }

    /// Create a Xor gate
    pub fn xor(&mut self, fanins: &[usize]) -> usize {
        self.add_gate(Gate::Xor, fanins)
    }

    /// Create an inverter
    pub fn not(&mut self, a: usize) -> usize {
        self.add_gate(Gate::Not, &[a])
    }

    /// Check consistency of the datastructure
    pub fn check(&self) {
        assert_eq!(self.nodes.len(), self.fanouts.len());
        assert_eq!(self.nodes.len(), self.output_count.len());
        for (i, n) in self.nodes.iter().enumerate() {
            for &f in n.fanins() {
                assert!(f < i, "Network is not topologically sorted at node {i}");
                assert!(self.fanouts[f].contains(&i));
            }
            if let Node::Logic(g, f) = n {
                assert!(g.accepts_arity(f.len()), "Invalid arity for node {i}");
            }
        }
        for &o in &self.outputs {
            assert!(o < self.nb_nodes(), "Invalid output {o}");
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network with {} inputs, {} outputs:",
            self.nb_inputs(),
            self.nb_outputs()
        )?;
        for &i in &self.logic {
            if let Node::Logic(g, fanins) = self.node(i) {
                let deps = fanins.iter().map(|d| format!("n{d}")).join(", ");
                writeln!(f, "\tn{} = {}({})", i, g, deps)?;
            }
        }
        for (i, o) in self.outputs.iter().enumerate() {
            writeln!(f, "\to{} = n{}", i, o)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Gate, Network};

    #[test]
    fn test_basic() {
        let mut net = Network::default();
        let i0 = net.add_input();
        let i1 = net.add_input();
        let x = net.xor(&[i0, i1]);
        net.add_output(x);
        net.check();

        // Basic properties
        assert_eq!(net.nb_inputs(), 2);
        assert_eq!(net.nb_outputs(), 1);
        assert_eq!(net.nb_nodes(), 3);
        assert_eq!(net.nb_logic(), 1);

        // Access
        assert_eq!(net.input(0), i0);
        assert_eq!(net.input(1), i1);
        assert_eq!(net.output(0), x);
        assert_eq!(net.fanins(x), &[i0, i1]);
        assert_eq!(net.fanouts(i0), &[x]);
        assert!(net.is_output(x));
        assert!(!net.is_output(i0));
    }

    #[test]
    fn test_uses() {
        let mut net = Network::default();
        let i0 = net.add_input();
        let x = net.add_gate(Gate::And, &[i0, i0]);
        net.add_output(x);
        net.add_output(x);
        assert_eq!(net.fanouts(i0), &[x, x]);
        assert_eq!(net.nb_uses(i0), 2);
        assert_eq!(net.nb_uses(x), 2);
    }

    #[test]
    #[should_panic]
    fn test_bad_arity() {
        let mut net = Network::default();
        let i0 = net.add_input();
        let i1 = net.add_input();
        net.add_gate(Gate::Not, &[i0, i1]);
    }

    #[test]
    #[should_panic]
    fn test_forward_reference() {
        let mut net = Network::default();
        let i0 = net.add_input();
        net.add_gate(Gate::And, &[i0, 5]);
    }
}
