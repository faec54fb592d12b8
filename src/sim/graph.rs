//! Simulation graph: a copy of the network with primitive gates only, split in fanout-free regions
//!
//! Complex gates are decomposed into primitive gates, with buffer and inverter helper nodes
//! so that each literal of the expression has a single driver. The edge map records, for each
//! fanin position of the network, the simulation node and input position that realize it.

use crate::sim::values::{PackedVal, Val3};
use crate::{Expr, Gate, Network, Node};

/// Primitive gate function of a simulation node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimGate {
    /// Primary input
    Input,
    /// Constant value
    Const(bool),
    /// Buffer
    Buf,
    /// Inverter
    Not,
    /// And gate
    And,
    /// Nand gate
    Nand,
    /// Or gate
    Or,
    /// Nor gate
    Nor,
    /// Xor gate
    Xor,
    /// Xnor gate
    Xnor,
}

impl SimGate {
    fn is_inverting(self) -> bool {
        matches!(self, SimGate::Not | SimGate::Nand | SimGate::Nor | SimGate::Xnor)
    }
}

/// A node of the simulation graph
#[derive(Clone, Debug)]
pub struct SimNode {
    gate: SimGate,
    fanins: Box<[usize]>,
    fanouts: Vec<usize>,
    fanout_ipos: Vec<usize>,
    level: usize,
    ffr: usize,
    is_output: bool,
}

impl SimNode {
    fn new(gate: SimGate, fanins: &[usize]) -> SimNode {
        SimNode {
            gate,
            fanins: fanins.into(),
            fanouts: Vec::new(),
            fanout_ipos: Vec::new(),
            level: 0,
            ffr: 0,
            is_output: false,
        }
    }

    /// Gate function
    pub fn gate(&self) -> SimGate {
        self.gate
    }

    /// Ordered fanins
    pub fn fanins(&self) -> &[usize] {
        &self.fanins
    }

    /// Fanouts; a node used twice by the same gate appears twice
    pub fn fanouts(&self) -> &[usize] {
        &self.fanouts
    }

    /// Input position in each fanout
    pub fn fanout_ipos(&self) -> &[usize] {
        &self.fanout_ipos
    }

    /// Longest path from an input
    pub fn level(&self) -> usize {
        self.level
    }

    /// Index of the fanout-free region containing the node
    pub fn ffr(&self) -> usize {
        self.ffr
    }

    /// Returns whether the node drives a primary output
    pub fn is_output(&self) -> bool {
        self.is_output
    }

    /// Returns whether the node is a primary input
    pub fn is_input(&self) -> bool {
        self.gate == SimGate::Input
    }

    /// Evaluate the node on packed values, given the value of each node
    ///
    /// Inputs have no function: their value is set by the caller.
    pub fn eval<F: Fn(usize) -> PackedVal>(&self, val: F) -> PackedVal {
        let vals = self.fanins.iter().map(|f| val(*f));
        let ret = match self.gate {
            SimGate::Input => PackedVal::ALL0,
            SimGate::Const(b) => return PackedVal::from_bool(b),
            SimGate::Buf | SimGate::Not => val(self.fanins[0]),
            SimGate::And | SimGate::Nand => vals.fold(PackedVal::ALL1, |a, v| a & v),
            SimGate::Or | SimGate::Nor => vals.fold(PackedVal::ALL0, |a, v| a | v),
            SimGate::Xor | SimGate::Xnor => vals.fold(PackedVal::ALL0, |a, v| a ^ v),
        };
        if self.gate.is_inverting() {
            !ret
        } else {
            ret
        }
    }

    /// Lanes where a change on input ipos changes the output of the gate
    pub fn gobs<F: Fn(usize) -> PackedVal>(&self, ipos: usize, val: F) -> PackedVal {
        let others = self
            .fanins
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ipos)
            .map(|(_, f)| val(*f));
        match self.gate {
            SimGate::Input | SimGate::Const(_) => PackedVal::ALL0,
            SimGate::Buf | SimGate::Not | SimGate::Xor | SimGate::Xnor => PackedVal::ALL1,
            SimGate::And | SimGate::Nand => others.fold(PackedVal::ALL1, |a, v| a & v),
            SimGate::Or | SimGate::Nor => others.fold(PackedVal::ALL1, |a, v| a & !v),
        }
    }

    /// Evaluate the node on ternary values, given the value of each node
    pub fn eval3<F: Fn(usize) -> Val3>(&self, val: F) -> Val3 {
        let vals = self.fanins.iter().map(|f| val(*f));
        let ret = match self.gate {
            SimGate::Input => Val3::X,
            SimGate::Const(b) => return Val3::from(b),
            SimGate::Buf | SimGate::Not => val(self.fanins[0]),
            SimGate::And | SimGate::Nand => Val3::and(vals),
            SimGate::Or | SimGate::Nor => Val3::or(vals),
            SimGate::Xor | SimGate::Xnor => Val3::xor(vals),
        };
        if self.gate.is_inverting() {
            !ret
        } else {
            ret
        }
    }

    /// Whether a change on input ipos is guaranteed to change the output of the gate
    pub fn gobs3<F: Fn(usize) -> Val3>(&self, ipos: usize, val: F) -> bool {
        let mut others = self
            .fanins
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ipos)
            .map(|(_, f)| val(*f));
        match self.gate {
            SimGate::Input | SimGate::Const(_) => false,
            SimGate::Buf | SimGate::Not => true,
            SimGate::And | SimGate::Nand => others.all(|v| v == Val3::One),
            SimGate::Or | SimGate::Nor => others.all(|v| v == Val3::Zero),
            SimGate::Xor | SimGate::Xnor => others.all(|v| v.is_known()),
        }
    }
}

/// A fanout-free region: a tree of nodes whose only multi-fanout node is the root
#[derive(Clone, Debug)]
pub struct SimFfr {
    root: usize,
    nodes: Vec<usize>,
}

impl SimFfr {
    /// Root node of the region
    pub fn root(&self) -> usize {
        self.root
    }

    /// Nodes of the region, in topological order
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }
}

/// Simulation graph, built once from a network and read-only afterwards
#[derive(Clone, Debug)]
pub struct SimGraph {
    nodes: Vec<SimNode>,
    inputs: Vec<usize>,
    logic: Vec<usize>,
    outputs: Vec<usize>,
    node_map: Vec<usize>,
    edge_map: Vec<Box<[(usize, usize)]>>,
    ffrs: Vec<SimFfr>,
    max_level: usize,
}

/// How a variable of a complex gate reaches its literals
#[derive(Clone, Copy, Debug)]
enum LitDriver {
    /// Single positive literal, connected directly to the original fanin
    Direct,
    /// Positive and negative literals driven by helper nodes
    Helpers { pos: usize, neg: usize },
}

impl SimGraph {
    /// Build the simulation graph of a network, and partition it in fanout-free regions
    pub fn build(net: &Network) -> SimGraph {
        let mut ret = SimGraph {
            nodes: Vec::new(),
            inputs: Vec::new(),
            logic: Vec::new(),
            outputs: Vec::new(),
            node_map: vec![usize::MAX; net.nb_nodes()],
            edge_map: vec![Box::default(); net.nb_nodes()],
            ffrs: Vec::new(),
            max_level: 0,
        };
        for i in 0..net.nb_nodes() {
            match net.node(i) {
                Node::Input(_) => {
                    let id = ret.add_node(SimGate::Input, &[]);
                    ret.inputs.push(id);
                    ret.node_map[i] = id;
                }
                Node::Logic(g, fanins) => {
                    let inputs = fanins
                        .iter()
                        .map(|f| {
                            assert!(*f < i, "Network is not topologically sorted");
                            ret.node_map[*f]
                        })
                        .collect::<Vec<_>>();
                    let (id, edges) = match g {
                        Gate::Cplx(e) => ret.add_complex_gate(e, &inputs),
                        _ => {
                            let id = ret.add_node(Self::primitive_gate(g), &inputs);
                            (id, (0..inputs.len()).map(|p| (id, p)).collect())
                        }
                    };
                    ret.node_map[i] = id;
                    ret.edge_map[i] = edges.into();
                }
            }
        }
        for o in 0..net.nb_outputs() {
            let id = ret.node_map[net.output(o)];
            ret.nodes[id].is_output = true;
            ret.outputs.push(id);
        }
        ret.partition();
        ret
    }

    fn primitive_gate(g: &Gate) -> SimGate {
        match g {
            Gate::Const(b) => SimGate::Const(*b),
            Gate::Buf => SimGate::Buf,
            Gate::Not => SimGate::Not,
            Gate::And => SimGate::And,
            Gate::Nand => SimGate::Nand,
            Gate::Or => SimGate::Or,
            Gate::Nor => SimGate::Nor,
            Gate::Xor => SimGate::Xor,
            Gate::Xnor => SimGate::Xnor,
            Gate::Cplx(_) => unreachable!("Complex gates are decomposed"),
        }
    }

    fn add_node(&mut self, gate: SimGate, fanins: &[usize]) -> usize {
        let id = self.nodes.len();
        self.nodes.push(SimNode::new(gate, fanins));
        if gate != SimGate::Input {
            self.logic.push(id);
        }
        id
    }

    /// Decompose a complex gate; return its output node and its edge map
    fn add_complex_gate(&mut self, e: &Expr, inputs: &[usize]) -> (usize, Vec<(usize, usize)>) {
        let mut edges = vec![(usize::MAX, 0); inputs.len()];

        // A single literal is a buffer or an inverter of its fanin
        if let Expr::Lit(v, inv) = e {
            let gate = if *inv { SimGate::Not } else { SimGate::Buf };
            let id = self.add_node(gate, &[inputs[*v]]);
            for (p, edge) in edges.iter_mut().enumerate() {
                *edge = if p == *v {
                    (id, 0)
                } else {
                    (self.add_node(SimGate::Buf, &[inputs[p]]), 0)
                };
            }
            return (id, edges);
        }

        let mut drivers = Vec::with_capacity(inputs.len());
        for (v, &input) in inputs.iter().enumerate() {
            let np = e.literal_count(v, false);
            let nn = e.literal_count(v, true);
            let driver = if np == 1 && nn == 0 {
                LitDriver::Direct
            } else if nn == 0 {
                // Several positive literals, or an unused variable
                let b = self.add_node(SimGate::Buf, &[input]);
                edges[v] = (b, 0);
                LitDriver::Helpers {
                    pos: b,
                    neg: usize::MAX,
                }
            } else if np == 0 {
                let n = self.add_node(SimGate::Not, &[input]);
                edges[v] = (n, 0);
                LitDriver::Helpers {
                    pos: usize::MAX,
                    neg: n,
                }
            } else {
                let b = self.add_node(SimGate::Buf, &[input]);
                let n = self.add_node(SimGate::Not, &[b]);
                edges[v] = (b, 0);
                LitDriver::Helpers { pos: b, neg: n }
            };
            drivers.push(driver);
        }
        let id = self.add_expr(e, inputs, &drivers, &mut edges);
        debug_assert!(edges.iter().all(|(n, _)| *n != usize::MAX));
        (id, edges)
    }

    /// Create the nodes of a non-literal expression; return its output node
    fn add_expr(
        &mut self,
        e: &Expr,
        inputs: &[usize],
        drivers: &[LitDriver],
        edges: &mut [(usize, usize)],
    ) -> usize {
        let gate = match e {
            Expr::Const(b) => return self.add_node(SimGate::Const(*b), &[]),
            Expr::Lit(_, _) => unreachable!("Literals are handled by their parent"),
            Expr::And(_) => SimGate::And,
            Expr::Or(_) => SimGate::Or,
            Expr::Xor(_) => SimGate::Xor,
        };
        let mut fanins = Vec::new();
        let mut direct = Vec::new();
        for (pos, c) in e.children().iter().enumerate() {
            let f = match c {
                Expr::Lit(v, inv) => match drivers[*v] {
                    LitDriver::Direct => {
                        direct.push((*v, pos));
                        inputs[*v]
                    }
                    LitDriver::Helpers { pos: p, neg: n } => {
                        if *inv {
                            n
                        } else {
                            p
                        }
                    }
                },
                _ => self.add_expr(c, inputs, drivers, edges),
            };
            fanins.push(f);
        }
        let id = self.add_node(gate, &fanins);
        for (v, pos) in direct {
            edges[v] = (id, pos);
        }
        id
    }

    /// Compute fanouts, levels and fanout-free regions
    fn partition(&mut self) {
        for i in 0..self.nodes.len() {
            for p in 0..self.nodes[i].fanins.len() {
                let f = self.nodes[i].fanins[p];
                self.nodes[f].fanouts.push(i);
                self.nodes[f].fanout_ipos.push(p);
            }
        }
        for i in 0..self.nodes.len() {
            let level = self.nodes[i]
                .fanins
                .iter()
                .map(|f| self.nodes[*f].level + 1)
                .max()
                .unwrap_or(0);
            self.nodes[i].level = level;
            self.max_level = self.max_level.max(level);
        }
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            let ffr = if node.is_output || node.fanouts.len() != 1 {
                self.ffrs.push(SimFfr {
                    root: i,
                    nodes: Vec::new(),
                });
                self.ffrs.len() - 1
            } else {
                self.nodes[node.fanouts[0]].ffr
            };
            self.nodes[i].ffr = ffr;
        }
        for i in 0..self.nodes.len() {
            let ffr = self.nodes[i].ffr;
            self.ffrs[ffr].nodes.push(i);
        }
    }

    /// Number of simulation nodes
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get the simulation node at index i
    pub fn node(&self, i: usize) -> &SimNode {
        &self.nodes[i]
    }

    /// Input nodes, by input index
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Logic nodes, in topological order
    pub fn logic(&self) -> &[usize] {
        &self.logic
    }

    /// Output nodes, by output index
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    /// Maximum level of a node
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Number of fanout-free regions
    pub fn nb_ffrs(&self) -> usize {
        self.ffrs.len()
    }

    /// Get the fanout-free region at index i
    pub fn ffr(&self, i: usize) -> &SimFfr {
        &self.ffrs[i]
    }

    /// All fanout-free regions
    pub fn ffrs(&self) -> &[SimFfr] {
        &self.ffrs
    }

    /// Root of the fanout-free region containing node i
    pub fn ffr_root(&self, i: usize) -> usize {
        self.ffrs[self.nodes[i].ffr].root
    }

    /// Simulation node computing the output of a network node
    pub fn find_simnode(&self, net_node: usize) -> usize {
        self.node_map[net_node]
    }

    /// Simulation node and input position realizing a fanin position of a network node
    pub fn find_simedge(&self, net_node: usize, pos: usize) -> (usize, usize) {
        self.edge_map[net_node][pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generators::{adder, testcases};

    /// Walk the single-fanout chain of every node and check the region invariant
    fn check_ffrs(g: &SimGraph) {
        for i in 0..g.nb_nodes() {
            let mut n = i;
            while !g.node(n).is_output() && g.node(n).fanouts().len() == 1 {
                assert_eq!(g.node(n).ffr(), g.node(i).ffr());
                n = g.node(n).fanouts()[0];
            }
            assert_eq!(g.ffr_root(i), n);
            assert!(g.ffr(g.node(i).ffr()).nodes().contains(&i));
        }
        let nb: usize = g.ffrs().iter().map(|f| f.nodes().len()).sum();
        assert_eq!(nb, g.nb_nodes());
    }

    #[test]
    fn test_c17() {
        let net = testcases::c17();
        let g = SimGraph::build(&net);
        assert_eq!(g.nb_nodes(), net.nb_nodes());
        assert_eq!(g.inputs().len(), 5);
        assert_eq!(g.outputs().len(), 2);
        assert_eq!(g.max_level(), 3);
        check_ffrs(&g);
        for i in 0..net.nb_nodes() {
            assert_eq!(g.find_simnode(i), i);
            for p in 0..net.fanins(i).len() {
                assert_eq!(g.find_simedge(i, p), (i, p));
            }
        }
        // Inputs 0 and 3 have a single fanout; input 2 has two
        assert_ne!(g.ffr_root(0), 0);
        assert_eq!(g.ffr_root(2), 2);
    }

    #[test]
    fn test_adder() {
        let g = SimGraph::build(&adder::ripple_carry(4));
        check_ffrs(&g);
    }

    #[test]
    fn test_complex() {
        let net = testcases::complex_gates();
        let g = SimGraph::build(&net);
        check_ffrs(&g);
        // Every fanin position resolves to an edge whose driver is the original fanin
        for &i in net.logic() {
            for (p, &f) in net.fanins(i).iter().enumerate() {
                let (n, ipos) = g.find_simedge(i, p);
                assert_eq!(g.node(n).fanins()[ipos], g.find_simnode(f));
            }
        }
        // Evaluation of the decomposed gates matches the expressions
        for mask in 0..16u64 {
            let vals: Vec<bool> = (0..4).map(|i| (mask >> i) & 1 != 0).collect();
            let words: Vec<u64> = vals.iter().map(|b| if *b { !0 } else { 0 }).collect();
            let expected = crate::sim::simulate_comb(&net, &vals);
            let mut v = vec![PackedVal::ALL0; g.nb_nodes()];
            for (i, &n) in g.inputs().iter().enumerate() {
                v[n] = PackedVal(words[i]);
            }
            for &n in g.logic() {
                v[n] = g.node(n).eval(|f| v[f]);
            }
            for (o, &n) in g.outputs().iter().enumerate() {
                assert_eq!(v[n].lane(0), expected[o]);
            }
        }
    }

    #[test]
    fn test_literal_gate() {
        let mut net = Network::new();
        let i = net.add_inputs(2);
        let x = net.add_gate(Gate::Cplx(Expr::nega(1)), &[i[0], i[1]]);
        net.add_output(x);
        let g = SimGraph::build(&net);
        let n = g.find_simnode(x);
        assert_eq!(g.node(n).gate(), SimGate::Not);
        assert_eq!(g.find_simedge(x, 1), (n, 0));
        // Unused variable goes to a dangling buffer
        let (b, _) = g.find_simedge(x, 0);
        assert_eq!(g.node(b).gate(), SimGate::Buf);
        assert!(g.node(b).fanouts().is_empty());
        check_ffrs(&g);
    }

    #[test]
    fn test_gobs() {
        let mut net = Network::new();
        let i = net.add_inputs(3);
        let a = net.add_gate(Gate::Nand, &i);
        let o = net.add_gate(Gate::Nor, &i);
        let x = net.add_gate(Gate::Xor, &i);
        net.add_output(a);
        net.add_output(o);
        net.add_output(x);
        let g = SimGraph::build(&net);
        let v = [PackedVal(0b1100), PackedVal(0b1010), PackedVal(0b0110)];
        let val = |n: usize| if n < 3 { v[n] } else { PackedVal::ALL0 };
        assert_eq!(g.node(a).gobs(0, val), PackedVal(0b0010));
        assert_eq!(g.node(o).gobs(0, val), !PackedVal(0b1110));
        assert_eq!(g.node(x).gobs(0, val), PackedVal::ALL1);

        use Val3::*;
        let v3 = [One, X, Zero];
        let val3 = |n: usize| if n < 3 { v3[n] } else { X };
        assert!(!g.node(a).gobs3(0, val3));
        assert!(!g.node(x).gobs3(0, val3));
        assert!(g.node(x).gobs3(1, val3));
        assert_eq!(g.node(a).eval3(val3), One);
        assert_eq!(g.node(o).eval3(val3), Zero);
        assert_eq!(g.node(x).eval3(val3), X);
    }
}
