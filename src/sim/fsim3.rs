//! Single-pattern fault simulation with ternary values
//!
//! Unknown input values are kept as X. A fault is only reported when the good and faulty
//! values of an output are both known and differ, so that the detection holds whatever
//! the value of the unknown inputs.

use crate::sim::event_queue::SimScratch;
use crate::sim::fault_list::{FaultList, SimFault};
use crate::sim::graph::SimGraph;
use crate::sim::values::{PackedVal, TestVector, Val3};
use crate::sim::{Fault, FaultStatus};

/// Single-pattern ternary fault simulator
#[derive(Clone, Debug)]
pub struct Fsim3<'a> {
    graph: &'a SimGraph,
    gval: Vec<Val3>,
    fval: Vec<Val3>,
    scratch: SimScratch,
    faults: FaultList,
}

impl<'a> Fsim3<'a> {
    /// Create a simulator for the graph, with an empty fault list
    pub fn new(graph: &'a SimGraph) -> Fsim3<'a> {
        Fsim3 {
            graph,
            gval: vec![Val3::X; graph.nb_nodes()],
            fval: vec![Val3::X; graph.nb_nodes()],
            scratch: SimScratch::new(graph.max_level(), graph.nb_nodes()),
            faults: FaultList::new(graph),
        }
    }

    /// Set the faults to simulate; faults already known keep their status
    pub fn set_faults(&mut self, faults: &[Fault]) {
        self.faults.set_faults(self.graph, faults);
    }

    /// Set the status of a fault; detected and untestable faults are skipped by the simulation
    pub fn set_status(&mut self, fault: &Fault, status: FaultStatus) {
        self.faults.set_status(self.graph, fault, status);
    }

    /// Status of a fault, if it is in the fault list
    pub fn status(&self, fault: &Fault) -> Option<FaultStatus> {
        self.faults.status(fault)
    }

    /// Number of faults in the fault list
    pub fn nb_faults(&self) -> usize {
        self.faults.nb_faults()
    }

    /// Number of faults that are neither detected nor untestable
    pub fn nb_remaining(&self) -> usize {
        self.faults.nb_remaining()
    }

    /// Faults that are neither detected nor untestable
    pub fn remaining_faults(&self) -> Vec<Fault> {
        self.faults.remaining()
    }

    fn calc_gval(&mut self, tv: &TestVector) {
        assert_eq!(tv.len(), self.graph.inputs().len());
        for (i, &n) in self.graph.inputs().iter().enumerate() {
            self.gval[n] = tv.val3(i);
        }
        for &n in self.graph.logic() {
            let v = self.graph.node(n).eval3(|f| self.gval[f]);
            self.gval[n] = v;
        }
        self.fval.copy_from_slice(&self.gval);
    }

    /// Whether a change at the node is guaranteed to reach the root of its region
    fn calc_lobs(&self, node: usize) -> bool {
        let mut n = node;
        let root = self.graph.ffr_root(node);
        while n != root {
            let sn = self.graph.node(n);
            let fo = sn.fanouts()[0];
            if !self.graph.node(fo).gobs3(sn.fanout_ipos()[0], |f| self.gval[f]) {
                return false;
            }
            n = fo;
        }
        true
    }

    /// Whether the fault is activated and reaches the root of its region
    fn fault_obs(&self, f: &SimFault) -> bool {
        if self.gval[f.source] != Val3::from(!f.fault.value()) {
            return false;
        }
        if let Some(p) = f.ipos {
            if !self.graph.node(f.node).gobs3(p, |n| self.gval[n]) {
                return false;
            }
        }
        self.calc_lobs(f.node)
    }

    /// Flip the root of a region and propagate; return whether an output is observed
    fn propagate(&mut self, root: usize) -> bool {
        let graph = self.graph;
        let scratch = &mut self.scratch;
        self.fval[root] = !self.gval[root];
        scratch.clear_list.push(root);
        let mut observed = graph.node(root).is_output();
        if !observed {
            for &fo in graph.node(root).fanouts() {
                scratch.queue.put(fo, graph.node(fo).level());
            }
        }
        while !observed {
            let Some(n) = scratch.queue.get() else {
                break;
            };
            let node = graph.node(n);
            let val = node.eval3(|f| self.fval[f]);
            if val == self.fval[n] {
                continue;
            }
            self.fval[n] = val;
            scratch.clear_list.push(n);
            if node.is_output() && val.is_known() && self.gval[n].is_known() {
                // Known values that differ from the good ones
                observed = true;
            }
            for &fo in node.fanouts() {
                scratch.queue.put(fo, graph.node(fo).level());
            }
        }
        scratch.queue.clear();
        for n in scratch.clear_list.drain(..) {
            self.fval[n] = self.gval[n];
        }
        observed
    }

    /// Simulate one vector; return the newly detected faults
    pub fn run(&mut self, tv: &TestVector) -> Vec<Fault> {
        self.calc_gval(tv);
        let mut ret = Vec::new();
        for ffr in 0..self.graph.nb_ffrs() {
            if self.faults.ffr_faults[ffr].is_empty() {
                continue;
            }
            let root = self.graph.ffr(ffr).root();
            if !self.gval[root].is_known() {
                continue;
            }
            let mut any = false;
            for i in 0..self.faults.ffr_faults[ffr].len() {
                let id = self.faults.ffr_faults[ffr][i];
                let obs = self.fault_obs(&self.faults.faults[id]);
                self.faults.faults[id].obs = PackedVal::from_bool(obs);
                any |= obs;
            }
            if !any || !self.propagate(root) {
                continue;
            }
            for id in self.faults.sweep(ffr, |f| !f.obs.is_zero()) {
                ret.push(self.faults.faults[id].fault);
            }
        }
        ret
    }

    /// Simulate several vectors one after the other; return the newly detected faults for each
    pub fn run_batch(&mut self, tvs: &[TestVector]) -> Vec<Vec<Fault>> {
        tvs.iter().map(|tv| self.run(tv)).collect()
    }

    /// Returns whether the vector detects the fault, regardless of the fault list
    pub fn run_fault(&mut self, tv: &TestVector, fault: &Fault) -> bool {
        self.calc_gval(tv);
        let f = SimFault::new(self.graph, *fault);
        let root = self.graph.ffr_root(f.node);
        self.gval[root].is_known() && self.fault_obs(&f) && self.propagate(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generators::testcases;
    use crate::sim::{detects_fault, Fsim};
    use crate::{Gate, Network};

    #[test]
    fn test_unknown_inputs() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let x = net.add_gate(Gate::And, &[a, b]);
        net.add_output(x);
        let graph = SimGraph::build(&net);
        let mut fsim = Fsim3::new(&graph);
        let f = Fault::InputStuckAtFault {
            gate: x,
            input: 0,
            value: false,
        };
        assert!(fsim.run_fault(&"11".parse().unwrap(), &f));
        assert!(!fsim.run_fault(&"1X".parse().unwrap(), &f));
        assert!(!fsim.run_fault(&"X1".parse().unwrap(), &f));
        // The output is 0 whatever the value of b
        let g = Fault::OutputStuckAtFault {
            gate: x,
            value: true,
        };
        assert!(fsim.run_fault(&"0X".parse().unwrap(), &g));
    }

    #[test]
    fn test_matches_fsim_on_known_values() {
        let net = testcases::complex_gates();
        let graph = SimGraph::build(&net);
        let mut fsim3 = Fsim3::new(&graph);
        let mut fsim = Fsim::new(&graph);
        let faults = Fault::all(&net);
        for mask in 0..16usize {
            let vals: Vec<bool> = (0..4).map(|i| (mask >> i) & 1 != 0).collect();
            let tv = TestVector::from_bools(&vals);
            for f in &faults {
                let d = detects_fault(&net, &vals, f);
                assert_eq!(fsim3.run_fault(&tv, f), d, "Mismatch for {f} with {tv}");
                assert_eq!(fsim.run_fault(&tv, f), d, "Mismatch for {f} with {tv}");
            }
        }
    }

    #[test]
    fn test_run() {
        let net = testcases::c17();
        let graph = SimGraph::build(&net);
        let mut fsim3 = Fsim3::new(&graph);
        let mut fsim = Fsim::new(&graph);
        let faults = Fault::all(&net);
        fsim3.set_faults(&faults);
        fsim.set_faults(&faults);
        let tvs: Vec<TestVector> = ["10110", "01011", "11111", "00000"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let res3 = fsim3.run_batch(&tvs);
        let res = fsim.run_batch(&tvs);
        for (mut a, mut b) in res3.into_iter().zip(res) {
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
        assert_eq!(fsim3.nb_remaining(), fsim.nb_remaining());
    }
}
