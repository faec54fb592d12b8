//! Bit-parallel fault simulation, using fanout-free regions
//!
//! The good values of 64 patterns are computed at once. Inside a fanout-free region, a fault
//! is propagated to the root of the region using the local observability of its node, without
//! any event-driven simulation. Only the root of the region is then flipped and propagated
//! through the rest of the network.

use crate::sim::event_queue::SimScratch;
use crate::sim::fault_list::{FaultList, SimFault};
use crate::sim::graph::SimGraph;
use crate::sim::values::{PackedVal, TestVector, Val3, NB_LANES};
use crate::sim::{Fault, FaultStatus};

/// Lanes where a change at the node would change the root of its region
pub(crate) fn calc_lobs(
    graph: &SimGraph,
    gval: &[PackedVal],
    scratch: &mut SimScratch,
    node: usize,
) -> PackedVal {
    if let Some(v) = scratch.lobs[node] {
        return v;
    }
    let ret = if graph.ffr_root(node) == node {
        PackedVal::ALL1
    } else {
        let n = graph.node(node);
        let fo = n.fanouts()[0];
        let ipos = n.fanout_ipos()[0];
        calc_lobs(graph, gval, scratch, fo) & graph.node(fo).gobs(ipos, |f| gval[f])
    };
    scratch.lobs[node] = Some(ret);
    scratch.lobs_list.push(node);
    ret
}

/// Lanes where the fault is activated and reaches the root of its region
pub(crate) fn fault_obs(
    graph: &SimGraph,
    gval: &[PackedVal],
    scratch: &mut SimScratch,
    f: &SimFault,
) -> PackedVal {
    let mut obs = calc_lobs(graph, gval, scratch, f.node);
    if let Some(p) = f.ipos {
        obs &= graph.node(f.node).gobs(p, |n| gval[n]);
    }
    let src = gval[f.source];
    // The good value must be the opposite of the stuck value
    if f.fault.value() {
        obs & !src
    } else {
        obs & src
    }
}

/// Flip the given nodes and propagate the change; return the lanes observed at an output
///
/// Faulty values are restored to the good values before returning.
pub(crate) fn propagate(
    graph: &SimGraph,
    gval: &[PackedVal],
    fval: &mut [PackedVal],
    scratch: &mut SimScratch,
    flips: &[(usize, PackedVal)],
    mask: PackedVal,
) -> PackedVal {
    for &(root, flip) in flips {
        scratch.flip[root] = flip & mask;
        scratch.queue.put(root, graph.node(root).level());
    }
    let mut obs = PackedVal::ALL0;
    while let Some(n) = scratch.queue.get() {
        let node = graph.node(n);
        let calc = if node.is_input() {
            gval[n]
        } else {
            node.eval(|f| fval[f])
        };
        let diff = (gval[n] ^ calc ^ scratch.flip[n]) & mask;
        let val = gval[n] ^ diff;
        if val == fval[n] {
            continue;
        }
        fval[n] = val;
        scratch.clear_list.push(n);
        if node.is_output() {
            // Lanes observed here need no further propagation
            obs |= diff;
        } else {
            for &fo in node.fanouts() {
                scratch.queue.put(fo, graph.node(fo).level());
            }
        }
    }
    for n in scratch.clear_list.drain(..) {
        fval[n] = gval[n];
    }
    for &(root, _) in flips {
        scratch.flip[root] = PackedVal::ALL0;
    }
    obs
}

/// Bit-parallel fault simulator
///
/// ```
/// # use satpg::network::generators::testcases;
/// # use satpg::sim::{Fault, Fsim, SimGraph, TestVector};
/// let net = testcases::c17();
/// let graph = SimGraph::build(&net);
/// let mut fsim = Fsim::new(&graph);
/// fsim.set_faults(&Fault::all(&net));
/// let detected = fsim.run(&TestVector::from_bools(&[true, false, true, true, false]));
/// assert!(!detected.is_empty());
/// assert_eq!(fsim.nb_remaining(), fsim.nb_faults() - detected.len());
/// ```
#[derive(Clone, Debug)]
pub struct Fsim<'a> {
    graph: &'a SimGraph,
    gval: Vec<PackedVal>,
    fval: Vec<PackedVal>,
    scratch: SimScratch,
    faults: FaultList,
}

impl<'a> Fsim<'a> {
    /// Create a simulator for the graph, with an empty fault list
    pub fn new(graph: &'a SimGraph) -> Fsim<'a> {
        Fsim {
            graph,
            gval: vec![PackedVal::ALL0; graph.nb_nodes()],
            fval: vec![PackedVal::ALL0; graph.nb_nodes()],
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

    fn check_vector(&self, tv: &TestVector) {
        assert_eq!(
            tv.len(),
            self.graph.inputs().len(),
            "Test vector size does not match the number of inputs"
        );
    }

    /// Good simulation, with unknown inputs at 0
    fn calc_gval<F: Fn(usize) -> PackedVal>(&mut self, input_val: F) {
        for (i, &n) in self.graph.inputs().iter().enumerate() {
            self.gval[n] = input_val(i);
        }
        for &n in self.graph.logic() {
            let v = self.graph.node(n).eval(|f| self.gval[f]);
            self.gval[n] = v;
        }
        self.fval.copy_from_slice(&self.gval);
        self.scratch.clear_lobs();
    }

    /// Compute the observability of the remaining faults of a region at its root
    fn ffr_simulate(&mut self, ffr: usize, mask: PackedVal) -> PackedVal {
        let mut req = PackedVal::ALL0;
        let FaultList {
            faults, ffr_faults, ..
        } = &mut self.faults;
        for &id in &ffr_faults[ffr] {
            let obs = fault_obs(self.graph, &self.gval, &mut self.scratch, &faults[id]) & mask;
            faults[id].obs = obs;
            req |= obs;
        }
        req
    }

    /// Simulate one vector; return the newly detected faults
    ///
    /// Each lane is used to propagate the root of a different region.
    pub fn run(&mut self, tv: &TestVector) -> Vec<Fault> {
        self.check_vector(tv);
        self.calc_gval(|i| PackedVal::from_bool(tv.val3(i) == Val3::One));
        let mut ret = Vec::new();
        let mut pending = Vec::with_capacity(NB_LANES);
        for ffr in 0..self.graph.nb_ffrs() {
            if self.faults.ffr_faults[ffr].is_empty() {
                continue;
            }
            if self.ffr_simulate(ffr, PackedVal::ALL1).is_zero() {
                continue;
            }
            pending.push(ffr);
            if pending.len() == NB_LANES {
                self.sweep_ffrs(&pending, &mut ret);
                pending.clear();
            }
        }
        if !pending.is_empty() {
            self.sweep_ffrs(&pending, &mut ret);
        }
        ret
    }

    /// Propagate the roots of up to 64 regions, one per lane, and collect the detected faults
    fn sweep_ffrs(&mut self, ffrs: &[usize], detected: &mut Vec<Fault>) {
        let flips = ffrs
            .iter()
            .enumerate()
            .map(|(lane, ffr)| (self.graph.ffr(*ffr).root(), PackedVal::bit(lane)))
            .collect::<Vec<_>>();
        let obs = propagate(
            self.graph,
            &self.gval,
            &mut self.fval,
            &mut self.scratch,
            &flips,
            PackedVal::ALL1,
        );
        for (lane, &ffr) in ffrs.iter().enumerate() {
            if !obs.lane(lane) {
                continue;
            }
            for id in self.faults.sweep(ffr, |f| !f.obs.is_zero()) {
                detected.push(self.faults.faults[id].fault);
            }
        }
    }

    /// Simulate up to 64 vectors at once; return the newly detected faults for each vector
    ///
    /// A fault detected by several vectors is reported for the first one only.
    pub fn run_batch(&mut self, tvs: &[TestVector]) -> Vec<Vec<Fault>> {
        assert!(tvs.len() <= NB_LANES, "At most {NB_LANES} vectors per batch");
        let mut ret = vec![Vec::new(); tvs.len()];
        if tvs.is_empty() {
            return ret;
        }
        for tv in tvs {
            self.check_vector(tv);
        }
        // Unused lanes replicate the first vector, and are masked out
        self.calc_gval(|i| {
            let mut v = 0u64;
            for lane in 0..NB_LANES {
                let tv = tvs.get(lane).unwrap_or(&tvs[0]);
                if tv.val3(i) == Val3::One {
                    v |= 1 << lane;
                }
            }
            PackedVal(v)
        });
        let mask = PackedVal::mask(tvs.len());
        for ffr in 0..self.graph.nb_ffrs() {
            if self.faults.ffr_faults[ffr].is_empty() {
                continue;
            }
            let req = self.ffr_simulate(ffr, mask);
            if req.is_zero() {
                continue;
            }
            let root = self.graph.ffr(ffr).root();
            let obs = propagate(
                self.graph,
                &self.gval,
                &mut self.fval,
                &mut self.scratch,
                &[(root, req)],
                mask,
            );
            if obs.is_zero() {
                continue;
            }
            for id in self.faults.sweep(ffr, |f| !(f.obs & obs).is_zero()) {
                let f = &self.faults.faults[id];
                if let Some(lane) = (f.obs & obs).lowest_lane() {
                    ret[lane].push(f.fault);
                }
            }
        }
        ret
    }

    /// Returns whether the vector detects the fault, regardless of the fault list
    pub fn run_fault(&mut self, tv: &TestVector, fault: &Fault) -> bool {
        self.check_vector(tv);
        self.calc_gval(|i| PackedVal::from_bool(tv.val3(i) == Val3::One));
        let f = SimFault::new(self.graph, *fault);
        let obs = fault_obs(self.graph, &self.gval, &mut self.scratch, &f);
        if obs.is_zero() {
            return false;
        }
        let root = self.graph.ffr_root(f.node);
        let obs = propagate(
            self.graph,
            &self.gval,
            &mut self.fval,
            &mut self.scratch,
            &[(root, obs)],
            PackedVal::ALL1,
        );
        !obs.is_zero()
    }
}
