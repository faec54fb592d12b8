//! Faults bound to a simulation graph, bucketed by fanout-free region

use fxhash::FxHashMap;

use crate::sim::graph::SimGraph;
use crate::sim::values::PackedVal;
use crate::sim::{Fault, FaultStatus};

/// A fault as seen by the simulators
#[derive(Clone, Copy, Debug)]
pub(crate) struct SimFault {
    /// Original fault
    pub fault: Fault,
    /// Node where the fault is located: the faulty node, or the gate for an input fault
    pub node: usize,
    /// Input position for an input fault
    pub ipos: Option<usize>,
    /// Node carrying the value that the fault overrides
    pub source: usize,
    /// Lanes where the fault effect reaches the root of its region, after the last run
    pub obs: PackedVal,
}

impl SimFault {
    /// Bind a fault to the simulation graph
    pub fn new(graph: &SimGraph, fault: Fault) -> SimFault {
        let (node, ipos, source) = match fault {
            Fault::OutputStuckAtFault { gate, .. } => {
                let n = graph.find_simnode(gate);
                (n, None, n)
            }
            Fault::InputStuckAtFault { gate, input, .. } => {
                let (n, p) = graph.find_simedge(gate, input);
                (n, Some(p), graph.node(n).fanins()[p])
            }
        };
        SimFault {
            fault,
            node,
            ipos,
            source,
            obs: PackedVal::ALL0,
        }
    }

    /// Region containing the fault
    pub fn ffr(&self, graph: &SimGraph) -> usize {
        graph.node(self.node).ffr()
    }
}

/// Faults of a simulator, with their status and the per-region buckets of remaining faults
#[derive(Clone, Debug, Default)]
pub(crate) struct FaultList {
    pub faults: Vec<SimFault>,
    pub status: Vec<FaultStatus>,
    pub index: FxHashMap<Fault, usize>,
    pub ffr_faults: Vec<Vec<usize>>,
}

impl FaultList {
    pub fn new(graph: &SimGraph) -> FaultList {
        FaultList {
            ffr_faults: vec![Vec::new(); graph.nb_ffrs()],
            ..Default::default()
        }
    }

    /// Replace the fault list; faults already known keep their status
    pub fn set_faults(&mut self, graph: &SimGraph, faults: &[Fault]) {
        let old_status: FxHashMap<Fault, FaultStatus> = self
            .faults
            .iter()
            .zip(self.status.iter())
            .map(|(f, s)| (f.fault, *s))
            .collect();
        self.faults.clear();
        self.status.clear();
        self.index.clear();
        for b in &mut self.ffr_faults {
            b.clear();
        }
        for &f in faults {
            if self.index.contains_key(&f) {
                continue;
            }
            let id = self.faults.len();
            let sf = SimFault::new(graph, f);
            let status = old_status.get(&f).copied().unwrap_or_default();
            if is_remaining(status) {
                self.ffr_faults[sf.ffr(graph)].push(id);
            }
            self.index.insert(f, id);
            self.faults.push(sf);
            self.status.push(status);
        }
    }

    /// Change the status of a fault; detected and untestable faults are not simulated anymore
    pub fn set_status(&mut self, graph: &SimGraph, fault: &Fault, status: FaultStatus) {
        let Some(&id) = self.index.get(fault) else {
            panic!("Fault {fault} is not in the fault list");
        };
        let bucket = &mut self.ffr_faults[self.faults[id].ffr(graph)];
        let was_remaining = is_remaining(self.status[id]);
        if was_remaining && !is_remaining(status) {
            bucket.retain(|f| *f != id);
        } else if !was_remaining && is_remaining(status) {
            bucket.push(id);
        }
        self.status[id] = status;
    }

    pub fn status(&self, fault: &Fault) -> Option<FaultStatus> {
        self.index.get(fault).map(|id| self.status[*id])
    }

    pub fn nb_faults(&self) -> usize {
        self.faults.len()
    }

    pub fn nb_remaining(&self) -> usize {
        self.ffr_faults.iter().map(|b| b.len()).sum()
    }

    /// Faults that still need simulation, in the order they were given
    pub fn remaining(&self) -> Vec<Fault> {
        self.faults
            .iter()
            .zip(self.status.iter())
            .filter(|(_, s)| is_remaining(**s))
            .map(|(f, _)| f.fault)
            .collect()
    }

    /// Remove the faults of a region that satisfy the predicate, and mark them detected
    pub fn sweep<F: FnMut(&SimFault) -> bool>(&mut self, ffr: usize, mut detected: F) -> Vec<usize> {
        let mut ret = Vec::new();
        let faults = &self.faults;
        self.ffr_faults[ffr].retain(|id| {
            if detected(&faults[*id]) {
                ret.push(*id);
                false
            } else {
                true
            }
        });
        for id in &ret {
            self.status[*id] = FaultStatus::Detected;
        }
        ret
    }
}

/// Returns whether a fault with this status still needs simulation
fn is_remaining(status: FaultStatus) -> bool {
    matches!(status, FaultStatus::Undetected | FaultStatus::Aborted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generators::testcases;

    /// Each remaining fault is in the bucket of its region, and only there
    fn check_buckets(graph: &SimGraph, list: &FaultList) {
        for (id, f) in list.faults.iter().enumerate() {
            let nb_found = list
                .ffr_faults
                .iter()
                .filter(|b| b.contains(&id))
                .count();
            if is_remaining(list.status[id]) {
                assert_eq!(nb_found, 1, "{}", f.fault);
                assert!(list.ffr_faults[graph.node(f.node).ffr()].contains(&id));
            } else {
                assert_eq!(nb_found, 0, "{}", f.fault);
            }
        }
    }

    #[test]
    fn test_buckets() {
        let net = testcases::complex_gates();
        let graph = SimGraph::build(&net);
        let faults = Fault::all(&net);
        let mut list = FaultList::new(&graph);
        list.set_faults(&graph, &faults);
        assert_eq!(list.nb_faults(), faults.len());
        assert_eq!(list.nb_remaining(), faults.len());
        check_buckets(&graph, &list);

        // Faults inside complex gates sit on helper nodes of the decomposition
        assert!(list
            .faults
            .iter()
            .any(|f| f.node != graph.find_simnode(f.fault.node())));
    }

    #[test]
    fn test_set_faults_twice() {
        let net = testcases::complex_gates();
        let graph = SimGraph::build(&net);
        let faults = Fault::all(&net);
        let mut list = FaultList::new(&graph);
        list.set_faults(&graph, &faults);
        list.set_status(&graph, &faults[1], FaultStatus::Detected);
        list.set_status(&graph, &faults[2], FaultStatus::Untestable);
        list.set_status(&graph, &faults[3], FaultStatus::Aborted);
        let buckets = list.ffr_faults.clone();
        let status = list.status.clone();

        list.set_faults(&graph, &faults);
        assert_eq!(list.ffr_faults, buckets);
        assert_eq!(list.status, status);
        assert_eq!(list.nb_remaining(), faults.len() - 2);
        check_buckets(&graph, &list);
    }

    #[test]
    fn test_set_status() {
        let net = testcases::complex_gates();
        let graph = SimGraph::build(&net);
        let faults = Fault::all(&net);
        let mut list = FaultList::new(&graph);
        list.set_faults(&graph, &faults);
        for (id, f) in faults.iter().enumerate() {
            let ffr = list.faults[id].ffr(&graph);
            list.set_status(&graph, f, FaultStatus::Untestable);
            assert!(!list.ffr_faults[ffr].contains(&id));
            list.set_status(&graph, f, FaultStatus::Aborted);
            assert!(list.ffr_faults[ffr].contains(&id));
            list.set_status(&graph, f, FaultStatus::Undetected);
            assert!(list.ffr_faults[ffr].contains(&id));
            list.set_status(&graph, f, FaultStatus::Detected);
            assert!(!list.ffr_faults[ffr].contains(&id));
            check_buckets(&graph, &list);
        }
        assert_eq!(list.nb_remaining(), 0);
        assert!(list.remaining().is_empty());
    }

    #[test]
    fn test_sweep() {
        let net = testcases::complex_gates();
        let graph = SimGraph::build(&net);
        let mut list = FaultList::new(&graph);
        list.set_faults(&graph, &Fault::all(&net));
        let ffr = list.faults[0].ffr(&graph);
        let before = list.ffr_faults[ffr].len();
        let swept = list.sweep(ffr, |f| f.fault.value());
        assert_eq!(list.ffr_faults[ffr].len() + swept.len(), before);
        for id in swept {
            assert!(list.faults[id].fault.value());
            assert_eq!(list.status[id], FaultStatus::Detected);
        }
        check_buckets(&graph, &list);
    }
}
