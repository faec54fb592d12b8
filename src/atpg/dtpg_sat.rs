//! Test generation for a single fault with a SAT solver
//!
//! The problem is restricted to the transitive fanout of the fault and the transitive fanin
//! of that fanout. Each node of the fanout has a good value, a faulty value and a
//! difference variable; at least one output must differ.

use std::marker::PhantomData;

use fxhash::FxHashMap;
use log::{debug, warn};
use rustsat::types::Lit;

use crate::atpg::cnf::{make_gate_cnf, make_xor2};
use crate::error::SolverError;
use crate::sat::{KissatSolver, SatResult, SatSolver, SatStats};
use crate::sim::{Fault, TestVector, Val3};
use crate::{Network, Node};

/// Outcome of test generation for a fault
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DtpgStatus {
    /// A test vector was found
    Detected,
    /// The fault cannot be detected
    Untestable,
    /// The solver gave up
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    None,
    Tfo,
    Tfi,
}

/// Variables of the problem for one fault
#[derive(Default)]
struct Encoding {
    gvar: FxHashMap<usize, Lit>,
    fvar: FxHashMap<usize, Lit>,
    dvar: FxHashMap<usize, Lit>,
}

impl Encoding {
    fn gval(&self, n: usize) -> Lit {
        self.gvar[&n]
    }

    /// Faulty value if the node is in the fanout, good value otherwise
    fn fval(&self, n: usize) -> Lit {
        self.fvar.get(&n).copied().unwrap_or_else(|| self.gval(n))
    }
}

/// SAT-based test generator
///
/// A new solver is created for each fault. Inputs outside of the cone of the fault are
/// left unknown in the test vector.
pub struct DtpgSat<S = KissatSolver> {
    stats: SatStats,
    solver: PhantomData<S>,
}

impl<S: SatSolver + Default> Default for DtpgSat<S> {
    fn default() -> Self {
        DtpgSat {
            stats: SatStats::default(),
            solver: PhantomData,
        }
    }
}

impl<S: SatSolver + Default> DtpgSat<S> {
    /// Create a test generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the solver for the last fault
    pub fn stats(&self) -> SatStats {
        self.stats
    }

    /// Generate a test vector for the fault
    ///
    /// On detection, the vector contains the values of the inputs in the cone of the fault;
    /// the other inputs are unknown.
    pub fn run(&mut self, net: &Network, fault: &Fault, tv: &mut TestVector) -> DtpgStatus {
        assert_eq!(tv.len(), net.nb_inputs());
        match self.solve(net, fault, tv) {
            Ok(status) => status,
            Err(e) => {
                warn!("Aborted test generation for {fault}: {e}");
                DtpgStatus::Aborted
            }
        }
    }

    fn solve(
        &mut self,
        net: &Network,
        fault: &Fault,
        tv: &mut TestVector,
    ) -> Result<DtpgStatus, SolverError> {
        let mut solver = S::default();
        self.stats = SatStats::default();
        let fnode = fault.node();
        let fsrc = fault.source_node(net);

        // Transitive fanout, then transitive fanin of the fanout
        let mut mark = vec![Mark::None; net.nb_nodes()];
        let mut tfo = vec![fnode];
        mark[fnode] = Mark::Tfo;
        let mut i = 0;
        while i < tfo.len() {
            for &fo in net.fanouts(tfo[i]) {
                if mark[fo] == Mark::None {
                    mark[fo] = Mark::Tfo;
                    tfo.push(fo);
                }
            }
            i += 1;
        }
        let mut cone = tfo.clone();
        let mut i = 0;
        while i < cone.len() {
            for &fi in net.fanins(cone[i]) {
                if mark[fi] == Mark::None {
                    mark[fi] = Mark::Tfi;
                    cone.push(fi);
                }
            }
            i += 1;
        }

        // Variables
        let mut enc = Encoding::default();
        for &n in &cone {
            enc.gvar.insert(n, solver.new_var().pos_lit());
        }
        for &n in &tfo {
            enc.fvar.insert(n, solver.new_var().pos_lit());
            enc.dvar.insert(n, solver.new_var().pos_lit());
        }
        // Faulty value on the input line, for an input fault
        let src_fval = match fault {
            Fault::OutputStuckAtFault { .. } => enc.fval(fnode),
            Fault::InputStuckAtFault { .. } => solver.new_var().pos_lit(),
        };

        // Good circuit
        let mut inputs = Vec::new();
        for &n in &cone {
            if let Node::Logic(g, fanins) = net.node(n) {
                inputs.clear();
                inputs.extend(fanins.iter().map(|f| enc.gval(*f)));
                make_gate_cnf(&mut solver, g, enc.gval(n), &inputs)?;
            }
        }

        // Fault site: the faulty output value is free for an output fault, and given by
        // the faulty input line for an input fault
        if let Fault::InputStuckAtFault { input, .. } = fault {
            if let Node::Logic(g, fanins) = net.node(fnode) {
                inputs.clear();
                inputs.extend(fanins.iter().map(|f| enc.gval(*f)));
                inputs[*input] = src_fval;
                make_gate_cnf(&mut solver, g, enc.fval(fnode), &inputs)?;
            }
        }
        make_xor2(&mut solver, enc.dvar[&fnode], enc.gval(fnode), enc.fval(fnode))?;

        // Propagation through the fanout
        let mut deps = Vec::new();
        for &n in &tfo[1..] {
            let Node::Logic(g, fanins) = net.node(n) else {
                unreachable!("Inputs have no fanin");
            };
            inputs.clear();
            inputs.extend(fanins.iter().map(|f| enc.fval(*f)));
            let d = enc.dvar[&n];
            let f = enc.fval(n);
            make_gate_cnf(&mut solver, g, f, &inputs)?;
            make_xor2(&mut solver, d, enc.gval(n), f)?;

            // A difference requires a difference on a fanin
            deps.clear();
            deps.extend(fanins.iter().filter_map(|f| enc.dvar.get(f).copied()));
            deps.sort();
            deps.dedup();
            deps.push(!d);
            solver.add_clause(&deps)?;
        }

        // At least one output differs
        let odiff: Vec<Lit> = tfo
            .iter()
            .filter(|n| net.is_output(**n))
            .map(|n| enc.dvar[n])
            .collect();
        if odiff.is_empty() {
            debug!("{fault}: no path to an output");
            self.stats = solver.stats();
            return Ok(DtpgStatus::Untestable);
        }
        solver.add_clause(&odiff)?;

        // Activation
        let g = enc.gval(fsrc);
        let assumptions = if fault.value() {
            [!g, src_fval]
        } else {
            [g, !src_fval]
        };
        let res = solver.solve(&assumptions)?;
        self.stats = solver.stats();
        debug!(
            "{fault}: {:?} with {} variables and {} clauses",
            res, self.stats.nb_vars, self.stats.nb_clauses
        );
        Ok(match res {
            SatResult::Sat => {
                tv.init();
                for &n in &cone {
                    if let Node::Input(idx) = net.node(n) {
                        let b = solver.model_value(enc.gval(n)).unwrap_or(false);
                        tv.set_val(*idx, Val3::from(b));
                    }
                }
                DtpgStatus::Detected
            }
            SatResult::Unsat => DtpgStatus::Untestable,
            SatResult::Unknown => {
                warn!("Solver gave up on {fault}");
                DtpgStatus::Aborted
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generators::testcases;
    use crate::sat::testing::{BrokenSolver, GiveUpSolver};
    use crate::sim::detects_fault;
    use crate::Gate;

    #[test]
    fn test_and_gate() {
        let (net, f) = and_input_fault();
        let mut dtpg = DtpgSat::<KissatSolver>::new();
        let mut tv = TestVector::new(2);
        assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Detected);
        assert_eq!(tv, TestVector::from_bools(&[true, true]));
        assert!(dtpg.stats().nb_clauses > 0);
        assert_eq!(dtpg.stats().nb_solves, 1);
    }

    fn and_input_fault() -> (Network, Fault) {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let x = net.add_gate(Gate::And, &[a, b]);
        net.add_output(x);
        let f = Fault::InputStuckAtFault {
            gate: x,
            input: 0,
            value: false,
        };
        (net, f)
    }

    #[test]
    fn test_solver_gives_up() {
        let (net, f) = and_input_fault();
        let mut dtpg = DtpgSat::<GiveUpSolver>::new();
        let mut tv = TestVector::new(2);
        assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Aborted);
        assert_eq!(tv, TestVector::new(2));
        assert_eq!(dtpg.stats().nb_solves, 1);
    }

    #[test]
    fn test_solver_error() {
        let (net, f) = and_input_fault();
        let mut dtpg = DtpgSat::<BrokenSolver>::new();
        let mut tv = TestVector::new(2);
        assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Aborted);
        assert_eq!(tv, TestVector::new(2));
        assert_eq!(tv.nb_x(), 2);
    }

    #[test]
    fn test_no_fanout() {
        let mut net = Network::new();
        let a = net.add_input();
        let b = net.add_input();
        let x = net.add_gate(Gate::And, &[a, b]);
        let y = net.add_gate(Gate::Or, &[a, b]);
        net.add_output(y);
        let mut dtpg = DtpgSat::<KissatSolver>::new();
        let mut tv = TestVector::new(2);
        for value in [false, true] {
            let f = Fault::OutputStuckAtFault { gate: x, value };
            assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Untestable);
            assert_eq!(dtpg.stats().nb_solves, 0);
            let f = Fault::InputStuckAtFault {
                gate: x,
                input: 1,
                value,
            };
            assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Untestable);
        }
    }

    #[test]
    fn test_redundant() {
        let net = testcases::redundant();
        let mut dtpg = DtpgSat::<KissatSolver>::new();
        let mut tv = TestVector::new(2);
        for value in [false, true] {
            let f = Fault::OutputStuckAtFault { gate: 1, value };
            assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Untestable);
            let f = Fault::OutputStuckAtFault { gate: 0, value };
            assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Detected);
        }
    }

    /// Check every fault of a network against exhaustive simulation
    fn check_all_faults(net: &Network) {
        let mut dtpg = DtpgSat::<KissatSolver>::new();
        let nb = net.nb_inputs();
        for f in Fault::all(net) {
            let mut tv = TestVector::new(nb);
            match dtpg.run(net, &f, &mut tv) {
                DtpgStatus::Detected => {
                    assert!(detects_fault(net, &tv.to_bools(), &f), "Bad vector {tv} for {f}");
                }
                DtpgStatus::Untestable => {
                    for mask in 0..(1usize << nb) {
                        let vals: Vec<bool> = (0..nb).map(|i| (mask >> i) & 1 != 0).collect();
                        assert!(!detects_fault(net, &vals, &f), "{f} is testable");
                    }
                }
                DtpgStatus::Aborted => panic!("Unexpected abort for {f}"),
            }
        }
    }

    #[test]
    fn test_c17() {
        check_all_faults(&testcases::c17());
    }

    #[test]
    fn test_complex_gates() {
        check_all_faults(&testcases::complex_gates());
    }

    #[test]
    fn test_random() {
        for seed in 0..4 {
            check_all_faults(&testcases::random(seed, 6, 25, 3));
        }
    }
}
