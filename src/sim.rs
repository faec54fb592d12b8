//! Simulation of a logic network, and fault simulation
//!
//! [`SimpleSimulator`] evaluates the network gate by gate and serves as a reference.
//! [`Fsim`] and [`Fsim3`] are the fast fault simulators, working on a [`SimGraph`]
//! built once from the network.

mod event_queue;
mod fault;
mod fault_list;
mod fsim;
mod fsim3;
mod graph;
mod simple_sim;
mod values;

use crate::Network;

pub use event_queue::{EventQueue, SimScratch};
pub use fault::{Fault, FaultStatus};
pub use fsim::Fsim;
pub use fsim3::Fsim3;
pub use graph::{SimFfr, SimGate, SimGraph, SimNode};
pub use simple_sim::SimpleSimulator;
pub use values::{PackedVal, TestVector, Val3, NB_LANES};

/// Simple conversion to 64b format
fn bool_to_multi(values: &[bool]) -> Vec<u64> {
    values.iter().map(|b| if *b { !0 } else { 0 }).collect()
}

/// Simple conversion from 64b format
fn multi_to_bool(values: &[u64]) -> Vec<bool> {
    values.iter().map(|b| *b != 0).collect()
}

/// Simulate a combinatorial network; return the output values
pub fn simulate_comb(a: &Network, input_values: &[bool]) -> Vec<bool> {
    simulate_comb_with_faults(a, input_values, &[])
}

/// Simulate a combinatorial network, with faults injected; return the output values
pub fn simulate_comb_with_faults(a: &Network, input_values: &[bool], faults: &[Fault]) -> Vec<bool> {
    let mut sim = SimpleSimulator::from_network(a);
    multi_to_bool(&sim.run_with_faults(&bool_to_multi(input_values), faults))
}

/// Returns whether the pattern detects the fault, using the reference gate-by-gate simulation
pub fn detects_fault(a: &Network, input_values: &[bool], fault: &Fault) -> bool {
    simulate_comb(a, input_values) != simulate_comb_with_faults(a, input_values, &[*fault])
}
