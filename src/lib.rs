//! Test pattern generation and fault simulation for combinational circuits
//!
//! This crate generates test patterns for single
//! [stuck-at faults](https://en.wikipedia.org/wiki/Stuck-at_fault) in gate-level networks,
//! and grades existing pattern sets with a fault simulator.
//!
//! # Usage
//!
//! ```bash
//! # Show available commands
//! # At the moment, only .bench files are supported
//! satpg help
//! # Show statistics about the network
//! satpg show mydesign.bench
//! # Generate test patterns
//! satpg atpg mydesign.bench -o atpg.test
//! # Measure the fault coverage of a pattern file
//! satpg fsim mydesign.bench -i atpg.test
//! ```
//!
//! # Algorithms
//!
//! Test generation follows the usual flow: random patterns are fault simulated first,
//! and the faults they miss are handed to a SAT-based test generator, [`atpg::DtpgSat`].
//! For each fault, it encodes the good circuit, the faulty copy of the transitive fanout
//! of the fault, and the condition that at least one output differs.
//!
//! Fault simulation is done on a separate structure, [`sim::SimGraph`], where complex gates
//! are decomposed into primitive gates and the circuit is split into fanout-free regions.
//! Inside a region, faults are handled with local observability only; each region root
//! that may propagate a difference is then simulated in a separate lane of a 64-bit word.
//! [`sim::Fsim`] works on 64 fully specified patterns at once, while [`sim::Fsim3`] handles
//! a single pattern with unknown values.
//!
//! ## Datastructures
//!
//! `Network` holds the gate-level circuit. Nodes are kept in topological order, so that a
//! given gate has an index higher than its inputs. Gates may be primitive, with any number
//! of inputs, or complex gates described by an expression over their inputs.
//!
//! For example, here is a full adder circuit:
//! ```
//! # use satpg::{Gate, Network};
//! let mut net = Network::new();
//! let i0 = net.add_input();
//! let i1 = net.add_input();
//! let i2 = net.add_input();
//! let out = net.add_gate(Gate::Xor, &[i0, i1, i2]);
//! let a = net.add_gate(Gate::And, &[i0, i1]);
//! let b = net.add_gate(Gate::And, &[i0, i2]);
//! let c = net.add_gate(Gate::And, &[i1, i2]);
//! let carry = net.add_gate(Gate::Or, &[a, b, c]);
//! net.add_output(out);
//! net.add_output(carry);
//! ```

#![warn(missing_docs)]

pub mod atpg;
pub mod cmd;
mod error;
pub mod io;
pub mod network;
pub mod sat;
pub mod sim;

pub use error::{Error, Result, SolverError};
pub use network::{stats, Expr, Gate, Network, Node};
pub use sim::{Fault, FaultStatus, TestVector};
