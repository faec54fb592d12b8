//! Representation and handling of gate-level networks

mod gates;
pub mod generators;
mod network;
pub mod stats;

pub use gates::{Expr, Gate};
pub use network::{Network, Node};
