//! Compute network statistics
//!
//! ```
//! # use satpg::Network;
//! # let net = Network::new();
//! use satpg::network::stats::stats;
//! let stats = stats(&net);
//!
//! // Check that there is no Xor gate
//! assert_eq!(stats.nb("XOR"), 0);
//!
//! // Show the statistics
//! println!("{}", stats);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::sim::Fault;
use crate::{Gate, Network};

/// Count of the gates of a given type
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateCount {
    /// Number of gates
    pub nb: usize,
    /// Number of gates by number of inputs
    pub arity: Vec<usize>,
}

impl GateCount {
    fn add(&mut self, sz: usize) {
        self.nb += 1;
        if self.arity.len() <= sz {
            self.arity.resize(sz + 1, 0);
        }
        self.arity[sz] += 1;
    }
}

/// Number of inputs, outputs, gates and faults in a network
#[derive(Clone, Debug, Default)]
pub struct NetworkStats {
    /// Number of inputs
    pub nb_inputs: usize,
    /// Number of outputs
    pub nb_outputs: usize,
    /// Gates by type name
    pub gates: BTreeMap<&'static str, GateCount>,
    /// Longest path from an input to an output, in gates
    pub depth: usize,
    /// Number of stuck-at faults
    pub nb_faults: usize,
    /// Number of stuck-at faults after equivalence collapsing
    pub nb_collapsed_faults: usize,
}

impl NetworkStats {
    /// Number of gates of a type, given by its name in .bench files
    pub fn nb(&self, type_name: &str) -> usize {
        self.gates.get(type_name).map_or(0, |c| c.nb)
    }

    /// Total number of gates, constants excluded
    pub fn nb_gates(&self) -> usize {
        self.gates
            .iter()
            .filter(|(name, _)| **name != "GND" && **name != "VDD")
            .map(|(_, c)| c.nb)
            .sum()
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stats:")?;
        writeln!(f, "  Inputs: {}", self.nb_inputs)?;
        writeln!(f, "  Outputs: {}", self.nb_outputs)?;
        writeln!(f, "  Gates: {}", self.nb_gates())?;
        for (name, count) in &self.gates {
            writeln!(f, "    {}: {}", name, count.nb)?;
            if count.arity.iter().filter(|nb| **nb != 0).count() > 1 {
                for (i, nb) in count.arity.iter().enumerate() {
                    if *nb != 0 {
                        writeln!(f, "      {} inputs: {}", i, nb)?;
                    }
                }
            }
        }
        writeln!(f, "  Depth: {}", self.depth)?;
        writeln!(
            f,
            "  Faults: {} ({} after collapsing)",
            self.nb_faults, self.nb_collapsed_faults
        )
    }
}

/// Compute the statistics of the network
pub fn stats(net: &Network) -> NetworkStats {
    let mut ret = NetworkStats {
        nb_inputs: net.nb_inputs(),
        nb_outputs: net.nb_outputs(),
        nb_faults: Fault::all(net).len(),
        nb_collapsed_faults: Fault::all_unique(net).len(),
        ..Default::default()
    };
    let mut depth = vec![0; net.nb_nodes()];
    for &i in net.logic() {
        let fanins = net.fanins(i);
        if let Some(g) = net.node(i).gate() {
            ret.gates.entry(g.type_name()).or_default().add(fanins.len());
            if !matches!(g, Gate::Const(_)) {
                depth[i] = 1 + fanins.iter().map(|f| depth[*f]).max().unwrap_or(0);
            }
        }
    }
    ret.depth = (0..net.nb_outputs())
        .map(|o| depth[net.output(o)])
        .max()
        .unwrap_or(0);
    ret
}
