use std::fmt;

use crate::{Network, Node};

/// Representation of a fault, with its type and location
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fault {
    /// Output stuck-at fault: the output of the given gate is stuck at a fixed value
    OutputStuckAtFault {
        /// Gate where the fault is located
        gate: usize,
        /// Fault value
        value: bool,
    },
    /// Input stuck-at fault: the input of the given gate is stuck at a fixed value
    InputStuckAtFault {
        /// Gate where the fault is located
        gate: usize,
        /// Input where the fault is located
        input: usize,
        /// Fault value
        value: bool,
    },
}

/// Detection status of a fault
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum FaultStatus {
    /// No test found yet
    #[default]
    Undetected,
    /// Detected by a test vector
    Detected,
    /// Proven impossible to detect
    Untestable,
    /// Test generation gave up on this fault
    Aborted,
}

impl Fault {
    /// Node where the fault is located
    pub fn node(&self) -> usize {
        match self {
            Fault::OutputStuckAtFault { gate, .. } => *gate,
            Fault::InputStuckAtFault { gate, .. } => *gate,
        }
    }

    /// Stuck value
    pub fn value(&self) -> bool {
        match self {
            Fault::OutputStuckAtFault { value, .. } => *value,
            Fault::InputStuckAtFault { value, .. } => *value,
        }
    }

    /// Input position, for input faults
    pub fn input(&self) -> Option<usize> {
        match self {
            Fault::OutputStuckAtFault { .. } => None,
            Fault::InputStuckAtFault { input, .. } => Some(*input),
        }
    }

    /// Node whose value must differ from the stuck value to activate the fault
    ///
    /// This is the fanin for an input fault, and the faulty node itself otherwise.
    pub fn source_node(&self, net: &Network) -> usize {
        match self {
            Fault::OutputStuckAtFault { gate, .. } => *gate,
            Fault::InputStuckAtFault { gate, input, .. } => net.fanins(*gate)[*input],
        }
    }

    /// Get all possible faults in a network
    pub fn all(net: &Network) -> Vec<Fault> {
        let mut ret = Vec::new();
        for gate in 0..net.nb_nodes() {
            for value in [false, true] {
                ret.push(Fault::OutputStuckAtFault { gate, value });
            }
            for input in 0..net.fanins(gate).len() {
                for value in [false, true] {
                    ret.push(Fault::InputStuckAtFault { gate, input, value });
                }
            }
        }
        ret
    }

    /// Get all possible non-redundant faults in a network
    pub fn all_unique(net: &Network) -> Vec<Fault> {
        let mut ret = Fault::all(net);
        let redundant = Fault::redundant_faults(net);
        ret.retain(|f| redundant.binary_search(f).is_err());
        ret
    }

    /// List the redundant faults in a network
    ///
    /// A fault is redundant if it is equivalent to another fault of the list.
    /// Only input faults are ever reported: each equivalence class keeps an output fault.
    pub fn redundant_faults(net: &Network) -> Vec<Fault> {
        let mut ret = Vec::new();
        for &gate in net.logic() {
            let Node::Logic(g, fanins) = net.node(gate) else {
                continue;
            };
            for (input, &s) in fanins.iter().enumerate() {
                for value in [false, true] {
                    let f = Fault::InputStuckAtFault { gate, input, value };
                    if net.nb_uses(s) == 1 {
                        // Equivalent to the output fault of the fanin, used only here
                        ret.push(f);
                    } else if g.is_buf_like() {
                        // Equivalent to an output fault of the gate
                        ret.push(f);
                    } else if g.controlling_value() == Some(value) {
                        // The controlling value forces the output of the gate
                        ret.push(f);
                    }
                }
            }
        }
        ret.sort();
        ret.dedup();
        ret
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::OutputStuckAtFault { gate, value } => {
                write!(f, "Gate {} output stuck at {}", gate, i32::from(*value))
            }
            Fault::InputStuckAtFault { gate, input, value } => {
                write!(
                    f,
                    "Gate {} input {} stuck at {}",
                    gate,
                    input,
                    i32::from(*value)
                )
            }
        }
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultStatus::Undetected => "undetected",
            FaultStatus::Detected => "detected",
            FaultStatus::Untestable => "untestable",
            FaultStatus::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gate;
    use crate::network::generators::testcases;
    use crate::sim::simulate_comb_with_faults;

    /// Value forced on the output of a gate by a stuck input, if any
    fn forced_output(g: &Gate, value: bool) -> Option<bool> {
        match g {
            Gate::Buf => Some(value),
            Gate::Not => Some(!value),
            _ if g.controlling_value() == Some(value) => Some(value ^ g.is_inverting()),
            _ => None,
        }
    }

    #[test]
    fn test_all_faults() {
        let net = testcases::c17();
        let faults = Fault::all(&net);
        // 11 nodes with output faults, 6 gates with 2 inputs
        assert_eq!(faults.len(), 2 * 11 + 2 * 12);
        let unique = Fault::all_unique(&net);
        assert!(unique.len() < faults.len());
        for f in &unique {
            assert!(faults.contains(f));
        }
        for gate in 0..net.nb_nodes() {
            for value in [false, true] {
                assert!(unique.contains(&Fault::OutputStuckAtFault { gate, value }));
            }
        }
    }

    #[test]
    fn test_accessors() {
        let net = testcases::c17();
        let f = Fault::InputStuckAtFault {
            gate: 7,
            input: 1,
            value: true,
        };
        assert_eq!(f.node(), 7);
        assert_eq!(f.input(), Some(1));
        assert!(f.value());
        assert_eq!(f.source_node(&net), net.fanins(7)[1]);
        assert_eq!(format!("{f}"), "Gate 7 input 1 stuck at 1");
        let g = Fault::OutputStuckAtFault {
            gate: 3,
            value: false,
        };
        assert_eq!(g.source_node(&net), 3);
        assert_eq!(g.input(), None);
    }

    /// Collapsed faults must be equivalent to a fault that is kept
    #[test]
    fn test_collapsing_is_sound() {
        let net = testcases::random(3, 5, 30, 3);
        let unique = Fault::all_unique(&net);
        let redundant = Fault::redundant_faults(&net);
        for f in redundant {
            let Fault::InputStuckAtFault { gate, input, value } = f else {
                panic!("Only input faults are collapsed");
            };
            let fanin = net.fanins(gate)[input];
            let equiv = if net.nb_uses(fanin) == 1 {
                Fault::OutputStuckAtFault { gate: fanin, value }
            } else {
                let g = net.node(gate).gate().unwrap();
                Fault::OutputStuckAtFault {
                    gate,
                    value: forced_output(g, value).unwrap(),
                }
            };
            assert!(unique.contains(&equiv));
            for mask in 0..(1usize << net.nb_inputs()) {
                let pattern: Vec<bool> = (0..net.nb_inputs()).map(|i| (mask >> i) & 1 != 0).collect();
                assert_eq!(
                    simulate_comb_with_faults(&net, &pattern, &[f]),
                    simulate_comb_with_faults(&net, &pattern, &[equiv])
                );
            }
        }
    }
}
