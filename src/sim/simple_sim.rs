use crate::{Fault, Network, Node};

/// Structure for simulation based directly on the network representation
///
/// This is the reference evaluator: gates are computed one by one in topological
/// order, with faults injected on the fly.
#[derive(Clone, Debug)]
pub struct SimpleSimulator<'a> {
    net: &'a Network,
    node_values: Vec<u64>,
}

impl<'a> SimpleSimulator<'a> {
    /// Build a simulator by capturing a network
    pub fn from_network(net: &'a Network) -> SimpleSimulator<'a> {
        SimpleSimulator {
            net,
            node_values: vec![0; net.nb_nodes()],
        }
    }

    /// Run the simulation on 64 patterns; return the output values
    pub fn run(&mut self, input_values: &[u64]) -> Vec<u64> {
        self.run_with_faults(input_values, &[])
    }

    /// Run the simulation on 64 patterns with faults injected; return the output values
    pub fn run_with_faults(&mut self, input_values: &[u64], faults: &[Fault]) -> Vec<u64> {
        assert_eq!(input_values.len(), self.net.nb_inputs());
        let mut deps = Vec::new();
        for i in 0..self.net.nb_nodes() {
            let val = match self.net.node(i) {
                Node::Input(idx) => input_values[*idx],
                Node::Logic(g, fanins) => {
                    deps.clear();
                    deps.extend(fanins.iter().map(|f| self.node_values[*f]));
                    for f in faults {
                        if let Fault::InputStuckAtFault { gate, input, value } = f {
                            if *gate == i {
                                deps[*input] = if *value { !0 } else { 0 };
                            }
                        }
                    }
                    g.eval_word(&deps)
                }
            };
            self.node_values[i] = val;
            for f in faults {
                if let Fault::OutputStuckAtFault { gate, value } = f {
                    if *gate == i {
                        self.node_values[i] = if *value { !0 } else { 0 };
                    }
                }
            }
        }
        self.get_output_values()
    }

    /// Value of a node after the last run
    pub fn node_value(&self, i: usize) -> u64 {
        self.node_values[i]
    }

    fn get_output_values(&self) -> Vec<u64> {
        (0..self.net.nb_outputs())
            .map(|o| self.node_values[self.net.output(o)])
            .collect()
    }
}
