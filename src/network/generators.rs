//! Network generators and templates

/// Adder generators
pub mod adder {
    use crate::{Gate, Network};

    /// A simple and slow ripple-carry adder, built from Xor, And and Or gates
    pub fn ripple_carry(len: usize) -> Network {
        let mut ret = Network::new();
        let mut c = ret.add_gate(Gate::Const(false), &[]);
        for _ in 0..len {
            let a = ret.add_input();
            let b = ret.add_input();
            let o = ret.xor(&[a, b, c]);
            let ab = ret.and(&[a, b]);
            let ac = ret.and(&[a, c]);
            let bc = ret.and(&[b, c]);
            let next_c = ret.or(&[ab, ac, bc]);
            ret.add_output(o);
            c = next_c;
        }
        ret.add_output(c);
        ret.check();
        ret
    }
}

/// Carry chain generators
pub mod carry_chain {
    use crate::{Gate, Network};

    /// A simple and slow ripple-carry chain, built from Nand gates
    pub fn ripple_carry(len: usize) -> Network {
        let mut ret = Network::new();
        let mut c = ret.add_input();
        for _ in 0..len {
            let propagate = ret.add_input();
            let generate = ret.add_input();
            let d = ret.add_gate(Gate::Nand, &[propagate, c]);
            let ng = ret.not(generate);
            c = ret.add_gate(Gate::Nand, &[ng, d]);
            ret.add_output(c);
        }
        ret.check();
        ret
    }
}

/// Simple generators to test functionality
pub mod testcases {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use crate::{Expr, Gate, Network};

    /// The ISCAS85 c17 benchmark
    pub fn c17() -> Network {
        let mut ret = Network::new();
        let i = ret.add_inputs(5);
        let n10 = ret.add_gate(Gate::Nand, &[i[0], i[2]]);
        let n11 = ret.add_gate(Gate::Nand, &[i[2], i[3]]);
        let n16 = ret.add_gate(Gate::Nand, &[i[1], n11]);
        let n19 = ret.add_gate(Gate::Nand, &[n11, i[4]]);
        let n22 = ret.add_gate(Gate::Nand, &[n10, n16]);
        let n23 = ret.add_gate(Gate::Nand, &[n16, n19]);
        ret.add_output(n22);
        ret.add_output(n23);
        ret.check();
        ret
    }

    /// A network with a redundant gate: out = a | (a & b)
    ///
    /// The input b is never observable, so its stuck-at faults are untestable.
    pub fn redundant() -> Network {
        let mut ret = Network::new();
        let a = ret.add_input();
        let b = ret.add_input();
        let x = ret.and(&[a, b]);
        let o = ret.or(&[a, x]);
        ret.add_output(o);
        ret.check();
        ret
    }

    /// A network with complex gates: a multiplexer and an and-or-invert
    pub fn complex_gates() -> Network {
        let mut ret = Network::new();
        let i = ret.add_inputs(4);
        // s ? b : a
        let mux = Expr::Or(vec![
            Expr::And(vec![Expr::nega(0), Expr::posi(1)]),
            Expr::And(vec![Expr::posi(0), Expr::posi(2)]),
        ]);
        let m = ret.add_gate(Gate::Cplx(mux), &[i[0], i[1], i[2]]);
        // !(a | b & c)
        let aoi = Expr::Or(vec![
            Expr::And(vec![Expr::nega(0), Expr::nega(1)]),
            Expr::And(vec![Expr::nega(0), Expr::nega(2)]),
        ]);
        let n = ret.add_gate(Gate::Cplx(aoi), &[m, i[3], i[1]]);
        ret.add_output(m);
        ret.add_output(n);
        ret.check();
        ret
    }

    /// A random network with primitive gates, used for property tests
    pub fn random(seed: u64, nb_inputs: usize, nb_gates: usize, nb_outputs: usize) -> Network {
        assert!(nb_inputs > 0);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut ret = Network::new();
        ret.add_inputs(nb_inputs);
        for _ in 0..nb_gates {
            let gate = match rng.gen_range(0..8) {
                0 => Gate::And,
                1 => Gate::Nand,
                2 => Gate::Or,
                3 => Gate::Nor,
                4 => Gate::Xor,
                5 => Gate::Xnor,
                6 => Gate::Not,
                _ => Gate::Buf,
            };
            let arity = if gate.is_buf_like() {
                1
            } else {
                rng.gen_range(2..=3)
            };
            let nb = ret.nb_nodes();
            let fanins: Vec<usize> = (0..arity).map(|_| rng.gen_range(0..nb)).collect();
            ret.add_gate(gate, &fanins);
        }
        let nb = ret.nb_nodes();
        for i in 0..nb_outputs {
            // Favour the last nodes, so that most of the logic is observable
            let o = if i == 0 { nb - 1 } else { rng.gen_range(0..nb) };
            ret.add_output(o);
        }
        ret.check();
        ret
    }
}
