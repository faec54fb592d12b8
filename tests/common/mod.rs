#![allow(dead_code)]

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use satpg::network::generators::testcases;
use satpg::{Expr, Gate, Network, TestVector};

/// Random network, with a few complex gates added on top
pub fn random_network(seed: u64, nb_inputs: usize, nb_gates: usize) -> Network {
    let mut net = testcases::random(seed, nb_inputs, nb_gates, 2);
    let mut rng = SmallRng::seed_from_u64(seed ^ 0x5eed);
    for _ in 0..2 {
        let nb = net.nb_nodes();
        let fanins: Vec<usize> = (0..3).map(|_| rng.gen_range(0..nb)).collect();
        // Mux, with a possibly inverted data input
        let e = Expr::Or(vec![
            Expr::And(vec![Expr::nega(0), Expr::Lit(1, rng.gen())]),
            Expr::And(vec![Expr::posi(0), Expr::posi(2)]),
        ]);
        let g = net.add_gate(Gate::Cplx(e), &fanins);
        net.add_output(g);
    }
    net.check();
    net
}

/// All input combinations of a small network
pub fn all_vectors(nb_inputs: usize) -> Vec<TestVector> {
    (0..(1usize << nb_inputs))
        .map(|mask| {
            let vals: Vec<bool> = (0..nb_inputs).map(|i| (mask >> i) & 1 != 0).collect();
            TestVector::from_bools(&vals)
        })
        .collect()
}
