mod common;

use common::{all_vectors, random_network};
use proptest::prelude::*;
use satpg::atpg::{DtpgSat, DtpgStatus};
use satpg::sat::KissatSolver;
use satpg::sim::detects_fault;
use satpg::{Fault, Gate, Network, TestVector};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Generated vectors detect their fault, and untestable faults are never detected
    #[test]
    fn prop_dtpg_sound(seed in 0u64..10000, nb_gates in 1usize..25) {
        let net = random_network(seed, 4, nb_gates);
        let tvs = all_vectors(4);
        let mut dtpg = DtpgSat::<KissatSolver>::new();
        for f in Fault::all(&net) {
            let mut tv = TestVector::new(4);
            match dtpg.run(&net, &f, &mut tv) {
                DtpgStatus::Detected => {
                    // Unknown inputs do not matter
                    for fill in [false, true] {
                        let bits: Vec<bool> = (0..4)
                            .map(|i| tv.val3(i).to_bool().unwrap_or(fill))
                            .collect();
                        prop_assert!(detects_fault(&net, &bits, &f));
                    }
                }
                DtpgStatus::Untestable => {
                    for tv in &tvs {
                        prop_assert!(!detects_fault(&net, &tv.to_bools(), &f));
                    }
                }
                DtpgStatus::Aborted => prop_assert!(false, "Unexpected abort"),
            }
        }
    }
}

#[test]
fn test_unobservable_gate() {
    let mut net = Network::new();
    let i = net.add_inputs(3);
    let x = net.add_gate(Gate::Xor, &[i[0], i[1], i[2]]);
    let y = net.add_gate(Gate::Nand, &[x, i[0]]);
    let o = net.add_gate(Gate::Or, &[i[1], i[2]]);
    net.add_output(o);

    let mut dtpg = DtpgSat::<KissatSolver>::new();
    let mut tv = TestVector::new(3);
    for value in [false, true] {
        for gate in [x, y] {
            let f = Fault::OutputStuckAtFault { gate, value };
            assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Untestable);
        }
        let f = Fault::OutputStuckAtFault { gate: o, value };
        assert_eq!(dtpg.run(&net, &f, &mut tv), DtpgStatus::Detected);
        // Only the inputs in the cone are assigned
        assert!(!tv.val3(0).is_known());
        assert!(detects_fault(&net, &tv.to_bools(), &f));
    }
}
