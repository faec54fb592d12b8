//! Tseitin encoding of gates and expressions into clauses

use rustsat::types::Lit;

use crate::error::SolverError;
use crate::sat::SatSolver;
use crate::{Expr, Gate};

/// Above this number of inputs, Xor gates are encoded as a chain of 2-input Xor
const MAX_XOR_ENUM: usize = 4;

/// Clauses for output = AND(inputs)
fn make_and<S: SatSolver + ?Sized>(s: &mut S, output: Lit, inputs: &[Lit]) -> Result<(), SolverError> {
    let mut big = Vec::with_capacity(inputs.len() + 1);
    for &i in inputs {
        s.add_clause(&[!output, i])?;
        big.push(!i);
    }
    big.push(output);
    s.add_clause(&big)
}

/// Clauses for output = XOR(inputs), enumerating all input combinations
fn make_xor_enum<S: SatSolver + ?Sized>(
    s: &mut S,
    output: Lit,
    inputs: &[Lit],
) -> Result<(), SolverError> {
    let mut clause = Vec::with_capacity(inputs.len() + 1);
    for mask in 0..(1usize << inputs.len()) {
        clause.clear();
        for (j, &i) in inputs.iter().enumerate() {
            // The clause is falsified exactly by this combination
            clause.push(if (mask >> j) & 1 != 0 { !i } else { i });
        }
        let parity = mask.count_ones() % 2 == 1;
        clause.push(if parity { output } else { !output });
        s.add_clause(&clause)?;
    }
    Ok(())
}

/// Clauses for output = XOR(inputs)
fn make_xor<S: SatSolver + ?Sized>(s: &mut S, output: Lit, inputs: &[Lit]) -> Result<(), SolverError> {
    if inputs.len() <= MAX_XOR_ENUM {
        return make_xor_enum(s, output, inputs);
    }
    let mut acc = inputs[0];
    for (k, &i) in inputs.iter().enumerate().skip(1) {
        let o = if k + 1 == inputs.len() {
            output
        } else {
            s.new_var().pos_lit()
        };
        make_xor_enum(s, o, &[acc, i])?;
        acc = o;
    }
    Ok(())
}

/// Add the clauses for output = a ^ b
pub fn make_xor2<S: SatSolver + ?Sized>(
    s: &mut S,
    output: Lit,
    a: Lit,
    b: Lit,
) -> Result<(), SolverError> {
    make_xor_enum(s, output, &[a, b])
}

/// Clauses for output = input
fn make_buf<S: SatSolver + ?Sized>(s: &mut S, output: Lit, input: Lit) -> Result<(), SolverError> {
    s.add_clause(&[!input, output])?;
    s.add_clause(&[input, !output])
}

/// Add the clauses relating the output of a gate to its inputs
pub fn make_gate_cnf<S: SatSolver + ?Sized>(
    s: &mut S,
    gate: &Gate,
    output: Lit,
    inputs: &[Lit],
) -> Result<(), SolverError> {
    assert!(gate.accepts_arity(inputs.len()));
    // Inverting gates are encoded with an inverted output
    let o = if gate.is_inverting() { !output } else { output };
    match gate {
        Gate::Const(b) => s.add_clause(&[if *b { output } else { !output }]),
        Gate::Buf | Gate::Not => make_buf(s, o, inputs[0]),
        Gate::And | Gate::Nand => make_and(s, o, inputs),
        Gate::Or | Gate::Nor => {
            let inv: Vec<Lit> = inputs.iter().map(|i| !*i).collect();
            make_and(s, !o, &inv)
        }
        Gate::Xor | Gate::Xnor => make_xor(s, o, inputs),
        Gate::Cplx(e) => make_expr_cnf(s, e, output, inputs),
    }
}

/// Add the clauses relating the output of an expression to its inputs
///
/// One auxiliary variable is created for each subexpression that is not a literal.
pub fn make_expr_cnf<S: SatSolver + ?Sized>(
    s: &mut S,
    e: &Expr,
    output: Lit,
    inputs: &[Lit],
) -> Result<(), SolverError> {
    match e {
        Expr::Const(b) => s.add_clause(&[if *b { output } else { !output }]),
        Expr::Lit(v, inv) => make_buf(s, output, if *inv { !inputs[*v] } else { inputs[*v] }),
        Expr::And(c) | Expr::Or(c) | Expr::Xor(c) => {
            let mut lits = Vec::with_capacity(c.len());
            for sub in c {
                let l = match sub {
                    Expr::Lit(v, inv) => {
                        if *inv {
                            !inputs[*v]
                        } else {
                            inputs[*v]
                        }
                    }
                    _ => {
                        let aux = s.new_var().pos_lit();
                        make_expr_cnf(s, sub, aux, inputs)?;
                        aux
                    }
                };
                lits.push(l);
            }
            match e {
                Expr::And(_) => make_and(s, output, &lits),
                Expr::Or(_) => {
                    let inv: Vec<Lit> = lits.iter().map(|i| !*i).collect();
                    make_and(s, !output, &inv)
                }
                _ => make_xor(s, output, &lits),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::{KissatSolver, SatResult};

    /// Check the encoding against the evaluation of the gate for every input combination
    fn check_gate(gate: &Gate, nb: usize) {
        for mask in 0..(1usize << nb) {
            let vals: Vec<bool> = (0..nb).map(|i| (mask >> i) & 1 != 0).collect();
            let words: Vec<u64> = vals.iter().map(|b| if *b { !0 } else { 0 }).collect();
            let expected = gate.eval_word(&words) != 0;

            let mut s = KissatSolver::default();
            let inputs: Vec<Lit> = (0..nb).map(|_| s.new_var().pos_lit()).collect();
            let output = s.new_var().pos_lit();
            make_gate_cnf(&mut s, gate, output, &inputs).unwrap();
            let mut assumps: Vec<Lit> = inputs
                .iter()
                .zip(vals.iter())
                .map(|(l, v)| if *v { *l } else { !*l })
                .collect();
            assumps.push(if expected { output } else { !output });
            assert_eq!(s.solve(&assumps).unwrap(), SatResult::Sat, "{gate} {mask}");

            let mut s2 = KissatSolver::default();
            let inputs: Vec<Lit> = (0..nb).map(|_| s2.new_var().pos_lit()).collect();
            let output = s2.new_var().pos_lit();
            make_gate_cnf(&mut s2, gate, output, &inputs).unwrap();
            let mut assumps: Vec<Lit> = inputs
                .iter()
                .zip(vals.iter())
                .map(|(l, v)| if *v { *l } else { !*l })
                .collect();
            assumps.push(if expected { !output } else { output });
            assert_eq!(s2.solve(&assumps).unwrap(), SatResult::Unsat, "{gate} {mask}");
        }
    }

    #[test]
    fn test_primitive_gates() {
        for g in [Gate::And, Gate::Nand, Gate::Or, Gate::Nor, Gate::Xor, Gate::Xnor] {
            check_gate(&g, 3);
        }
        check_gate(&Gate::Buf, 1);
        check_gate(&Gate::Not, 1);
        check_gate(&Gate::Const(true), 0);
        check_gate(&Gate::Const(false), 0);
    }

    #[test]
    fn test_large_xor() {
        check_gate(&Gate::Xor, 6);
        check_gate(&Gate::Xnor, 5);
    }

    #[test]
    fn test_expr() {
        let e = Expr::Xor(vec![
            Expr::And(vec![Expr::posi(0), Expr::nega(1)]),
            Expr::Or(vec![Expr::nega(2), Expr::Const(false)]),
        ]);
        check_gate(&Gate::Cplx(e), 3);
    }
}
