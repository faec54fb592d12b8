use std::fmt;

use itertools::Itertools;
use volute::Lut;

/// Logic expression over the inputs of a complex gate
///
/// Variables are fanin positions of the gate. Literals may be inverted; there is no
/// explicit Not node, so negations only appear on literals.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Expr {
    /// Constant value
    Const(bool),
    /// Fanin position, possibly inverted
    Lit(usize, bool),
    /// Conjunction of the subexpressions
    And(Vec<Expr>),
    /// Disjunction of the subexpressions
    Or(Vec<Expr>),
    /// Exclusive-or of the subexpressions
    Xor(Vec<Expr>),
}

impl Expr {
    /// Positive literal
    pub fn posi(var: usize) -> Expr {
        Expr::Lit(var, false)
    }

    /// Negative literal
    pub fn nega(var: usize) -> Expr {
        Expr::Lit(var, true)
    }

    /// Returns whether the expression is a single literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Lit(_, _))
    }

    /// Subexpressions of an And/Or/Xor; empty for constants and literals
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::And(v) | Expr::Or(v) | Expr::Xor(v) => v,
            Expr::Const(_) | Expr::Lit(_, _) => &[],
        }
    }

    /// Number of occurences of a literal with the given variable and polarity
    pub fn literal_count(&self, var: usize, inverted: bool) -> usize {
        match self {
            Expr::Const(_) => 0,
            Expr::Lit(v, inv) => usize::from(*v == var && *inv == inverted),
            _ => self
                .children()
                .iter()
                .map(|c| c.literal_count(var, inverted))
                .sum(),
        }
    }

    /// Number of variables required to evaluate the expression
    pub fn nb_vars(&self) -> usize {
        match self {
            Expr::Const(_) => 0,
            Expr::Lit(v, _) => v + 1,
            _ => self.children().iter().map(|c| c.nb_vars()).max().unwrap_or(0),
        }
    }

    /// Evaluate the expression on boolean values
    pub fn eval(&self, vals: &[bool]) -> bool {
        match self {
            Expr::Const(b) => *b,
            Expr::Lit(v, inv) => vals[*v] ^ inv,
            Expr::And(v) => v.iter().all(|c| c.eval(vals)),
            Expr::Or(v) => v.iter().any(|c| c.eval(vals)),
            Expr::Xor(v) => v.iter().fold(false, |acc, c| acc ^ c.eval(vals)),
        }
    }

    /// Evaluate the expression on 64 patterns at once
    pub fn eval_word(&self, vals: &[u64]) -> u64 {
        match self {
            Expr::Const(b) => {
                if *b {
                    !0
                } else {
                    0
                }
            }
            Expr::Lit(v, inv) => {
                if *inv {
                    !vals[*v]
                } else {
                    vals[*v]
                }
            }
            Expr::And(v) => v.iter().fold(!0, |acc, c| acc & c.eval_word(vals)),
            Expr::Or(v) => v.iter().fold(0, |acc, c| acc | c.eval_word(vals)),
            Expr::Xor(v) => v.iter().fold(0, |acc, c| acc ^ c.eval_word(vals)),
        }
    }

    /// Build a sum-of-minterms cover from a lookup table
    pub fn from_lut(lut: &Lut) -> Expr {
        let nb_vars = lut.num_vars();
        let mut cubes = Vec::new();
        for mask in 0..lut.num_bits() {
            if !lut.value(mask) {
                continue;
            }
            let lits = (0..nb_vars)
                .map(|v| Expr::Lit(v, (mask >> v) & 1 == 0))
                .collect::<Vec<_>>();
            if lits.len() == 1 {
                cubes.extend(lits);
            } else {
                cubes.push(Expr::And(lits));
            }
        }
        if nb_vars == 0 {
            return Expr::Const(!cubes.is_empty());
        }
        match cubes.len() {
            0 => Expr::Const(false),
            1 => cubes.swap_remove(0),
            _ => Expr::Or(cubes),
        }
    }

    /// Build the lookup table of the expression; only for small expressions
    pub fn to_lut(&self, nb_vars: usize) -> Lut {
        let mut lut = Lut::zero(nb_vars);
        for mask in 0..lut.num_bits() {
            let vals = (0..nb_vars).map(|v| (mask >> v) & 1 != 0).collect::<Vec<_>>();
            if self.eval(&vals) {
                lut.set_value(mask, true);
            }
        }
        lut
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(b) => write!(f, "{}", u8::from(*b)),
            Expr::Lit(v, inv) => {
                if *inv {
                    write!(f, "!")?;
                }
                write!(f, "v{v}")
            }
            Expr::And(v) => write!(f, "({})", v.iter().join(" & ")),
            Expr::Or(v) => write!(f, "({})", v.iter().join(" | ")),
            Expr::Xor(v) => write!(f, "({})", v.iter().join(" ^ ")),
        }
    }
}

/// Logic gate function of a network node
///
/// Primitive gates take any number of inputs (exactly one for Buf and Not, none for
/// constants). Complex gates are described by an expression over their fanins.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Gate {
    /// Constant value
    Const(bool),
    /// Buffer
    Buf,
    /// Inverter
    Not,
    /// N-input And gate
    And,
    /// N-input Nand gate
    Nand,
    /// N-input Or gate
    Or,
    /// N-input Nor gate
    Nor,
    /// N-input Xor gate
    Xor,
    /// N-input Xnor gate
    Xnor,
    /// Complex gate given as an expression of its fanins
    Cplx(Expr),
}

impl Gate {
    /// Returns whether the gate is an And, Or, Nand or Nor
    pub fn is_and_like(&self) -> bool {
        matches!(self, Gate::And | Gate::Nand | Gate::Or | Gate::Nor)
    }

    /// Returns whether the gate is a Xor or Xnor
    pub fn is_xor_like(&self) -> bool {
        matches!(self, Gate::Xor | Gate::Xnor)
    }

    /// Returns whether the gate is a Buf or Not
    pub fn is_buf_like(&self) -> bool {
        matches!(self, Gate::Buf | Gate::Not)
    }

    /// Returns whether the output is inverted compared to the base function (Nand, Nor, Xnor, Not)
    pub fn is_inverting(&self) -> bool {
        matches!(self, Gate::Not | Gate::Nand | Gate::Nor | Gate::Xnor)
    }

    /// Value that forces the output of an And-like gate when present on any input
    pub fn controlling_value(&self) -> Option<bool> {
        match self {
            Gate::And | Gate::Nand => Some(false),
            Gate::Or | Gate::Nor => Some(true),
            _ => None,
        }
    }

    /// Returns whether the gate accepts this number of inputs
    pub fn accepts_arity(&self, nb: usize) -> bool {
        match self {
            Gate::Const(_) => nb == 0,
            Gate::Buf | Gate::Not => nb == 1,
            Gate::And | Gate::Nand | Gate::Or | Gate::Nor | Gate::Xor | Gate::Xnor => nb >= 1,
            Gate::Cplx(e) => e.nb_vars() <= nb,
        }
    }

    /// Evaluate the gate on 64 patterns at once
    pub fn eval_word(&self, vals: &[u64]) -> u64 {
        let ret = match self {
            Gate::Const(b) => {
                if *b {
                    !0
                } else {
                    0
                }
            }
            Gate::Buf | Gate::Not => vals[0],
            Gate::And | Gate::Nand => vals.iter().fold(!0, |acc, v| acc & v),
            Gate::Or | Gate::Nor => vals.iter().fold(0, |acc, v| acc | v),
            Gate::Xor | Gate::Xnor => vals.iter().fold(0, |acc, v| acc ^ v),
            Gate::Cplx(e) => e.eval_word(vals),
        };
        if self.is_inverting() {
            !ret
        } else {
            ret
        }
    }

    /// Name of the gate type, as used in .bench files
    pub fn type_name(&self) -> &'static str {
        match self {
            Gate::Const(false) => "GND",
            Gate::Const(true) => "VDD",
            Gate::Buf => "BUFF",
            Gate::Not => "NOT",
            Gate::And => "AND",
            Gate::Nand => "NAND",
            Gate::Or => "OR",
            Gate::Nor => "NOR",
            Gate::Xor => "XOR",
            Gate::Xnor => "XNOR",
            Gate::Cplx(_) => "CPLX",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Cplx(e) => write!(f, "CPLX{e}"),
            _ => write!(f, "{}", self.type_name()),
        }
    }
}
