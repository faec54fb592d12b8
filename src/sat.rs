//! Interface to the SAT solver used for test generation

use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Assignment, Clause, Lit, TernaryVal, Var};
use rustsat_kissat::Kissat;

use crate::error::SolverError;

/// Result of a call to the solver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatResult {
    /// A model was found
    Sat,
    /// The problem has no solution
    Unsat,
    /// The solver gave up
    Unknown,
}

/// Statistics of a solver instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SatStats {
    /// Number of variables created
    pub nb_vars: usize,
    /// Number of clauses added
    pub nb_clauses: usize,
    /// Number of calls to solve
    pub nb_solves: usize,
}

/// Contract of a SAT solver, as used by the test generator
pub trait SatSolver {
    /// Create a new variable
    fn new_var(&mut self) -> Var;

    /// Add a clause
    fn add_clause(&mut self, lits: &[Lit]) -> Result<(), SolverError>;

    /// Solve the problem under the given assumptions
    fn solve(&mut self, assumptions: &[Lit]) -> Result<SatResult, SolverError>;

    /// Value of a literal in the last model; None if unassigned
    fn model_value(&self, lit: Lit) -> Option<bool>;

    /// Statistics of the solver
    fn stats(&self) -> SatStats;
}

/// Kissat backend
///
/// Kissat is not incremental: clauses are recorded, and a new solver instance is created
/// for each call to solve, with the assumptions added as unit clauses.
#[derive(Default)]
pub struct KissatSolver {
    clauses: Vec<Clause>,
    model: Option<Assignment>,
    stats: SatStats,
}

fn solver_error(e: impl std::fmt::Display) -> SolverError {
    SolverError(e.to_string())
}

impl SatSolver for KissatSolver {
    fn new_var(&mut self) -> Var {
        let v = Var::new(self.stats.nb_vars as u32);
        self.stats.nb_vars += 1;
        v
    }

    fn add_clause(&mut self, lits: &[Lit]) -> Result<(), SolverError> {
        self.stats.nb_clauses += 1;
        self.clauses.push(Clause::from(lits));
        Ok(())
    }

    fn solve(&mut self, assumptions: &[Lit]) -> Result<SatResult, SolverError> {
        self.stats.nb_solves += 1;
        self.model = None;
        let mut solver = Kissat::default();
        for c in &self.clauses {
            solver.add_clause(c.clone()).map_err(solver_error)?;
        }
        for &a in assumptions {
            solver.add_unit(a).map_err(solver_error)?;
        }
        let res = solver.solve().map_err(solver_error)?;
        Ok(match res {
            SolverResult::Sat => {
                self.model = Some(solver.full_solution().map_err(solver_error)?);
                SatResult::Sat
            }
            SolverResult::Unsat => SatResult::Unsat,
            SolverResult::Interrupted => SatResult::Unknown,
        })
    }

    fn model_value(&self, lit: Lit) -> Option<bool> {
        match self.model.as_ref()?.lit_value(lit) {
            TernaryVal::True => Some(true),
            TernaryVal::False => Some(false),
            TernaryVal::DontCare => None,
        }
    }

    fn stats(&self) -> SatStats {
        self.stats
    }
}

/// Solvers that never answer, to exercise the abort paths
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Accepts every clause, then gives up
    #[derive(Default)]
    pub struct GiveUpSolver {
        stats: SatStats,
    }

    impl SatSolver for GiveUpSolver {
        fn new_var(&mut self) -> Var {
            self.stats.nb_vars += 1;
            Var::new(self.stats.nb_vars as u32 - 1)
        }

        fn add_clause(&mut self, _lits: &[Lit]) -> Result<(), SolverError> {
            self.stats.nb_clauses += 1;
            Ok(())
        }

        fn solve(&mut self, _assumptions: &[Lit]) -> Result<SatResult, SolverError> {
            self.stats.nb_solves += 1;
            Ok(SatResult::Unknown)
        }

        fn model_value(&self, _lit: Lit) -> Option<bool> {
            None
        }

        fn stats(&self) -> SatStats {
            self.stats
        }
    }

    /// Rejects every clause
    #[derive(Default)]
    pub struct BrokenSolver {
        stats: SatStats,
    }

    impl SatSolver for BrokenSolver {
        fn new_var(&mut self) -> Var {
            self.stats.nb_vars += 1;
            Var::new(self.stats.nb_vars as u32 - 1)
        }

        fn add_clause(&mut self, _lits: &[Lit]) -> Result<(), SolverError> {
            Err(SolverError("backend unavailable".to_string()))
        }

        fn solve(&mut self, _assumptions: &[Lit]) -> Result<SatResult, SolverError> {
            Err(SolverError("backend unavailable".to_string()))
        }

        fn model_value(&self, _lit: Lit) -> Option<bool> {
            None
        }

        fn stats(&self) -> SatStats {
            self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kissat() {
        let mut s = KissatSolver::default();
        let a = s.new_var();
        let b = s.new_var();
        s.add_clause(&[a.pos_lit(), b.pos_lit()]).unwrap();
        s.add_clause(&[a.neg_lit()]).unwrap();
        assert_eq!(s.solve(&[]).unwrap(), SatResult::Sat);
        assert_eq!(s.model_value(a.pos_lit()), Some(false));
        assert_eq!(s.model_value(b.pos_lit()), Some(true));
        assert_eq!(s.model_value(!b.pos_lit()), Some(false));
        assert_eq!(
            s.stats(),
            SatStats {
                nb_vars: 2,
                nb_clauses: 2,
                nb_solves: 1
            }
        );
    }

    #[test]
    fn test_unsat() {
        let mut s = KissatSolver::default();
        let a = s.new_var();
        s.add_clause(&[a.pos_lit()]).unwrap();
        assert_eq!(s.solve(&[a.neg_lit()]).unwrap(), SatResult::Unsat);
    }
}
