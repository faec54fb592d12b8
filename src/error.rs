//! Error types for file parsing and SAT backends

use thiserror::Error;

/// Result type for fallible operations of the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading networks and patterns
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error reading or writing a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error in an input file
    #[error("Parse error at line {line}: {msg}")]
    Parse {
        /// Line number, starting at 1
        line: usize,
        /// Description of the problem
        msg: String,
    },

    /// Signal used but never defined
    #[error("Signal {0} is not generated anywhere")]
    UndefinedSignal(String),

    /// Signal defined twice
    #[error("Signal {0} is defined twice")]
    DuplicateSignal(String),

    /// Combinational loop in the network
    #[error("Combinational loop through signal {0}")]
    Cycle(String),

    /// Unsupported file format
    #[error("Unknown file extension: {0}")]
    UnknownExtension(String),

    /// Pattern file inconsistent with the network
    #[error("Pattern {index} has {found} values, expected {expected}")]
    PatternSize {
        /// Index of the pattern in the file
        index: usize,
        /// Number of values found
        found: usize,
        /// Number of primary inputs
        expected: usize,
    },
}

/// Error reported by a SAT solver backend
///
/// Test generation does not propagate it: the fault is reported as aborted instead.
#[derive(Debug, Error)]
#[error("SAT solver error: {0}")]
pub struct SolverError(pub String);
