//! Read and write logic networks and test patterns to files

mod bench;
mod patterns;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub use bench::{read_bench, write_bench};
pub use patterns::{read_patterns, write_patterns};

use crate::error::{Error, Result};
use crate::sim::TestVector;
use crate::Network;

/// Check that the file has a supported network extension
fn check_network_extension(path: &Path) -> Result<()> {
    match path.extension() {
        Some(s) if s == "bench" => Ok(()),
        Some(s) => Err(Error::UnknownExtension(s.to_string_lossy().to_string())),
        None => Err(Error::UnknownExtension(String::new())),
    }
}

/// Read a logic network from a file
///
/// Following extensions are supported: .bench
pub fn read_network_file(path: &Path) -> Result<Network> {
    check_network_extension(path)?;
    let f = File::open(path)?;
    read_bench(f)
}

/// Write a logic network to a file
///
/// Following extensions are supported: .bench
pub fn write_network_file(path: &Path, net: &Network) -> Result<()> {
    check_network_extension(path)?;
    let mut f = BufWriter::new(File::create(path)?);
    write_bench(&mut f, net)?;
    f.flush()?;
    Ok(())
}

/// Read test patterns from a file
pub fn read_pattern_file(path: &Path) -> Result<Vec<TestVector>> {
    let f = File::open(path)?;
    read_patterns(f)
}

/// Write test patterns to a file
pub fn write_pattern_file(path: &Path, patterns: &[TestVector]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write_patterns(&mut f, patterns)?;
    f.flush()?;
    Ok(())
}
