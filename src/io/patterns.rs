//! IO for test pattern files
//!
//! This uses the same test pattern format as Atalanta, with one value per input:
//! ```text
//!     1: 00011101
//!     2: 01X10000
//! ```

use std::io::{BufRead, BufReader, Read, Write};

use crate::error::{Error, Result};
use crate::sim::TestVector;

/// Read test patterns; unknown values are written X
pub fn read_patterns<R: Read>(r: R) -> Result<Vec<TestVector>> {
    let mut ret: Vec<TestVector> = Vec::new();
    for (i, l) in BufReader::new(r).lines().enumerate() {
        let line = i + 1;
        let s = l?;
        let t = s.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        let Some((_, bits)) = t.split_once(':') else {
            return Err(Error::Parse {
                line,
                msg: format!("Missing pattern index in {t}"),
            });
        };
        let tv = bits
            .parse::<TestVector>()
            .map_err(|msg| Error::Parse { line, msg })?;
        if let Some(first) = ret.first() {
            if first.len() != tv.len() {
                return Err(Error::PatternSize {
                    index: ret.len() + 1,
                    found: tv.len(),
                    expected: first.len(),
                });
            }
        }
        ret.push(tv);
    }
    Ok(ret)
}

/// Write test patterns, numbered from 1
pub fn write_patterns<W: Write>(w: &mut W, patterns: &[TestVector]) -> Result<()> {
    for (i, p) in patterns.iter().enumerate() {
        writeln!(w, "{}: {}", i + 1, p)?;
    }
    Ok(())
}
