//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use crate::atpg::{generate_test_patterns, AtpgConfig};
use crate::io::{read_network_file, read_pattern_file, write_pattern_file};
use crate::network::stats::stats;
use crate::sim::{Fault, FaultStatus, Fsim, Fsim3, SimGraph, NB_LANES};
use crate::Result;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Show statistics about a logic network
    ///
    /// Will print statistics on the number of inputs, outputs and gates in the network.
    #[clap()]
    Show(ShowArgs),

    /// Fault simulation of a pattern file
    ///
    /// This uses the same test pattern format as Atalanta, with one bit per input:
    ///    1: 00011101
    ///    2: 01XX0000
    /// Unknown values are treated as 0, unless three-valued simulation is used.
    #[clap(alias = "sim")]
    Fsim(FsimArgs),

    /// Test pattern generation for a logic network
    ///
    /// Generate patterns to find all possible faults in a design.
    /// Full fault coverage is achieved using a SAT solver.
    ///
    /// Fault types are:
    ///   * Output stuck-at fault, where the output of the gate is stuck at a constant value
    ///   * Input stuck-at fault, where the input of the gate is stuck at a constant value
    #[clap()]
    Atpg(AtpgArgs),
}

/// Command arguments for network informations
#[derive(Args)]
pub struct ShowArgs {
    /// Network to show
    file: PathBuf,
}

impl ShowArgs {
    /// Print the statistics of the network
    pub fn run(&self) -> Result<()> {
        let net = read_network_file(&self.file)?;
        println!("Network stats:\n{}\n\n", stats(&net));
        Ok(())
    }
}

/// Command arguments for fault simulation
#[derive(Args)]
pub struct FsimArgs {
    /// Network to simulate
    network: PathBuf,

    /// Input patterns file
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Use three-valued simulation, one pattern at a time
    #[arg(long)]
    three_valued: bool,

    /// Simulate every fault instead of the collapsed fault list
    #[arg(long)]
    all_faults: bool,
}

impl FsimArgs {
    /// Simulate the patterns and print the fault coverage
    pub fn run(&self) -> Result<()> {
        let net = read_network_file(&self.network)?;
        let patterns = read_pattern_file(&self.input)?;
        for (i, tv) in patterns.iter().enumerate() {
            if tv.len() != net.nb_inputs() {
                return Err(crate::Error::PatternSize {
                    index: i + 1,
                    found: tv.len(),
                    expected: net.nb_inputs(),
                });
            }
        }
        let faults = if self.all_faults {
            Fault::all(&net)
        } else {
            Fault::all_unique(&net)
        };
        let graph = SimGraph::build(&net);
        info!(
            "Simulating {} patterns on {} faults, {} fanout-free regions",
            patterns.len(),
            faults.len(),
            graph.nb_ffrs()
        );

        let nb_detected = if self.three_valued {
            let mut fsim = Fsim3::new(&graph);
            fsim.set_faults(&faults);
            for tv in &patterns {
                fsim.run(tv);
            }
            count_detected(&faults, |f| fsim.status(f))
        } else {
            let mut fsim = Fsim::new(&graph);
            fsim.set_faults(&faults);
            for batch in patterns.chunks(NB_LANES) {
                fsim.run_batch(batch);
            }
            count_detected(&faults, |f| fsim.status(f))
        };
        println!(
            "{} patterns, detecting {}/{} faults ({:.2}% coverage)",
            patterns.len(),
            nb_detected,
            faults.len(),
            if faults.is_empty() {
                100.0
            } else {
                100.0 * nb_detected as f64 / faults.len() as f64
            }
        );
        Ok(())
    }
}

fn count_detected<F: Fn(&Fault) -> Option<FaultStatus>>(faults: &[Fault], status: F) -> usize {
    faults
        .iter()
        .filter(|f| status(f) == Some(FaultStatus::Detected))
        .count()
}

/// Command arguments for test pattern generation
#[derive(Args)]
pub struct AtpgArgs {
    /// Network to write test patterns for
    network: PathBuf,

    /// Output file for test patterns
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Random seed for test pattern generation
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Target every fault instead of the collapsed fault list
    #[arg(long)]
    all_faults: bool,

    /// Keep every generated pattern
    #[arg(long)]
    no_compression: bool,
}

impl AtpgArgs {
    /// Generate the patterns and write them to the output file
    pub fn run(&self) -> Result<()> {
        let net = read_network_file(&self.network)?;
        let config = AtpgConfig {
            seed: self.seed,
            all_faults: self.all_faults,
            compress: !self.no_compression,
            ..Default::default()
        };
        let (patterns, report) = generate_test_patterns(&net, &config)?;
        write_pattern_file(&self.output, &patterns)?;
        println!("{report}");
        Ok(())
    }
}
