//! Test pattern generation
//!
//! The flow first simulates random patterns until they stop paying off, then calls the SAT
//! test generator on each remaining fault. Each new vector is fault simulated to drop the
//! other faults it detects. The final pattern set is compressed with a greedy set cover.

pub mod cnf;
pub mod dtpg_sat;

use std::fmt;

use fxhash::FxHashMap;
use kdam::{tqdm, Bar, BarExt};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub use dtpg_sat::{DtpgSat, DtpgStatus};

use crate::sat::{KissatSolver, SatSolver};
use crate::sim::{Fault, FaultStatus, Fsim, Fsim3, SimGraph, TestVector, NB_LANES};
use crate::{Network, Result};

/// Generate a random, fully specified pattern
fn random_pattern<R: Rng>(nb_inputs: usize, rng: &mut R) -> TestVector {
    let vals: Vec<bool> = (0..nb_inputs).map(|_| rng.gen()).collect();
    TestVector::from_bools(&vals)
}

/// Generate random combinatorial patterns
pub fn generate_random_patterns(nb_inputs: usize, nb_patterns: usize, seed: u64) -> Vec<TestVector> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..nb_patterns)
        .map(|_| random_pattern(nb_inputs, &mut rng))
        .collect()
}

/// Parameters of the test generation flow
#[derive(Clone, Debug)]
pub struct AtpgConfig {
    /// Seed for random patterns and X filling
    pub seed: u64,
    /// Target every fault instead of the collapsed fault list
    pub all_faults: bool,
    /// Stop random patterns when a batch detects less than this fraction of the faults
    pub min_random_gain: f64,
    /// Compress the final pattern set
    pub compress: bool,
}

impl Default for AtpgConfig {
    fn default() -> Self {
        AtpgConfig {
            seed: 1,
            all_faults: false,
            min_random_gain: 0.01,
            compress: true,
        }
    }
}

/// Summary of a test generation run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AtpgReport {
    /// Number of targeted faults
    pub nb_faults: usize,
    /// Faults detected by the patterns
    pub nb_detected: usize,
    /// Faults proven untestable
    pub nb_untestable: usize,
    /// Faults where the solver gave up
    pub nb_aborted: usize,
    /// Number of patterns
    pub nb_patterns: usize,
}

impl AtpgReport {
    /// Faults that were not processed
    pub fn nb_undetected(&self) -> usize {
        self.nb_faults - self.nb_detected - self.nb_untestable - self.nb_aborted
    }

    /// Percentage of the faults that are detected
    pub fn coverage(&self) -> f64 {
        if self.nb_faults == 0 {
            return 100.0;
        }
        100.0 * self.nb_detected as f64 / self.nb_faults as f64
    }

    /// Percentage of the faults that are either detected or proven untestable
    pub fn efficiency(&self) -> f64 {
        if self.nb_faults == 0 {
            return 100.0;
        }
        100.0 * (self.nb_detected + self.nb_untestable) as f64 / self.nb_faults as f64
    }
}

impl fmt::Display for AtpgReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} patterns, detecting {}/{} faults ({:.2}% coverage), {} untestable, {} aborted",
            self.nb_patterns,
            self.nb_detected,
            self.nb_faults,
            self.coverage(),
            self.nb_untestable,
            self.nb_aborted
        )
    }
}

/// Handling of the actual test pattern generation
pub struct TestPatternGenerator<'a, S = KissatSolver> {
    net: &'a Network,
    graph: &'a SimGraph,
    fsim: Fsim<'a>,
    fsim3: Fsim3<'a>,
    dtpg: DtpgSat<S>,
    faults: Vec<Fault>,
    patterns: Vec<TestVector>,
    rng: SmallRng,
    config: AtpgConfig,
}

impl<'a> TestPatternGenerator<'a> {
    /// Initialize the generator; the graph must be built from the network
    pub fn new(net: &'a Network, graph: &'a SimGraph, config: &AtpgConfig) -> Self {
        Self::with_backend(net, graph, config)
    }
}

impl<'a, S: SatSolver + Default> TestPatternGenerator<'a, S> {
    /// Initialize the generator with another SAT backend
    pub fn with_backend(net: &'a Network, graph: &'a SimGraph, config: &AtpgConfig) -> Self {
        let faults = if config.all_faults {
            Fault::all(net)
        } else {
            Fault::all_unique(net)
        };
        let mut fsim = Fsim::new(graph);
        fsim.set_faults(&faults);
        TestPatternGenerator {
            net,
            graph,
            fsim,
            fsim3: Fsim3::new(graph),
            dtpg: DtpgSat::new(),
            faults,
            patterns: Vec::new(),
            rng: SmallRng::seed_from_u64(config.seed),
            config: config.clone(),
        }
    }

    /// Targeted faults
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    /// Number of targeted faults
    pub fn nb_faults(&self) -> usize {
        self.faults.len()
    }

    /// Number of patterns kept so far
    pub fn nb_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Current pattern set
    pub fn patterns(&self) -> &[TestVector] {
        &self.patterns
    }

    /// Consume the generator and return the pattern set
    pub fn into_patterns(self) -> Vec<TestVector> {
        self.patterns
    }

    /// Current status of a targeted fault
    pub fn status(&self, fault: &Fault) -> FaultStatus {
        self.fsim.status(fault).unwrap_or_default()
    }

    /// Summary of the current state
    pub fn report(&self) -> AtpgReport {
        let mut ret = AtpgReport {
            nb_faults: self.nb_faults(),
            nb_patterns: self.nb_patterns(),
            ..Default::default()
        };
        for f in &self.faults {
            match self.status(f) {
                FaultStatus::Detected => ret.nb_detected += 1,
                FaultStatus::Untestable => ret.nb_untestable += 1,
                FaultStatus::Aborted => ret.nb_aborted += 1,
                FaultStatus::Undetected => (),
            }
        }
        ret
    }

    fn update_progress(&self, progress: &mut Bar) -> Result<()> {
        let r = self.report();
        progress.set_postfix(format!(
            "patterns={} untestable={} aborted={}",
            r.nb_patterns, r.nb_untestable, r.nb_aborted
        ));
        progress.update_to(r.nb_detected + r.nb_untestable + r.nb_aborted)?;
        Ok(())
    }

    /// Simulate a batch of random patterns, and keep those that detect new faults
    ///
    /// Returns the number of newly detected faults.
    pub fn add_random_patterns(&mut self) -> usize {
        let nb_inputs = self.net.nb_inputs();
        let tvs: Vec<TestVector> = (0..NB_LANES)
            .map(|_| random_pattern(nb_inputs, &mut self.rng))
            .collect();
        let detections = self.fsim.run_batch(&tvs);
        let mut gain = 0;
        for (tv, det) in tvs.into_iter().zip(detections) {
            if !det.is_empty() {
                gain += det.len();
                self.patterns.push(tv);
            }
        }
        gain
    }

    /// Generate a test for a fault with the SAT solver
    ///
    /// On success, unknown inputs are filled randomly and the vector is simulated to drop
    /// every other fault it detects. Otherwise the fault is marked untestable or aborted.
    pub fn add_pattern_for(&mut self, fault: &Fault) -> DtpgStatus {
        let mut tv = TestVector::new(self.net.nb_inputs());
        match self.dtpg.run(self.net, fault, &mut tv) {
            DtpgStatus::Detected => {
                if !self.fsim3.run_fault(&tv, fault) {
                    warn!("Vector {tv} generated for {fault} does not detect it");
                    self.fsim.set_status(fault, FaultStatus::Aborted);
                    return DtpgStatus::Aborted;
                }
                tv.fill_x_random(&mut self.rng);
                let detected = self.fsim.run(&tv);
                if !detected.contains(fault) {
                    warn!("Filled vector {tv} does not detect {fault}");
                    self.fsim.set_status(fault, FaultStatus::Aborted);
                    return DtpgStatus::Aborted;
                }
                self.patterns.push(tv);
                DtpgStatus::Detected
            }
            DtpgStatus::Untestable => {
                self.fsim.set_status(fault, FaultStatus::Untestable);
                DtpgStatus::Untestable
            }
            DtpgStatus::Aborted => {
                self.fsim.set_status(fault, FaultStatus::Aborted);
                DtpgStatus::Aborted
            }
        }
    }

    /// Faults detected by each pattern, without fault dropping
    fn pattern_detections(&self, detected: &[Fault]) -> Vec<Vec<Fault>> {
        let mut fsim = Fsim::new(self.graph);
        fsim.set_faults(detected);
        let mut ret = Vec::with_capacity(self.nb_patterns());
        for tv in &self.patterns {
            for f in detected {
                fsim.set_status(f, FaultStatus::Undetected);
            }
            ret.push(fsim.run(tv));
        }
        ret
    }

    /// Compress the existing patterns to keep as few as possible.
    /// This is a minimum set cover problem.
    /// At the moment we solve it with a simple greedy algorithm,
    /// taking the pattern that detects the most new faults each time.
    pub fn compress_patterns(&mut self) {
        let detected: Vec<Fault> = self
            .faults
            .iter()
            .filter(|f| self.status(f) == FaultStatus::Detected)
            .copied()
            .collect();
        let index: FxHashMap<Fault, usize> =
            detected.iter().enumerate().map(|(i, f)| (*f, i)).collect();

        // Which faults are detected by a given pattern
        let pattern_to_faults: Vec<Vec<usize>> = self
            .pattern_detections(&detected)
            .iter()
            .map(|v| v.iter().map(|f| index[f]).collect())
            .collect();

        // Which patterns detect a given fault
        let mut fault_to_patterns = vec![Vec::new(); detected.len()];
        for (p, faults) in pattern_to_faults.iter().enumerate() {
            for f in faults {
                fault_to_patterns[*f].push(p);
            }
        }
        let mut remaining_to_detect = fault_to_patterns.iter().filter(|v| !v.is_empty()).count();

        // How many new faults each pattern detects
        let mut nb_detected_by_pattern: Vec<usize> =
            pattern_to_faults.iter().map(|v| v.len()).collect();

        let mut selected_patterns = Vec::new();
        while remaining_to_detect > 0 {
            // Pick the pattern that detects the most faults
            let Some((best_pattern, &nb)) = nb_detected_by_pattern
                .iter()
                .enumerate()
                .max_by_key(|(_, n)| **n)
            else {
                break;
            };
            assert!(nb > 0);
            selected_patterns.push(best_pattern);
            remaining_to_detect -= nb;

            // Remove the faults detected by the pattern from consideration
            for f in &pattern_to_faults[best_pattern] {
                for p in &fault_to_patterns[*f] {
                    nb_detected_by_pattern[*p] -= 1;
                }
                // So we don't remove a fault twice
                fault_to_patterns[*f].clear();
            }
            assert_eq!(nb_detected_by_pattern[best_pattern], 0);
        }

        self.patterns = selected_patterns
            .iter()
            .map(|p| self.patterns[*p].clone())
            .collect();
    }

    /// Run the whole flow and return the final report
    pub fn run(&mut self) -> Result<AtpgReport> {
        let mut progress = tqdm!(total = self.nb_faults());
        progress.set_description("Faults processed");
        progress.write(format!(
            "Analyzing network with {} inputs, {} outputs and {} possible faults",
            self.net.nb_inputs(),
            self.net.nb_outputs(),
            self.nb_faults(),
        ))?;

        while self.fsim.nb_remaining() > 0 {
            let gain = self.add_random_patterns();
            self.update_progress(&mut progress)?;
            if (gain as f64) < self.config.min_random_gain * self.nb_faults() as f64 {
                break;
            }
        }
        info!("Random patterns: {}", self.report());

        // The report walks the whole fault list: refresh the bar about a hundred times
        let refresh = (self.nb_faults() / 100).max(1);
        for (k, f) in self.fsim.remaining_faults().into_iter().enumerate() {
            // Detected as a side effect of an earlier vector
            if self.status(&f) == FaultStatus::Undetected {
                self.add_pattern_for(&f);
            }
            if k % refresh == 0 {
                self.update_progress(&mut progress)?;
            }
        }
        self.update_progress(&mut progress)?;
        info!("Deterministic patterns: {}", self.report());

        if self.config.compress {
            self.compress_patterns();
        }
        let report = self.report();
        progress.write(format!("Kept {report}"))?;
        Ok(report)
    }
}

/// Generate combinatorial test patterns
///
/// This will generate random test patterns, then try to exercize the remaining faults
/// using a SAT solver.
pub fn generate_test_patterns(
    net: &Network,
    config: &AtpgConfig,
) -> Result<(Vec<TestVector>, AtpgReport)> {
    let graph = SimGraph::build(net);
    let mut gen = TestPatternGenerator::new(net, &graph, config);
    let report = gen.run()?;
    Ok((gen.into_patterns(), report))
}
