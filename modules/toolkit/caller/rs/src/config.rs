use ahash::HashSet;
use bitcode::{Decode, Encode};
use derive_getters::Getters;
use diffpeak_core_rs::parallelism;
use eyre::{ensure, eyre, Result};

use crate::replicate::ReplicateSpec;
use crate::Error;

/// Multiple-testing correction applied to per-replicate and combined p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub enum QValueMethod {
    #[default]
    Holm,
    StoreySimple,
    StoreyBootstrap,
}

/// How Construction splits the genome into units of parallel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub enum ConstructionStrategy {
    /// Fixed-size runs of windows, each unit streams all datasets.
    #[default]
    Chunked,
    /// One unit per dataset and chromosome.
    PerContig,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct Config {
    replicates: Vec<ReplicateSpec>,
    window_size: u64,
    window_offset: u64,
    threads: usize,
    chunk_size: usize,
    strategy: ConstructionStrategy,
    qvalue_method: QValueMethod,
    cutoff: f64,
    fit_weights: bool,
    correlation: bool,
    quality_counting: bool,
    histogram_max_count: usize,
    bootstrap_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            replicates: Vec::new(),
            window_size: 200,
            window_offset: 50,
            threads: 1,
            chunk_size: 10_000,
            strategy: ConstructionStrategy::default(),
            qvalue_method: QValueMethod::default(),
            cutoff: 1e-5,
            fit_weights: false,
            correlation: true,
            quality_counting: false,
            histogram_max_count: 100,
            bootstrap_seed: 42,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_replicate(&mut self, replicate: ReplicateSpec) -> Result<&mut Self> {
        ensure!(
            self.replicates.iter().all(|x| x.name() != replicate.name()),
            "Replicate {} is already registered",
            replicate.name()
        );
        self.replicates.push(replicate);
        Ok(self)
    }

    pub fn replicate_mut(&mut self, index: usize) -> Result<&mut ReplicateSpec> {
        let total = self.replicates.len();
        self.replicates
            .get_mut(index)
            .ok_or_else(|| eyre!("Replicate index {index} is out of bounds ({total} replicates)"))
    }

    pub fn set_window(&mut self, size: u64, offset: u64) -> Result<&mut Self> {
        ensure!(size > 0, "Window size must be positive");
        ensure!(offset > 0, "Window offset must be positive");
        ensure!(
            offset <= size,
            "Window offset ({offset}) can't exceed the window size ({size})"
        );
        self.window_size = size;
        self.window_offset = offset;
        Ok(self)
    }

    /// Positive values are capped by the number of cores, negative values are subtracted from it.
    pub fn set_threads(&mut self, threads: isize) -> Result<&mut Self> {
        self.threads = parallelism::available(threads)?;
        Ok(self)
    }

    pub fn set_chunk_size(&mut self, windows: usize) -> Result<&mut Self> {
        ensure!(windows > 0, "Chunk size must be positive");
        self.chunk_size = windows;
        Ok(self)
    }

    pub fn set_strategy(&mut self, strategy: ConstructionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    pub fn set_qvalue_method(&mut self, method: QValueMethod) -> &mut Self {
        self.qvalue_method = method;
        self
    }

    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<&mut Self> {
        ensure!(
            cutoff > 0.0 && cutoff <= 1.0,
            "Significance cutoff must be in (0, 1], got {cutoff}"
        );
        self.cutoff = cutoff;
        Ok(self)
    }

    pub fn set_fit_weights(&mut self, fit_weights: bool) -> &mut Self {
        self.fit_weights = fit_weights;
        self
    }

    pub fn set_correlation(&mut self, correlation: bool) -> &mut Self {
        self.correlation = correlation;
        self
    }

    pub fn set_quality_counting(&mut self, quality_counting: bool) -> &mut Self {
        self.quality_counting = quality_counting;
        self
    }

    pub fn set_histogram_max_count(&mut self, max: usize) -> Result<&mut Self> {
        ensure!(max > 0, "Histogram must have at least two bins");
        self.histogram_max_count = max;
        Ok(self)
    }

    pub fn set_bootstrap_seed(&mut self, seed: u64) -> &mut Self {
        self.bootstrap_seed = seed;
        self
    }

    /// Dataset paths ordered by tag id: experiment of the i-th replicate is 2i, background is 2i+1.
    pub fn datasets(&self) -> Vec<(usize, &str)> {
        self.replicates
            .iter()
            .enumerate()
            .flat_map(|(ind, rep)| {
                let (exp, bg) = ReplicateSpec::tags(ind);
                [(exp, rep.experiment().as_str()), (bg, rep.background().as_str())]
            })
            .collect()
    }

    /// Check everything a job needs before any work starts.
    pub fn validate(&self) -> Result<(), Error> {
        let fail = |msg: String| Err(Error::Configuration(msg));

        if self.replicates.is_empty() {
            return fail("at least one replicate is required".into());
        }
        let mut names = HashSet::default();
        for rep in &self.replicates {
            if rep.name().is_empty() {
                return fail("replicate name can't be empty".into());
            }
            if !names.insert(rep.name().as_str()) {
                return fail(format!("duplicated replicate name: {}", rep.name()));
            }
            if rep.experiment().is_empty() || rep.background().is_empty() {
                return fail(format!("replicate {} is missing a dataset path", rep.name()));
            }
            if let Some(weight) = rep.weight() {
                if !weight.is_finite() || *weight < 0.0 {
                    return fail(format!("replicate {} has invalid weight", rep.name()));
                }
            }
        }

        if self.window_size == 0 {
            return fail("window size must be positive".into());
        }
        if self.window_offset == 0 || self.window_offset > self.window_size {
            return fail(format!(
                "window offset must be in [1, {}], got {}",
                self.window_size, self.window_offset
            ));
        }
        if self.threads == 0 || self.chunk_size == 0 || self.histogram_max_count == 0 {
            return fail("threads, chunk size and histogram size must be positive".into());
        }
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return fail(format!("significance cutoff must be in (0, 1], got {}", self.cutoff));
        }
        Ok(())
    }
}
