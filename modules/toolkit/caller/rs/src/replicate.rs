use bitcode::{Decode, Encode};
use derive_getters::Getters;
use eyre::{ensure, Result};

use crate::stats::{BoxPlot, PValueHistogram};

/// User-facing description of a replicate: one experiment and one background dataset.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct ReplicateSpec {
    name: String,
    experiment: String,
    background: String,
    active: bool,
    weight: Option<f64>,
}

impl ReplicateSpec {
    pub fn new(
        name: impl Into<String>,
        experiment: impl Into<String>,
        background: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            experiment: experiment.into(),
            background: background.into(),
            active: true,
            weight: None,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        self.set_weight(Some(weight))?;
        Ok(self)
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        self.active = active;
        self
    }

    /// Explicit combination weight. `None` falls back to the fitted or the unit weight.
    pub fn set_weight(&mut self, weight: Option<f64>) -> Result<&mut Self> {
        if let Some(weight) = weight {
            ensure!(
                weight.is_finite() && weight >= 0.0,
                "Replicate weight must be a finite non-negative number, got {weight}"
            );
        }
        self.weight = weight;
        Ok(self)
    }

    /// Tag ids of the experiment and background datasets of the i-th replicate.
    pub fn tags(index: usize) -> (usize, usize) {
        (2 * index, 2 * index + 1)
    }
}

/// Library-level statistics of a single aligned-read dataset.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct Dataset {
    tag: usize,
    path: String,
    tags: u64,
    quality: Option<BoxPlot>,
    histogram: Vec<f64>,
    lambda_raw: f64,
    lambda_normalized: f64,
    distance: f64,
}

impl Dataset {
    pub fn new(tag: usize, path: String, tags: u64, quality: Option<BoxPlot>) -> Self {
        Self {
            tag,
            path,
            tags,
            quality,
            histogram: Vec::new(),
            lambda_raw: 0.0,
            lambda_normalized: 0.0,
            distance: 0.0,
        }
    }

    pub(crate) fn set_model(&mut self, histogram: Vec<f64>, lambda_raw: f64, distance: f64) {
        self.histogram = histogram;
        self.lambda_raw = lambda_raw;
        self.distance = distance;
    }

    pub(crate) fn set_lambda_normalized(&mut self, lambda: f64) {
        self.lambda_normalized = lambda;
    }
}

/// Number of windows passing the significance cutoff at each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Counters {
    pub experiment_raw: u64,
    pub background_raw: u64,
    pub corrected: u64,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, Getters)]
pub struct Replicate {
    name: String,
    active: bool,
    weight: f64,
    fit_weight: f64,
    scaling_factor: f64,
    experiment: Dataset,
    background: Dataset,
    counters: Counters,
    histogram: PValueHistogram,
    overlap: f64,
}

impl Replicate {
    pub fn new(spec: &ReplicateSpec, experiment: Dataset, background: Dataset) -> Self {
        Self {
            name: spec.name.clone(),
            active: spec.active,
            weight: 1.0,
            fit_weight: 1.0,
            scaling_factor: 1.0,
            experiment,
            background,
            counters: Counters::default(),
            histogram: PValueHistogram::default(),
            overlap: 0.0,
        }
    }

    /// Replicates take part in the combination only if active and positively weighted.
    pub fn participates(&self) -> bool {
        self.active && self.weight > 0.0
    }

    /// Weight precedence: explicit weight, fitted weight (if enabled), unit weight.
    pub(crate) fn resolve_weight(&mut self, spec: &ReplicateSpec, fit_weights: bool) {
        self.active = spec.active;
        self.weight = match (spec.weight, fit_weights) {
            (Some(weight), _) => weight,
            (None, true) => self.fit_weight,
            (None, false) => 1.0,
        };
    }

    pub(crate) fn set_scaling(&mut self, scaling_factor: f64, fit_weight: f64) {
        self.scaling_factor = scaling_factor;
        self.fit_weight = fit_weight;
    }

    pub(crate) fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub(crate) fn set_summary(&mut self, histogram: PValueHistogram, overlap: f64) {
        self.histogram = histogram;
        self.overlap = overlap;
    }
}
