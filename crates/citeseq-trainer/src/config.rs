//! Training configuration.

use std::fs;
use std::path::Path;

use citeseq_core::Result;
use serde::{Deserialize, Serialize};

/// Options for a training run.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Upper bound on passes over the dataset.
    pub max_iterations: usize,
    /// Stop once a pass's total update magnitude is at or below this.
    pub convergence_threshold: f64,
    /// L2 shrink applied to the weights, in `[0, 1)`.
    ///
    /// The shrink is applied once at the end of every pass, not after each
    /// individual update. The averaging accumulators are scaled with the
    /// weights, so averaged and final weights shrink alike.
    pub regularization: f64,
    /// Shuffle the dataset before each pass with this seed. `None` keeps
    /// corpus order.
    pub seed: Option<u64>,
    /// Return the averaged weights instead of the final ones.
    pub averaged: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 0.0,
            regularization: 0.0,
            seed: None,
            averaged: true,
        }
    }
}

impl TrainConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Set the maximum number of passes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold. Negative values are treated as zero.
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold.max(0.0);
        self
    }

    /// Set the per-pass L2 shrink.
    pub fn with_regularization(mut self, strength: f64) -> Self {
        self.regularization = strength.clamp(0.0, 0.999);
        self
    }

    /// Set (or clear) the shuffling seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable weight averaging.
    pub fn with_averaging(mut self, averaged: bool) -> Self {
        self.averaged = averaged;
        self
    }
}
