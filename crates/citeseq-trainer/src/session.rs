//! Mutable state of one training run.
//!
//! The session owns the working weights and the averaging accumulators;
//! nothing else can touch them until [`TrainingSession::into_weights`]
//! hands the result over.

use citeseq_core::crf::WeightTables;
use citeseq_core::Result;
use oorandom::Rand32;

/// Figures collected over one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassMetrics {
    /// 1-based pass number.
    pub iteration: usize,
    /// L1 norm of all updates applied during the pass.
    pub update_magnitude: f64,
    /// Sum of `score(predicted) - score(gold)` over mislabeled sequences.
    pub loss: f64,
    /// Sequences the current weights mislabeled.
    pub mistakes: usize,
}

pub struct TrainingSession {
    weights: WeightTables,
    accumulators: WeightTables,
    /// Step counter for lazy averaging, starts at 1.
    steps: f64,
    iteration: usize,
    rng: Option<Rand32>,
    current: PassMetrics,
    history: Vec<PassMetrics>,
}

impl TrainingSession {
    pub fn new(num_features: usize, num_labels: usize, seed: Option<u64>) -> Self {
        Self {
            weights: WeightTables::new(num_features, num_labels),
            accumulators: WeightTables::new(num_features, num_labels),
            steps: 1.0,
            iteration: 0,
            rng: seed.map(Rand32::new),
            current: PassMetrics {
                iteration: 0,
                update_magnitude: 0.0,
                loss: 0.0,
                mistakes: 0,
            },
            history: Vec::new(),
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn history(&self) -> &[PassMetrics] {
        &self.history
    }

    pub fn weights(&self) -> &WeightTables {
        &self.weights
    }

    /// Start a pass and return the order to visit `len` sequences in.
    pub fn begin_pass(&mut self, len: usize) -> Vec<usize> {
        self.iteration += 1;
        self.current = PassMetrics {
            iteration: self.iteration,
            update_magnitude: 0.0,
            loss: 0.0,
            mistakes: 0,
        };

        let mut order: Vec<usize> = (0..len).collect();
        if let Some(rng) = self.rng.as_mut() {
            for i in (1..len).rev() {
                let j = rng.rand_range(0..(i as u32 + 1)) as usize;
                order.swap(i, j);
            }
        }
        order
    }

    /// Train on one sequence.
    pub fn step(&mut self, observation: &[Vec<usize>], gold: &[usize]) -> Result<()> {
        let update = self.weights.gradient(observation, gold)?;
        if !update.is_empty() {
            self.weights.apply(&update, 1.0);
            self.accumulators.apply(&update, self.steps);
            self.current.update_magnitude += update.magnitude();
            self.current.loss += update.loss;
            self.current.mistakes += 1;
        }
        self.steps += 1.0;
        Ok(())
    }

    /// Close the pass, shrinking the weights by `regularization`.
    pub fn end_pass(&mut self, regularization: f64) -> PassMetrics {
        if regularization > 0.0 {
            let factor = 1.0 - regularization;
            self.weights.scale(factor);
            self.accumulators.scale(factor);
        }
        self.history.push(self.current);
        self.current
    }

    /// Final weight tables, averaged over every step if requested.
    pub fn into_weights(self, averaged: bool) -> WeightTables {
        if averaged {
            self.weights.subtract_scaled(&self.accumulators, self.steps)
        } else {
            self.weights
        }
    }
}
