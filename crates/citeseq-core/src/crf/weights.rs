//! # Weight Tables
//!
//! Dense emission (`feature * num_labels + label`) and transition
//! (`prev * num_labels + next`) weights, plus everything that reads them:
//! sequence scoring, decoding, marginals and the perceptron gradient.
//!
//! An *observation* is the feature-id list of every token, as produced by
//! [`LinearChainModel::observe`](super::LinearChainModel::observe).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;
use super::viterbi::ViterbiDecoder;
use crate::error::{CiteseqError, Result};

/// Weight adjustment produced by [`WeightTables::gradient`].
///
/// Keys are `(feature, label)` for emissions and `(prev, next)` for
/// transitions. Ordered maps keep application order deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub emission: BTreeMap<(usize, usize), f64>,
    pub transition: BTreeMap<(usize, usize), f64>,
    /// `score(predicted) - score(gold)`, never negative.
    pub loss: f64,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.emission.is_empty() && self.transition.is_empty()
    }

    /// L1 norm of the adjustment.
    pub fn magnitude(&self) -> f64 {
        self.emission
            .values()
            .chain(self.transition.values())
            .map(|v| v.abs())
            .sum()
    }
}

fn bump(map: &mut BTreeMap<(usize, usize), f64>, key: (usize, usize), delta: f64) {
    let value = map.entry(key).or_insert(0.0);
    *value += delta;
    if *value == 0.0 {
        map.remove(&key);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTables {
    num_labels: usize,
    emission: Vec<f64>,
    transition: Vec<f64>,
}

impl WeightTables {
    /// All-zero tables.
    pub fn new(num_features: usize, num_labels: usize) -> Self {
        Self {
            num_labels,
            emission: vec![0.0; num_features * num_labels],
            transition: vec![0.0; num_labels * num_labels],
        }
    }

    /// Assemble tables from raw vectors, checking their sizes.
    pub fn from_parts(num_labels: usize, emission: Vec<f64>, transition: Vec<f64>) -> Result<Self> {
        if num_labels == 0 {
            if emission.is_empty() && transition.is_empty() {
                return Ok(Self::new(0, 0));
            }
            return Err(CiteseqError::Decode(
                "weights present for an empty label set".to_string(),
            ));
        }
        if emission.len() % num_labels != 0 {
            return Err(CiteseqError::Decode(format!(
                "emission table of {} entries is not a multiple of {num_labels} labels",
                emission.len()
            )));
        }
        if transition.len() != num_labels * num_labels {
            return Err(CiteseqError::Decode(format!(
                "transition table has {} entries, expected {}",
                transition.len(),
                num_labels * num_labels
            )));
        }
        Ok(Self {
            num_labels,
            emission,
            transition,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    pub fn num_features(&self) -> usize {
        if self.num_labels == 0 {
            0
        } else {
            self.emission.len() / self.num_labels
        }
    }

    pub fn emission_table(&self) -> &[f64] {
        &self.emission
    }

    pub fn transition_table(&self) -> &[f64] {
        &self.transition
    }

    pub fn emission(&self, feature: usize, label: usize) -> f64 {
        self.emission[feature * self.num_labels + label]
    }

    pub fn transition(&self, prev: usize, next: usize) -> f64 {
        self.transition[prev * self.num_labels + next]
    }

    /// Per-token, per-label emission scores.
    pub fn emission_scores(&self, observation: &[Vec<usize>]) -> Vec<Vec<f64>> {
        let n = self.num_labels;
        observation
            .iter()
            .map(|features| {
                let mut row = vec![0.0; n];
                for &f in features {
                    let weights = &self.emission[f * n..(f + 1) * n];
                    for (score, w) in row.iter_mut().zip(weights) {
                        *score += w;
                    }
                }
                row
            })
            .collect()
    }

    /// Total score of one labeling: emissions plus adjacent transitions.
    ///
    /// # Panics
    ///
    /// Panics if `labels` is shorter than `observation` or holds an
    /// out-of-range code.
    pub fn score(&self, observation: &[Vec<usize>], labels: &[usize]) -> f64 {
        let mut total = 0.0;
        for (t, features) in observation.iter().enumerate() {
            let label = labels[t];
            total += features.iter().map(|&f| self.emission(f, label)).sum::<f64>();
            if t > 0 {
                total += self.transition(labels[t - 1], label);
            }
        }
        total
    }

    /// Best labeling by Viterbi; empty for an empty observation.
    pub fn decode(&self, observation: &[Vec<usize>]) -> Result<Vec<usize>> {
        if observation.is_empty() {
            return Ok(Vec::new());
        }
        let scores = self.emission_scores(observation);
        ViterbiDecoder::new(self.num_labels).decode(&scores, &self.transition)
    }

    /// Per-token label posteriors by forward-backward.
    pub fn marginals(&self, observation: &[Vec<usize>]) -> Vec<Vec<f64>> {
        let scores = self.emission_scores(observation);
        Lattice::new(&scores, &self.transition, self.num_labels).marginals()
    }

    /// Structured perceptron update for one example.
    ///
    /// Decodes with the current weights; if the prediction differs from
    /// `gold`, rewards the gold features/transitions and penalizes the
    /// predicted ones at every position where they disagree.
    pub fn gradient(&self, observation: &[Vec<usize>], gold: &[usize]) -> Result<Update> {
        if gold.len() != observation.len() {
            return Err(CiteseqError::TrainingData(format!(
                "{} gold labels for {} tokens",
                gold.len(),
                observation.len()
            )));
        }
        let predicted = self.decode(observation)?;
        if predicted == gold {
            return Ok(Update::default());
        }

        let mut update = Update {
            loss: self.score(observation, &predicted) - self.score(observation, gold),
            ..Update::default()
        };

        for (t, features) in observation.iter().enumerate() {
            let (g, p) = (gold[t], predicted[t]);
            if g != p {
                for &f in features {
                    bump(&mut update.emission, (f, g), 1.0);
                    bump(&mut update.emission, (f, p), -1.0);
                }
            }
            if t > 0 {
                let gold_pair = (gold[t - 1], g);
                let pred_pair = (predicted[t - 1], p);
                if gold_pair != pred_pair {
                    bump(&mut update.transition, gold_pair, 1.0);
                    bump(&mut update.transition, pred_pair, -1.0);
                }
            }
        }

        Ok(update)
    }

    /// Add `scale * update` to the weights.
    pub fn apply(&mut self, update: &Update, scale: f64) {
        let n = self.num_labels;
        for (&(f, l), &delta) in &update.emission {
            self.emission[f * n + l] += scale * delta;
        }
        for (&(p, q), &delta) in &update.transition {
            self.transition[p * n + q] += scale * delta;
        }
    }

    /// Multiply every weight by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.emission.iter_mut().for_each(|w| *w *= factor);
        self.transition.iter_mut().for_each(|w| *w *= factor);
    }

    /// `self - other / divisor`, element-wise. Used to fold averaging
    /// accumulators back into the weights.
    pub fn subtract_scaled(&self, other: &WeightTables, divisor: f64) -> WeightTables {
        let combine = |a: &[f64], b: &[f64]| -> Vec<f64> {
            a.iter().zip(b).map(|(x, y)| x - y / divisor).collect()
        };
        WeightTables {
            num_labels: self.num_labels,
            emission: combine(&self.emission, &other.emission),
            transition: combine(&self.transition, &other.transition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> WeightTables {
        // 3 features, 2 labels
        let emission = vec![1.0, -1.0, 0.0, 2.0, 0.5, 0.5];
        let transition = vec![0.25, -0.5, 0.0, 1.0];
        WeightTables::from_parts(2, emission, transition).unwrap()
    }

    #[test]
    fn test_score_sums_emissions_and_transitions() {
        let weights = tables();
        let observation = vec![vec![0, 2], vec![1]];
        // label 0: 1.0 + 0.5, then label 1: 2.0, transition 0->1: -0.5
        assert!((weights.score(&observation, &[0, 1]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_picks_best_path() {
        let weights = tables();
        let observation = vec![vec![0], vec![1], vec![1]];
        let path = weights.decode(&observation).unwrap();
        assert_eq!(path.len(), 3);
        let best = weights.score(&observation, &path);
        for a in 0..2 {
            for b in 0..2 {
                for c in 0..2 {
                    assert!(weights.score(&observation, &[a, b, c]) <= best + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_gradient_is_empty_when_correct() {
        let weights = tables();
        let observation = vec![vec![0], vec![1]];
        let gold = weights.decode(&observation).unwrap();
        let update = weights.gradient(&observation, &gold).unwrap();
        assert!(update.is_empty());
        assert_eq!(update.loss, 0.0);
    }

    #[test]
    fn test_gradient_moves_toward_gold() {
        let mut weights = WeightTables::new(2, 2);
        let observation = vec![vec![0], vec![1]];
        let gold = vec![1, 1];

        let update = weights.gradient(&observation, &gold).unwrap();
        // all-zero weights decode to [0, 0]
        assert_eq!(update.emission.get(&(0, 1)), Some(&1.0));
        assert_eq!(update.emission.get(&(0, 0)), Some(&-1.0));
        assert_eq!(update.transition.get(&(1, 1)), Some(&1.0));
        assert_eq!(update.transition.get(&(0, 0)), Some(&-1.0));
        assert!(update.loss >= 0.0);
        assert_eq!(update.magnitude(), 6.0);

        weights.apply(&update, 1.0);
        assert_eq!(weights.decode(&observation).unwrap(), gold);
    }

    #[test]
    fn test_gradient_length_mismatch() {
        let weights = WeightTables::new(1, 2);
        let err = weights.gradient(&[vec![0]], &[0, 1]).unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));
    }

    #[test]
    fn test_marginals_are_distributions() {
        let weights = tables();
        let marginals = weights.marginals(&[vec![0], vec![1, 2], vec![2]]);
        assert_eq!(marginals.len(), 3);
        for row in marginals {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_parts_rejects_bad_sizes() {
        assert!(WeightTables::from_parts(2, vec![0.0; 3], vec![0.0; 4]).is_err());
        assert!(WeightTables::from_parts(2, vec![0.0; 4], vec![0.0; 3]).is_err());
    }
}
