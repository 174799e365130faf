//! # Viterbi Decoding
//!
//! Finds the highest-scoring label sequence given per-token emission scores
//! and a flat `[prev * num_tags + next]` transition table. Scores are
//! additive log-space weights, so long sequences cannot underflow.

use crate::error::{CiteseqError, Result};

/// Viterbi decoder for linear-chain label sequences.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
}

impl ViterbiDecoder {
    /// Create a new Viterbi decoder.
    ///
    /// # Arguments
    /// * `num_tags` - Number of distinct labels
    pub fn new(num_tags: usize) -> Self {
        Self { num_tags }
    }

    /// Decode the optimal tag sequence.
    ///
    /// Runs in `O(seq_len * num_tags^2)` time with an `O(seq_len * num_tags)`
    /// backpointer table. Ties are broken from the end of the sequence: the
    /// last tag is the lowest index among equal final scores, and each
    /// backpointer is the lowest index among equal predecessors. The result
    /// is therefore not the lexicographically smallest of the tied paths.
    ///
    /// # Arguments
    /// * `emission_scores` - Matrix of shape [seq_len, num_tags]
    /// * `transition_matrix` - Flat matrix of shape [num_tags * num_tags]
    ///
    /// # Returns
    /// The optimal tag sequence as indices; empty for empty input.
    pub fn decode(&self, emission_scores: &[Vec<f64>], transition_matrix: &[f64]) -> Result<Vec<usize>> {
        let seq_len = emission_scores.len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(emission_scores, transition_matrix)?;

        let n = self.num_tags;
        let mut dp: Vec<f64> = emission_scores[0].clone();
        let mut backptr: Vec<Vec<usize>> = vec![vec![0; n]; seq_len];

        // Forward pass
        for pos in 1..seq_len {
            let mut next = vec![f64::NEG_INFINITY; n];
            for curr_tag in 0..n {
                let mut best_score = f64::NEG_INFINITY;
                let mut best_prev = 0;

                for prev_tag in 0..n {
                    let score = dp[prev_tag] + transition_matrix[prev_tag * n + curr_tag];
                    if score > best_score {
                        best_score = score;
                        best_prev = prev_tag;
                    }
                }

                next[curr_tag] = best_score + emission_scores[pos][curr_tag];
                backptr[pos][curr_tag] = best_prev;
            }
            dp = next;
        }

        // Find best final tag
        let mut best_final_tag = 0;
        let mut best_final_score = f64::NEG_INFINITY;
        for (tag, &score) in dp.iter().enumerate() {
            if score > best_final_score {
                best_final_score = score;
                best_final_tag = tag;
            }
        }

        // Backtrack
        let mut path = Vec::with_capacity(seq_len);
        let mut curr_tag = best_final_tag;
        path.push(curr_tag);
        for pos in (1..seq_len).rev() {
            curr_tag = backptr[pos][curr_tag];
            path.push(curr_tag);
        }

        path.reverse();
        Ok(path)
    }

    fn check_dimensions(&self, emission_scores: &[Vec<f64>], transition_matrix: &[f64]) -> Result<()> {
        if self.num_tags == 0 {
            return Err(CiteseqError::Decode("label set is empty".to_string()));
        }
        if let Some(row) = emission_scores.iter().find(|row| row.len() != self.num_tags) {
            return Err(CiteseqError::Decode(format!(
                "emission score dimension mismatch: expected {}, got {}",
                self.num_tags,
                row.len()
            )));
        }
        if transition_matrix.len() != self.num_tags * self.num_tags {
            return Err(CiteseqError::Decode(format!(
                "transition matrix has {} entries, expected {}",
                transition_matrix.len(),
                self.num_tags * self.num_tags
            )));
        }
        Ok(())
    }
}
