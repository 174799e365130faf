//! Forward-backward over the label lattice, computed in log space.

/// `log(sum(exp(x)))` without overflow.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Forward and backward tables for one sequence.
#[derive(Debug, Clone)]
pub struct Lattice {
    alpha: Vec<Vec<f64>>,
    beta: Vec<Vec<f64>>,
    log_z: f64,
}

impl Lattice {
    /// Fill the tables. `transitions` is the flat `[prev * n + next]` matrix.
    ///
    /// # Panics
    ///
    /// Panics if a row of `emissions` is shorter than `num_tags` or the
    /// transition table is smaller than `num_tags^2`.
    pub fn new(emissions: &[Vec<f64>], transitions: &[f64], num_tags: usize) -> Self {
        let len = emissions.len();
        let n = num_tags;
        let mut alpha = vec![vec![f64::NEG_INFINITY; n]; len];
        let mut beta = vec![vec![0.0; n]; len];

        if len == 0 {
            return Self {
                alpha,
                beta,
                log_z: 0.0,
            };
        }

        alpha[0].copy_from_slice(&emissions[0][..n]);
        let mut scratch = vec![0.0; n];
        for t in 1..len {
            for j in 0..n {
                for i in 0..n {
                    scratch[i] = alpha[t - 1][i] + transitions[i * n + j];
                }
                alpha[t][j] = log_sum_exp(&scratch) + emissions[t][j];
            }
        }

        for t in (0..len - 1).rev() {
            for i in 0..n {
                for j in 0..n {
                    scratch[j] = transitions[i * n + j] + emissions[t + 1][j] + beta[t + 1][j];
                }
                beta[t][i] = log_sum_exp(&scratch);
            }
        }

        let log_z = log_sum_exp(&alpha[len - 1]);
        Self { alpha, beta, log_z }
    }

    /// Log of the partition function over all label sequences.
    pub fn log_partition(&self) -> f64 {
        self.log_z
    }

    /// Posterior probability of each label at each position.
    pub fn marginals(&self) -> Vec<Vec<f64>> {
        self.alpha
            .iter()
            .zip(&self.beta)
            .map(|(a, b)| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| (x + y - self.log_z).exp())
                    .collect()
            })
            .collect()
    }
}
