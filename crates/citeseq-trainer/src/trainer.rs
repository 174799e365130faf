//! Averaged structured perceptron training loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use citeseq_core::crf::FeatureIndex;
use citeseq_core::{Dataset, FeatureSet, LabelAlphabet, LinearChainModel, Result};
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::session::{PassMetrics, TrainingSession};

/// Shared flag asking a running training to stop after the current pass.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened during a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Completed passes.
    pub iterations: usize,
    pub history: Vec<PassMetrics>,
    /// The last pass met the convergence threshold.
    pub converged: bool,
    /// The run ended because the stop signal was raised.
    pub stopped: bool,
    pub num_features: usize,
    pub num_labels: usize,
}

/// Fits a [`LinearChainModel`] to a labeled [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainConfig,
    stop: StopSignal,
}

/// A sequence mapped into model space.
struct Example {
    observation: Vec<Vec<usize>>,
    gold: Vec<usize>,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self {
            config,
            stop: StopSignal::new(),
        }
    }

    /// Watch `signal` between passes.
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.stop = signal;
        self
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train a model and discard the report.
    pub fn train(&self, dataset: &Dataset, feature_set: FeatureSet) -> Result<LinearChainModel> {
        self.train_with_report(dataset, feature_set)
            .map(|(model, _)| model)
    }

    /// Train a model on `dataset` using the templates of `feature_set`.
    ///
    /// Labels and features are numbered in the order they first appear in
    /// the corpus, so a fixed dataset and seed always produce the same
    /// weights.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::TrainingData` if the dataset is empty or a
    /// sequence is unlabeled or misaligned. Nothing is trained in that case.
    pub fn train_with_report(
        &self,
        dataset: &Dataset,
        feature_set: FeatureSet,
    ) -> Result<(LinearChainModel, TrainingReport)> {
        dataset.validate()?;

        let extractor = feature_set.extractor()?;
        let mut alphabet = LabelAlphabet::new();
        let mut features = FeatureIndex::new();
        let mut examples = Vec::with_capacity(dataset.len());

        for sequence in dataset {
            let labels = sequence.labels.as_deref().unwrap_or_default();
            let gold = labels
                .iter()
                .map(|label| alphabet.encode(label))
                .collect::<Result<Vec<_>>>()?;
            let observation = extractor
                .extract_all(&sequence.tokens)
                .iter()
                .map(|names| names.iter().map(|n| features.insert(n)).collect())
                .collect();
            examples.push(Example { observation, gold });
        }

        info!(
            sequences = dataset.len(),
            tokens = dataset.token_count(),
            labels = alphabet.len(),
            features = features.len(),
            "starting training"
        );
        debug!(labels = %alphabet, feature_set = %feature_set.name, "label alphabet");

        let mut session = TrainingSession::new(features.len(), alphabet.len(), self.config.seed);
        let mut converged = false;
        let mut stopped = false;

        while session.iteration() < self.config.max_iterations {
            if self.stop.is_stopped() {
                warn!(iteration = session.iteration(), "training stopped by signal");
                stopped = true;
                break;
            }

            for i in session.begin_pass(examples.len()) {
                let example = &examples[i];
                session.step(&example.observation, &example.gold)?;
            }
            let metrics = session.end_pass(self.config.regularization);

            debug!(
                iteration = metrics.iteration,
                update = metrics.update_magnitude,
                loss = metrics.loss,
                mistakes = metrics.mistakes,
                "pass complete"
            );

            if metrics.update_magnitude <= self.config.convergence_threshold {
                info!(iteration = metrics.iteration, "converged");
                converged = true;
                break;
            }
        }

        let report = TrainingReport {
            iterations: session.iteration(),
            history: session.history().to_vec(),
            converged,
            stopped,
            num_features: features.len(),
            num_labels: alphabet.len(),
        };
        let weights = session.into_weights(self.config.averaged);
        let model = LinearChainModel::new(alphabet, feature_set, features, weights)?;
        Ok((model, report))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use citeseq_core::{CiteseqError, Sequence};

    use super::*;

    fn seq(tokens: &[&str], labels: &[&str]) -> Sequence {
        Sequence::labeled(
            tokens.iter().map(|s| s.to_string()).collect(),
            labels.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn corpus() -> Dataset {
        Dataset::new(vec![
            seq(&["Smith,", "J.", "Parsing", "things."], &["author", "author", "title", "title"]),
            seq(&["Doe,", "A.", "Reading", "books."], &["author", "author", "title", "title"]),
            seq(
                &["Lee,", "K.", "(2001).", "Writing", "code."],
                &["author", "author", "date", "title", "title"],
            ),
            seq(&["Brown,", "R.", "(1999)."], &["author", "author", "date"]),
        ])
    }

    fn tag(model: &LinearChainModel, tokens: &[&str]) -> Vec<String> {
        let tokens: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let features = model.extractor().unwrap().extract_all(&tokens);
        let codes = model.decode(&model.observe(&features)).unwrap();
        model.labels(&codes).unwrap()
    }

    #[test]
    fn test_single_sequence_scenario() {
        let dataset = Dataset::new(vec![seq(&["Smith", ",", "J."], &["author"; 3])]);
        let (model, report) = Trainer::default()
            .train_with_report(&dataset, FeatureSet::reference())
            .unwrap();

        assert!(report.converged);
        assert_eq!(tag(&model, &["Smith", ",", "J."]), vec!["author"; 3]);
    }

    #[test]
    fn test_empty_dataset_fails_before_training() {
        let err = Trainer::default()
            .train(&Dataset::default(), FeatureSet::reference())
            .unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));
    }

    #[test]
    fn test_dataset_without_tokens_fails() {
        let dataset = Dataset::new(vec![seq(&[], &[]), seq(&[], &[])]);
        let err = Trainer::default()
            .train(&dataset, FeatureSet::reference())
            .unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let dataset = Dataset::new(vec![
            seq(&["a", "b"], &["x", "y"]),
            seq(&["c", "d"], &["x"]),
        ]);
        let err = Trainer::default()
            .train(&dataset, FeatureSet::reference())
            .unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));
    }

    #[test]
    fn test_convergence_is_reported() {
        let (model, report) = Trainer::default()
            .train_with_report(&corpus(), FeatureSet::reference())
            .unwrap();

        assert!(report.converged);
        assert!(!report.stopped);
        assert!(report.iterations < 100);
        assert!(report.history[0].update_magnitude > 0.0);
        assert_eq!(report.history.last().unwrap().update_magnitude, 0.0);
        assert_eq!(report.num_labels, 3);
        assert_eq!(model.alphabet().symbols(), ["author", "title", "date"]);
        assert_eq!(
            tag(&model, &["Smith,", "J.", "Parsing", "things."]),
            vec!["author", "author", "title", "title"]
        );
    }

    #[test]
    fn test_update_magnitude_never_grows_after_first_pass() {
        for seed in [None, Some(1), Some(2), Some(3)] {
            let config = TrainConfig::new().with_seed(seed);
            let (_, report) = Trainer::new(config)
                .train_with_report(&corpus(), FeatureSet::reference())
                .unwrap();

            assert!(report.converged, "seed {seed:?}");
            let magnitudes: Vec<f64> =
                report.history.iter().map(|m| m.update_magnitude).collect();
            assert!(
                magnitudes[1..].windows(2).all(|w| w[1] <= w[0]),
                "seed {seed:?}: {magnitudes:?}"
            );
        }
    }

    #[test]
    fn test_iteration_cap() {
        let config = TrainConfig::new().with_max_iterations(1);
        let (_, report) = Trainer::new(config)
            .train_with_report(&corpus(), FeatureSet::reference())
            .unwrap();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let config = TrainConfig::new().with_seed(Some(1234)).with_max_iterations(5);
        let a = Trainer::new(config.clone()).train(&corpus(), FeatureSet::reference()).unwrap();
        let b = Trainer::new(config).train(&corpus(), FeatureSet::reference()).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.features(), b.features());
    }

    #[test]
    fn test_parallel_trainings_share_nothing() {
        let handles: Vec<_> = (0..3)
            .map(|_| {
                thread::spawn(|| {
                    Trainer::default()
                        .train(&corpus(), FeatureSet::reference())
                        .unwrap()
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(models.windows(2).all(|w| w[0].weights() == w[1].weights()));
    }

    #[test]
    fn test_stop_signal() {
        let signal = StopSignal::new();
        signal.stop();
        let (model, report) = Trainer::default()
            .with_stop_signal(signal)
            .train_with_report(&corpus(), FeatureSet::reference())
            .unwrap();

        assert!(report.stopped);
        assert_eq!(report.iterations, 0);
        assert!(model.weights().emission_table().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_regularization_shrinks_weights() {
        let plain = TrainConfig::new().with_max_iterations(1).with_averaging(false);
        let shrunk = plain.clone().with_regularization(0.5);

        let a = Trainer::new(plain).train(&corpus(), FeatureSet::reference()).unwrap();
        let b = Trainer::new(shrunk).train(&corpus(), FeatureSet::reference()).unwrap();
        for (x, y) in a.weights().emission_table().iter().zip(b.weights().emission_table()) {
            assert_eq!(x * 0.5, *y);
        }
    }
}
