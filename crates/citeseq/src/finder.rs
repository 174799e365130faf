//! Reference finder: locates the reference lines of a plain-text document.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use citeseq_core::{
    CiteseqError, Dataset, FeatureSet, LinearChainModel, ReferenceSpan, Result, SpanSegmenter,
    Tagger, Tokenizer,
};
use citeseq_trainer::{TrainConfig, Trainer, TrainingReport};
use tracing::{debug, info};

/// Trainable line labeler that picks reference blocks out of documents.
///
/// A finder starts without a model; [`train`](Self::train) or
/// [`load`](Self::load) gives it one.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFinder {
    config: TrainConfig,
    tagger: Option<Tagger<SpanSegmenter>>,
}

impl ReferenceFinder {
    /// An untrained finder that will train with `config`.
    pub fn new(config: TrainConfig) -> Self {
        Self {
            config,
            tagger: None,
        }
    }

    /// A finder using an existing model.
    pub fn from_model(model: LinearChainModel) -> Result<Self> {
        let mut finder = Self::default();
        finder.install(Arc::new(model))?;
        Ok(finder)
    }

    /// A finder using the model stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_model(LinearChainModel::load(path)?)
    }

    /// Train on tagged `.ttx` documents, one sequence per file.
    pub fn train<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Arc<LinearChainModel>> {
        let dataset = Dataset::open_ttx(paths)?;
        self.train_with_report(&dataset)?;
        self.model()
            .cloned()
            .ok_or_else(|| CiteseqError::ModelLoad("finder has no model".to_string()))
    }

    /// Train on already loaded line sequences.
    pub fn train_with_report(&mut self, dataset: &Dataset) -> Result<TrainingReport> {
        let (model, report) =
            Trainer::new(self.config.clone()).train_with_report(dataset, FeatureSet::document())?;
        info!(
            documents = dataset.len(),
            iterations = report.iterations,
            converged = report.converged,
            "finder model trained"
        );
        self.install(Arc::new(model))?;
        Ok(report)
    }

    /// The current model, if any.
    pub fn model(&self) -> Option<&Arc<LinearChainModel>> {
        self.tagger.as_ref().map(Tagger::model)
    }

    /// Reference blocks of the document at `path`.
    pub fn find<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ReferenceSpan>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let spans = self.find_str(&text)?;
        debug!(path = %path.display(), spans = spans.len(), "searched document");
        Ok(spans)
    }

    /// Reference blocks of `document`.
    pub fn find_str(&self, document: &str) -> Result<Vec<ReferenceSpan>> {
        let tagger = self
            .tagger
            .as_ref()
            .ok_or_else(|| CiteseqError::ModelLoad("finder has no model, train or load one".to_string()))?;
        tagger.segment(document)
    }

    fn install(&mut self, model: Arc<LinearChainModel>) -> Result<()> {
        self.tagger = Some(Tagger::new(model, Tokenizer::Lines, SpanSegmenter::default())?);
        Ok(())
    }
}
