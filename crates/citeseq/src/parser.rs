//! Reference parser: labels the fields of reference strings, one per line.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use citeseq_core::{
    CiteseqError, Dataset, FeatureSet, FieldSegmenter, LinearChainModel, Reference, Result,
    Sequence, Tagger, Tokenizer,
};
use citeseq_trainer::{TrainConfig, Trainer, TrainingReport};
use tracing::{debug, info};

/// Trainable field labeler for bibliographic references.
///
/// A parser starts without a model; [`train`](Self::train) or
/// [`load`](Self::load) gives it one.
#[derive(Debug, Clone, Default)]
pub struct ReferenceParser {
    config: TrainConfig,
    tagger: Option<Tagger<FieldSegmenter>>,
}

impl ReferenceParser {
    /// An untrained parser that will train with `config`.
    pub fn new(config: TrainConfig) -> Self {
        Self {
            config,
            tagger: None,
        }
    }

    /// A parser using an existing model.
    pub fn from_model(model: LinearChainModel) -> Result<Self> {
        let mut parser = Self::default();
        parser.install(Arc::new(model))?;
        Ok(parser)
    }

    /// A parser using the model stored at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_model(LinearChainModel::load(path)?)
    }

    /// Train a new model on `dataset`, replacing the current one.
    pub fn train(&mut self, dataset: &Dataset) -> Result<Arc<LinearChainModel>> {
        self.train_with_report(dataset)?;
        self.tagger().map(|t| Arc::clone(t.model()))
    }

    /// Like [`train`](Self::train), returning what happened during training.
    pub fn train_with_report(&mut self, dataset: &Dataset) -> Result<TrainingReport> {
        let (model, report) =
            Trainer::new(self.config.clone()).train_with_report(dataset, FeatureSet::reference())?;
        info!(
            iterations = report.iterations,
            converged = report.converged,
            "parser model trained"
        );
        self.install(Arc::new(model))?;
        Ok(report)
    }

    /// The current model, if any.
    pub fn model(&self) -> Option<&Arc<LinearChainModel>> {
        self.tagger.as_ref().map(Tagger::model)
    }

    /// Parse a file of references, one per line.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Reference>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let references = self.parse_str(&text)?;
        debug!(path = %path.display(), references = references.len(), "parsed file");
        Ok(references)
    }

    /// Parse references from text, one per non-blank line.
    pub fn parse_str(&self, text: &str) -> Result<Vec<Reference>> {
        let tagger = self.tagger()?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| tagger.segment(line))
            .collect()
    }

    /// Label every sequence of `dataset`, ignoring any labels it carries.
    pub fn label(&self, dataset: &Dataset) -> Result<Dataset> {
        let tagger = self.tagger()?;
        dataset
            .iter()
            .map(|sequence| -> Result<Sequence> {
                let labels = tagger.tag(&sequence.tokens)?;
                Ok(Sequence::labeled(sequence.tokens.clone(), labels))
            })
            .collect()
    }

    fn tagger(&self) -> Result<&Tagger<FieldSegmenter>> {
        self.tagger
            .as_ref()
            .ok_or_else(|| CiteseqError::ModelLoad("parser has no model, train or load one".to_string()))
    }

    fn install(&mut self, model: Arc<LinearChainModel>) -> Result<()> {
        self.tagger = Some(Tagger::new(model, Tokenizer::Words, FieldSegmenter)?);
        Ok(())
    }
}
