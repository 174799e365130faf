//! # Tagger
//!
//! Runs a trained model over new input: tokenize, extract features, decode,
//! then hand the labels to a [`Segmenter`].

use std::sync::Arc;

use crate::crf::LinearChainModel;
use crate::error::Result;
use crate::features::FeatureExtractor;
use crate::segment::Segmenter;
use crate::tokenizer::{self, Tokenizer};

/// A label together with the model's posterior probability for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedToken {
    pub label: String,
    pub confidence: f64,
}

/// Labels input with a shared model and segments the result.
///
/// Taggers are cheap to clone; clones share the model.
#[derive(Debug, Clone)]
pub struct Tagger<S> {
    model: Arc<LinearChainModel>,
    extractor: FeatureExtractor,
    tokenizer: Tokenizer,
    segmenter: S,
}

impl<S: Segmenter> Tagger<S> {
    /// Wrap `model`, compiling its feature templates.
    pub fn new(model: Arc<LinearChainModel>, tokenizer: Tokenizer, segmenter: S) -> Result<Self> {
        let extractor = model.extractor()?;
        Ok(Self {
            model,
            extractor,
            tokenizer,
            segmenter,
        })
    }

    pub fn model(&self) -> &Arc<LinearChainModel> {
        &self.model
    }

    pub fn tokenizer(&self) -> Tokenizer {
        self.tokenizer
    }

    pub fn segmenter(&self) -> &S {
        &self.segmenter
    }

    /// Most likely label for each token. Empty input yields no labels.
    pub fn tag(&self, tokens: &[String]) -> Result<Vec<String>> {
        let observation = self.observe(tokens);
        let codes = self.model.decode(&observation)?;
        self.model.labels(&codes)
    }

    /// Like [`tag`](Self::tag), with the posterior probability of each
    /// chosen label.
    pub fn tag_with_confidence(&self, tokens: &[String]) -> Result<Vec<TaggedToken>> {
        let observation = self.observe(tokens);
        let codes = self.model.decode(&observation)?;
        let marginals = self.model.marginals(&observation);
        let labels = self.model.labels(&codes)?;
        Ok(labels
            .into_iter()
            .zip(codes.iter().zip(&marginals))
            .map(|(label, (&code, row))| TaggedToken {
                label,
                confidence: row[code],
            })
            .collect())
    }

    /// Tokenize `input`, tag it and segment the labels.
    pub fn segment(&self, input: &str) -> Result<S::Output> {
        let tokens = self.tokenizer.tokenize(input);
        let labels = self.tag(&tokenizer::texts(&tokens))?;
        Ok(self.segmenter.segment(input, &tokens, &labels))
    }

    fn observe(&self, tokens: &[String]) -> Vec<Vec<usize>> {
        self.model.observe(&self.extractor.extract_all(tokens))
    }
}
