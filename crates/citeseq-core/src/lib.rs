//! # Citeseq Core
//!
//! The labeling engine behind citeseq: feature templates, label alphabet,
//! the linear-chain model (scoring, Viterbi, forward-backward), model
//! persistence, dataset readers and the generic tagger.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use citeseq_core::crf::{FeatureIndex, LinearChainModel, WeightTables};
//! use citeseq_core::{FeatureSet, FieldSegmenter, LabelAlphabet, Tagger, Tokenizer};
//!
//! let alphabet = LabelAlphabet::from_symbols(["author", "title"]).unwrap();
//! let mut features = FeatureIndex::new();
//! features.insert("bias");
//! features.insert("punct=,");
//! let weights = WeightTables::from_parts(2, vec![0.0, 1.0, 3.0, 0.0], vec![0.0; 4]).unwrap();
//! let model = LinearChainModel::new(alphabet, FeatureSet::reference(), features, weights).unwrap();
//!
//! let tagger = Tagger::new(Arc::new(model), Tokenizer::Words, FieldSegmenter).unwrap();
//! let reference = tagger.segment("Smith, Parsing things").unwrap();
//! assert_eq!(reference.get("author"), Some("Smith,"));
//! ```
pub mod alphabet;
pub mod crf;
pub mod dataset;
pub mod error;
pub mod features;
pub mod segment;
pub mod tagger;
pub mod tokenizer;

// Re-export primary API
pub use alphabet::LabelAlphabet;
pub use crf::{LinearChainModel, ModelState};
pub use dataset::{Dataset, Sequence};
pub use error::{CiteseqError, Result};
pub use features::{FeatureExtractor, FeatureSet, FeatureTemplate, TEMPLATE_VERSION};
pub use segment::{
    Field, FieldSegmenter, Reference, ReferenceSpan, Segmenter, SpanSegmenter, REFERENCE_LABEL,
};
pub use tagger::{TaggedToken, Tagger};
pub use tokenizer::{Token, Tokenizer};
