//! # Citeseq
//!
//! Trainable reference parsing and reference finding.
//!
//! - [`ReferenceParser`] labels the fields (author, title, date, ...) of
//!   reference strings, one reference per line.
//! - [`ReferenceFinder`] finds the reference lines of a whole document.
//!
//! Both start empty and get a model by training on an annotated corpus or by
//! loading one saved earlier with [`LinearChainModel::save`].
//!
//! ```rust
//! use citeseq::{Dataset, ReferenceParser};
//!
//! let dataset = Dataset::from_xml_str(
//!     "<dataset><sequence><author>Smith, J.</author><title>Parsing.</title></sequence></dataset>",
//! )
//! .unwrap();
//!
//! let mut parser = ReferenceParser::default();
//! parser.train(&dataset).unwrap();
//! let references = parser.parse_str("Smith, J. Parsing.").unwrap();
//! assert_eq!(references[0].get("author"), Some("Smith, J."));
//! ```
pub mod finder;
pub mod parser;

pub use finder::ReferenceFinder;
pub use parser::ReferenceParser;

pub use citeseq_core::{
    CiteseqError, Dataset, Field, LinearChainModel, Reference, ReferenceSpan, Result, Sequence,
};
pub use citeseq_trainer::{StopSignal, TrainConfig, TrainingReport};
