//! # Citeseq Trainer
//!
//! Fits citeseq labeling models from annotated corpora with an averaged
//! structured perceptron.
//!
//! ```rust
//! use citeseq_core::{Dataset, FeatureSet, Sequence};
//! use citeseq_trainer::{TrainConfig, Trainer};
//!
//! let dataset = Dataset::new(vec![Sequence::labeled(
//!     vec!["Smith,".into(), "Parsing".into()],
//!     vec!["author".into(), "title".into()],
//! )]);
//! let model = Trainer::new(TrainConfig::default())
//!     .train(&dataset, FeatureSet::reference())
//!     .unwrap();
//! assert_eq!(model.alphabet().len(), 2);
//! ```
pub mod config;
pub mod session;
pub mod trainer;

pub use config::TrainConfig;
pub use session::{PassMetrics, TrainingSession};
pub use trainer::{StopSignal, Trainer, TrainingReport};
