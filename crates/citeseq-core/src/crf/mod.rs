pub mod lattice;
pub mod model;
pub mod viterbi;
pub mod weights;

pub use lattice::{log_sum_exp, Lattice};
pub use model::{FeatureIndex, LinearChainModel, ModelState, FORMAT_VERSION};
pub use viterbi::ViterbiDecoder;
pub use weights::{Update, WeightTables};
