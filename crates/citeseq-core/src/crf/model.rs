use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::weights::{Update, WeightTables};
use crate::alphabet::LabelAlphabet;
use crate::error::{CiteseqError, Result};
use crate::features::{FeatureExtractor, FeatureSet, TEMPLATE_VERSION};

/// Version of the on-disk model layout.
pub const FORMAT_VERSION: u32 = 1;

/// Feature name -> dense id, assigned in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureIndex {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, assigning the next one if it is new.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl TryFrom<Vec<String>> for FeatureIndex {
    type Error = CiteseqError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        let mut index = Self::new();
        for name in &names {
            if index.get(name).is_some() {
                return Err(CiteseqError::ModelLoad(format!("duplicate feature {name:?}")));
            }
            index.insert(name);
        }
        Ok(index)
    }
}

impl From<FeatureIndex> for Vec<String> {
    fn from(index: FeatureIndex) -> Self {
        index.names
    }
}

/// How a model came to exist. Neither state can go back to training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Produced by a training run in this process.
    Trained,
    /// Read from storage.
    Loaded,
}

/// A trained linear-chain labeling model.
///
/// Bundles the label alphabet, the feature templates and the feature index
/// that produced the weights, so inference reproduces training-time
/// extraction exactly. There is no public way to mutate a model; training
/// builds a new one.
#[derive(Debug, Clone)]
pub struct LinearChainModel {
    alphabet: LabelAlphabet,
    feature_set: FeatureSet,
    features: FeatureIndex,
    weights: WeightTables,
    state: ModelState,
}

/// On-disk layout.
#[derive(Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    template_version: u32,
    feature_set: FeatureSet,
    alphabet: LabelAlphabet,
    features: FeatureIndex,
    num_labels: usize,
    emission: Vec<f64>,
    transition: Vec<f64>,
}

/// Just the version fields, read before anything else.
#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
    template_version: u32,
}

impl LinearChainModel {
    /// Assemble a freshly trained model. The alphabet is frozen.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::Decode` if the table sizes disagree with the
    /// alphabet or feature index.
    pub fn new(
        mut alphabet: LabelAlphabet,
        feature_set: FeatureSet,
        features: FeatureIndex,
        weights: WeightTables,
    ) -> Result<Self> {
        alphabet.freeze();
        check_consistency(&alphabet, &features, &weights).map_err(CiteseqError::Decode)?;
        Ok(Self {
            alphabet,
            feature_set,
            features,
            weights,
            state: ModelState::Trained,
        })
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn alphabet(&self) -> &LabelAlphabet {
        &self.alphabet
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    pub fn features(&self) -> &FeatureIndex {
        &self.features
    }

    pub fn weights(&self) -> &WeightTables {
        &self.weights
    }

    /// Compile this model's feature templates.
    pub fn extractor(&self) -> Result<FeatureExtractor> {
        self.feature_set.extractor()
    }

    /// Map feature names to ids, dropping features never seen in training.
    pub fn observe(&self, features: &[Vec<String>]) -> Vec<Vec<usize>> {
        features
            .iter()
            .map(|names| names.iter().filter_map(|n| self.features.get(n)).collect())
            .collect()
    }

    /// Total score of `labels` for `observation`.
    pub fn score(&self, observation: &[Vec<usize>], labels: &[usize]) -> f64 {
        self.weights.score(observation, labels)
    }

    /// Highest-scoring label codes for `observation`.
    pub fn decode(&self, observation: &[Vec<usize>]) -> Result<Vec<usize>> {
        self.weights.decode(observation)
    }

    /// Per-token label posteriors for `observation`.
    pub fn marginals(&self, observation: &[Vec<usize>]) -> Vec<Vec<f64>> {
        self.weights.marginals(observation)
    }

    /// Perceptron update that would move this model toward `gold`.
    pub fn gradient(&self, observation: &[Vec<usize>], gold: &[usize]) -> Result<Update> {
        self.weights.gradient(observation, gold)
    }

    /// Decode label codes back to symbols.
    pub fn labels(&self, codes: &[usize]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&code| {
                self.alphabet
                    .decode(code)
                    .map(str::to_string)
                    .ok_or_else(|| CiteseqError::Decode(format!("label code {code} out of range")))
            })
            .collect()
    }

    /// Serialize to the JSON model format.
    pub fn to_json(&self) -> Result<String> {
        let file = ModelFile {
            format_version: FORMAT_VERSION,
            template_version: self.feature_set.version,
            feature_set: self.feature_set.clone(),
            alphabet: self.alphabet.clone(),
            features: self.features.clone(),
            num_labels: self.weights.num_labels(),
            emission: self.weights.emission_table().to_vec(),
            transition: self.weights.transition_table().to_vec(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Parse the JSON model format.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::ModelLoad` if the text is not a model file, was
    /// written by another format or template version, or its tables do not
    /// fit together.
    pub fn from_json(json: &str) -> Result<Self> {
        let header: VersionHeader = serde_json::from_str(json)
            .map_err(|e| CiteseqError::ModelLoad(format!("not a model file: {e}")))?;
        if header.format_version != FORMAT_VERSION {
            return Err(CiteseqError::ModelLoad(format!(
                "model format version {} is not supported (expected {FORMAT_VERSION})",
                header.format_version
            )));
        }
        if header.template_version != TEMPLATE_VERSION {
            return Err(CiteseqError::ModelLoad(format!(
                "feature template version {} does not match {TEMPLATE_VERSION}",
                header.template_version
            )));
        }

        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| CiteseqError::ModelLoad(format!("malformed model file: {e}")))?;
        if file.feature_set.version != file.template_version {
            return Err(CiteseqError::ModelLoad(format!(
                "feature set {:?} has version {}, file declares {}",
                file.feature_set.name, file.feature_set.version, file.template_version
            )));
        }

        let weights = WeightTables::from_parts(file.num_labels, file.emission, file.transition)
            .map_err(|e| CiteseqError::ModelLoad(e.to_string()))?;
        check_consistency(&file.alphabet, &file.features, &weights).map_err(CiteseqError::ModelLoad)?;

        Ok(Self {
            alphabet: file.alphabet,
            feature_set: file.feature_set,
            features: file.features,
            weights,
            state: ModelState::Loaded,
        })
    }

    /// Write the model to `path`.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::ModelExists` if `path` exists and `overwrite`
    /// is false.
    pub fn save<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<()> {
        let path = path.as_ref();
        if !overwrite && path.exists() {
            return Err(CiteseqError::ModelExists(path.to_path_buf()));
        }
        fs::write(path, self.to_json()?)?;
        info!(
            path = %path.display(),
            labels = self.alphabet.len(),
            features = self.features.len(),
            "saved model"
        );
        Ok(())
    }

    /// Read a model from `path`.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::ModelLoad` if the file is unreadable or
    /// incompatible.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| CiteseqError::ModelLoad(format!("{}: {e}", path.display())))?;
        let model = Self::from_json(&json)?;
        debug!(path = %path.display(), labels = %model.alphabet, "loaded model");
        Ok(model)
    }
}

fn check_consistency(
    alphabet: &LabelAlphabet,
    features: &FeatureIndex,
    weights: &WeightTables,
) -> std::result::Result<(), String> {
    if weights.num_labels() != alphabet.len() {
        return Err(format!(
            "weights cover {} labels, alphabet has {}",
            weights.num_labels(),
            alphabet.len()
        ));
    }
    if weights.num_features() != features.len() {
        return Err(format!(
            "weights cover {} features, index has {}",
            weights.num_features(),
            features.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> LinearChainModel {
        let alphabet = LabelAlphabet::from_symbols(["author", "title"]).unwrap();
        let mut features = FeatureIndex::new();
        features.insert("bias");
        features.insert("w=smith,");
        let weights = WeightTables::from_parts(
            2,
            vec![0.0, 0.1, 2.0, -1.0],
            vec![0.5, 0.0, -0.25, 0.75],
        )
        .unwrap();
        LinearChainModel::new(alphabet, FeatureSet::reference(), features, weights).unwrap()
    }

    #[test]
    fn test_observe_drops_unknown_features() {
        let model = tiny_model();
        let observation = model.observe(&[vec!["bias".into(), "w=nobody".into(), "w=smith,".into()]]);
        assert_eq!(observation, vec![vec![0, 1]]);
    }

    #[test]
    fn test_json_roundtrip_is_exact() {
        let model = tiny_model();
        assert_eq!(model.state(), ModelState::Trained);

        let back = LinearChainModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(back.state(), ModelState::Loaded);
        assert_eq!(back.weights(), model.weights());
        assert_eq!(back.alphabet(), model.alphabet());
        assert_eq!(back.feature_set(), model.feature_set());
    }

    #[test]
    fn test_template_version_mismatch() {
        let json = tiny_model()
            .to_json()
            .unwrap()
            .replace(
                &format!("\"template_version\":{TEMPLATE_VERSION}"),
                "\"template_version\":999",
            );
        let err = LinearChainModel::from_json(&json).unwrap_err();
        assert!(matches!(err, CiteseqError::ModelLoad(ref m) if m.contains("template version")));
    }

    #[test]
    fn test_format_version_mismatch() {
        let json = tiny_model()
            .to_json()
            .unwrap()
            .replace(&format!("\"format_version\":{FORMAT_VERSION}"), "\"format_version\":0");
        assert!(matches!(
            LinearChainModel::from_json(&json),
            Err(CiteseqError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_garbage_and_unknown_templates_fail_to_load() {
        assert!(matches!(
            LinearChainModel::from_json("not json"),
            Err(CiteseqError::ModelLoad(_))
        ));

        let json = tiny_model().to_json().unwrap().replace("\"shape\"", "\"sparkle\"");
        assert!(matches!(
            LinearChainModel::from_json(&json),
            Err(CiteseqError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_save_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = tiny_model();

        model.save(&path, false).unwrap();
        let err = model.save(&path, false).unwrap_err();
        assert!(matches!(err, CiteseqError::ModelExists(_)));
        model.save(&path, true).unwrap();

        let loaded = LinearChainModel::load(&path).unwrap();
        assert_eq!(loaded.weights(), model.weights());
    }

    #[test]
    fn test_load_missing_file() {
        let err = LinearChainModel::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CiteseqError::ModelLoad(_)));
    }

    #[test]
    fn test_inconsistent_parts_rejected() {
        let alphabet = LabelAlphabet::from_symbols(["a", "b", "c"]).unwrap();
        let weights = WeightTables::new(1, 2);
        let mut features = FeatureIndex::new();
        features.insert("bias");
        assert!(LinearChainModel::new(alphabet, FeatureSet::reference(), features, weights).is_err());
    }
}
