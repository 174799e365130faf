use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during citeseq core operations.
#[derive(Debug, Error)]
pub enum CiteseqError {
    /// The training corpus is empty or malformed.
    #[error("invalid training data: {0}")]
    TrainingData(String),

    /// A persisted model could not be read or was written by an incompatible version.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// A label symbol was encoded after the alphabet was frozen.
    #[error("unknown label {0:?}")]
    UnknownLabel(String),

    /// The decoder was handed inconsistent tables.
    #[error("decode error: {0}")]
    Decode(String),

    /// Saving would replace an existing model file.
    #[error("file exists, pass overwrite to replace it: {}", .0.display())]
    ModelExists(PathBuf),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),

    /// An XML corpus could not be read.
    #[error("XML corpus error: {0}")]
    Xml(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A model or configuration could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for CiteseqError {
    fn from(err: quick_xml::Error) -> Self {
        CiteseqError::Xml(err.to_string())
    }
}

/// Result type alias for citeseq operations.
pub type Result<T> = std::result::Result<T, CiteseqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = CiteseqError::TrainingData("dataset is empty".into());
        assert_eq!(err.to_string(), "invalid training data: dataset is empty");

        let err = CiteseqError::UnknownLabel("editor".into());
        assert!(err.to_string().contains("editor"));

        let err = CiteseqError::ModelExists(PathBuf::from("parser.json"));
        assert!(err.to_string().contains("parser.json"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CiteseqError = io.into();
        assert!(matches!(err, CiteseqError::Io(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CiteseqError>();
    }
}
