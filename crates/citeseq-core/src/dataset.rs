//! # Annotated Corpora
//!
//! Readers for the two training formats:
//!
//! - **XML** reference corpora. Each `<sequence>` is one reference; each child
//!   element is a field whose whitespace-separated words all carry the
//!   element name as label.
//!
//!   ```xml
//!   <dataset>
//!     <sequence>
//!       <author>Smith, J.</author>
//!       <date>(2001).</date>
//!       <title>On parsing.</title>
//!     </sequence>
//!   </dataset>
//!   ```
//!
//! - **TTX** tagged documents. One line of the document per line of the file,
//!   written as `label | text`. A blank label continues the previous label,
//!   and so does a bare blank line, which stands for an empty document line.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::name::QName;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CiteseqError, Result};

/// Extension of tagged document files.
pub const TTX_EXTENSION: &str = "ttx";

/// One token sequence with optional gold labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub tokens: Vec<String>,
    pub labels: Option<Vec<String>>,
}

impl Sequence {
    /// An unlabeled sequence, as seen at inference time.
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            labels: None,
        }
    }

    /// A sequence with gold labels. Lengths are checked by [`Sequence::validate`].
    pub fn labeled(tokens: Vec<String>, labels: Vec<String>) -> Self {
        Self {
            tokens,
            labels: Some(labels),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check that gold labels are present and parallel to the tokens.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::TrainingData` otherwise.
    pub fn validate(&self) -> Result<()> {
        match &self.labels {
            None => Err(CiteseqError::TrainingData(
                "sequence has no gold labels".to_string(),
            )),
            Some(labels) if labels.len() != self.tokens.len() => {
                Err(CiteseqError::TrainingData(format!(
                    "sequence has {} tokens but {} labels",
                    self.tokens.len(),
                    labels.len()
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

/// An ordered, read-only collection of sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    sequences: Vec<Sequence>,
}

impl Dataset {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    /// Total number of tokens over all sequences.
    pub fn token_count(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// Check that the dataset is usable for training.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::TrainingData` if the dataset has no tokens or
    /// any sequence lacks labels or has a token/label length mismatch.
    pub fn validate(&self) -> Result<()> {
        if self.sequences.is_empty() {
            return Err(CiteseqError::TrainingData("dataset is empty".to_string()));
        }
        for (i, sequence) in self.sequences.iter().enumerate() {
            sequence.validate().map_err(|e| match e {
                CiteseqError::TrainingData(msg) => {
                    CiteseqError::TrainingData(format!("sequence {i}: {msg}"))
                }
                other => other,
            })?;
        }
        if self.token_count() == 0 {
            return Err(CiteseqError::TrainingData(
                "dataset has no tokens".to_string(),
            ));
        }
        Ok(())
    }

    /// Read an XML reference corpus from disk.
    pub fn open_xml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let dataset = Self::from_xml_str(&content)?;
        info!(path = %path.display(), sequences = dataset.len(), "loaded XML corpus");
        Ok(dataset)
    }

    /// Parse an XML reference corpus.
    pub fn from_xml_str(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut sequences = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name() == QName(b"sequence") => {
                    let sequence = parse_sequence(&mut reader, &mut buf)?;
                    if sequence.is_empty() {
                        debug!("skipping empty <sequence>");
                    } else {
                        sequences.push(sequence);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => (),
            }
            buf.clear();
        }

        Ok(Self::new(sequences))
    }

    /// Parse one tagged document into a line sequence.
    pub fn sequence_from_ttx_str(content: &str) -> Result<Sequence> {
        let mut tokens = Vec::new();
        let mut labels = Vec::new();
        let mut current: Option<String> = None;

        for (n, line) in content.lines().enumerate() {
            // A bare blank line is a blank document line continuing the
            // previous label.
            let (label, text) = match line.split_once('|') {
                Some(parts) => parts,
                None if line.trim().is_empty() => ("", ""),
                None => {
                    return Err(CiteseqError::TrainingData(format!(
                        "line {}: missing '|' separator",
                        n + 1
                    )));
                }
            };

            let label = label.trim();
            if !label.is_empty() {
                current = Some(label.to_string());
            }
            let Some(label) = current.clone() else {
                return Err(CiteseqError::TrainingData(format!(
                    "line {}: continuation line before any label",
                    n + 1
                )));
            };

            tokens.push(text.strip_prefix(' ').unwrap_or(text).to_string());
            labels.push(label);
        }

        Ok(Sequence::labeled(tokens, labels))
    }

    /// Read tagged documents, one sequence per file, in the given order.
    pub fn open_ttx<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut sequences = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let content = fs::read_to_string(path)?;
            let sequence = Self::sequence_from_ttx_str(&content).map_err(|e| match e {
                CiteseqError::TrainingData(msg) => {
                    CiteseqError::TrainingData(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?;
            if sequence.is_empty() {
                debug!(path = %path.display(), "skipping empty document");
                continue;
            }
            sequences.push(sequence);
        }
        info!(documents = sequences.len(), "loaded tagged documents");
        Ok(Self::new(sequences))
    }

    /// Read every `*.ttx` file in `dir`, sorted by file name.
    pub fn open_ttx_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_ttx(&ttx_files(dir)?)
    }
}

impl FromIterator<Sequence> for Dataset {
    fn from_iter<I: IntoIterator<Item = Sequence>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}

/// List the `*.ttx` files of a directory in a stable order.
pub fn ttx_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == TTX_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_sequence<B: BufRead>(reader: &mut Reader<B>, buf: &mut Vec<u8>) -> Result<Sequence> {
    let mut tokens = Vec::new();
    let mut labels = Vec::new();

    loop {
        match reader.read_event_into(buf) {
            Ok(Event::Start(e)) => {
                let label = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let text = extract_text(reader, buf, label.as_bytes())?;
                for word in text.split_whitespace() {
                    tokens.push(word.to_string());
                    labels.push(label.clone());
                }
            }
            Ok(Event::End(e)) if e.name() == QName(b"sequence") => break,
            Ok(Event::Eof) => {
                return Err(CiteseqError::Xml(
                    "unexpected EOF inside <sequence>".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
            _ => (),
        }
        buf.clear();
    }

    Ok(Sequence::labeled(tokens, labels))
}

/// Collect text content until the matching closing tag, flattening nested markup.
fn extract_text<B: BufRead>(
    reader: &mut Reader<B>,
    buf: &mut Vec<u8>,
    closing_tag: &[u8],
) -> Result<String> {
    let mut text = String::new();

    loop {
        buf.clear();
        match reader.read_event_into(buf) {
            Ok(Event::Text(e)) => {
                let chunk = e
                    .unescape()
                    .map_err(|e| CiteseqError::Xml(format!("invalid XML text content: {e}")))?;
                text.push(' ');
                text.push_str(&chunk);
            }
            Ok(Event::CData(e)) => {
                text.push(' ');
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) if e.name() == QName(closing_tag) => break,
            Ok(Event::Eof) => {
                return Err(CiteseqError::Xml(format!(
                    "unexpected EOF while looking for closing tag '{}'",
                    String::from_utf8_lossy(closing_tag)
                )));
            }
            Err(e) => return Err(e.into()),
            _ => continue,
        }
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dataset>
  <sequence>
    <author>Smith, J.</author>
    <date>(2001).</date>
    <title>On <i>parsing</i> &amp; tagging.</title>
  </sequence>
  <sequence/>
  <sequence>
    <author>Doe, A.</author>
    <container-title>Journal of Tests</container-title>
  </sequence>
</dataset>"#;

    #[test]
    fn test_xml_sequences() {
        let dataset = Dataset::from_xml_str(XML).unwrap();
        assert_eq!(dataset.len(), 2);

        let first = &dataset.sequences()[0];
        assert_eq!(
            first.tokens,
            vec!["Smith,", "J.", "(2001).", "On", "parsing", "&", "tagging."]
        );
        let labels = first.labels.as_ref().unwrap();
        assert_eq!(labels[0], "author");
        assert_eq!(labels[2], "date");
        assert_eq!(labels[6], "title");

        let second = &dataset.sequences()[1];
        assert_eq!(second.labels.as_ref().unwrap()[2], "container-title");
        assert!(dataset.validate().is_ok());
        assert_eq!(dataset.token_count(), 12);
    }

    #[test]
    fn test_xml_truncated() {
        let result = Dataset::from_xml_str("<dataset><sequence><author>Smith");
        assert!(result.is_err());
    }

    #[test]
    fn test_ttx_labels_continue() {
        let ttx = "title     | A Study of Things\n\
                   text      | Body text here.\n\
                   \x20         | more body\n\
                   ref       | [1] Smith, J. (2001).\n\
                   \x20         |     continued.\n";
        let sequence = Dataset::sequence_from_ttx_str(ttx).unwrap();
        assert_eq!(sequence.len(), 5);
        assert_eq!(
            sequence.labels.as_ref().unwrap(),
            &vec!["title", "text", "text", "ref", "ref"]
        );
        assert_eq!(sequence.tokens[4], "    continued.");
        assert!(sequence.validate().is_ok());
    }

    #[test]
    fn test_ttx_bare_blank_lines_are_kept() {
        let ttx = "title | Paper\n\nref   | [1] Smith, J.\n";
        let sequence = Dataset::sequence_from_ttx_str(ttx).unwrap();
        assert_eq!(sequence.tokens, vec!["Paper", "", "[1] Smith, J."]);
        assert_eq!(sequence.labels.as_ref().unwrap(), &vec!["title", "title", "ref"]);

        let document = "Paper\n\n[1] Smith, J.\n";
        assert_eq!(crate::Tokenizer::Lines.tokenize(document).len(), sequence.len());
    }

    #[test]
    fn test_ttx_errors() {
        let err = Dataset::sequence_from_ttx_str("no separator here").unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));

        let err = Dataset::sequence_from_ttx_str("   | orphan line").unwrap_err();
        assert!(matches!(err, CiteseqError::TrainingData(_)));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            Dataset::default().validate(),
            Err(CiteseqError::TrainingData(_))
        ));

        let mismatched = Dataset::new(vec![Sequence::labeled(
            vec!["a".into(), "b".into()],
            vec!["x".into()],
        )]);
        assert!(matches!(
            mismatched.validate(),
            Err(CiteseqError::TrainingData(_))
        ));

        let unlabeled = Dataset::new(vec![Sequence::new(vec!["a".into()])]);
        assert!(unlabeled.validate().is_err());

        let tokenless = Dataset::new(vec![
            Sequence::labeled(vec![], vec![]),
            Sequence::labeled(vec![], vec![]),
        ]);
        assert!(matches!(
            tokenless.validate(),
            Err(CiteseqError::TrainingData(_))
        ));
    }

    #[test]
    fn test_ttx_dir_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ttx"), "ref | second\n").unwrap();
        fs::write(dir.path().join("a.ttx"), "ref | first\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let dataset = Dataset::open_ttx_dir(dir.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.sequences()[0].tokens, vec!["first"]);
    }
}
