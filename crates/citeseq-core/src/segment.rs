//! # Segmenters
//!
//! Turn a labeled token sequence into structured output. The same tagger
//! drives both the reference parser and the reference finder; only the
//! segmenter differs.

use serde::Serialize;

use crate::tokenizer::{self, Token};

/// Label the finder assigns to lines that belong to a reference.
pub const REFERENCE_LABEL: &str = "ref";

/// Groups labeled tokens into a result.
pub trait Segmenter {
    type Output;

    /// Build the output for `tokens` of `source` labeled with `labels`.
    ///
    /// `tokens` and `labels` are parallel; token offsets index into `source`.
    fn segment(&self, source: &str, tokens: &[Token], labels: &[String]) -> Self::Output;
}

/// One labeled field of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: String,
    pub text: String,
}

impl Field {
    /// Field text without surrounding brackets and trailing separators.
    ///
    /// ```
    /// use citeseq_core::segment::Field;
    ///
    /// let field = Field { label: "date".into(), text: "(2001).".into() };
    /// assert_eq!(field.value(), "2001");
    /// ```
    pub fn value(&self) -> &str {
        self.text
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
            .trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']'))
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
            .trim()
    }
}

/// A parsed reference: its fields in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub fields: Vec<Field>,
}

impl Reference {
    /// Text of the first field labeled `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.text.as_str())
    }

    /// Texts of every field labeled `label`.
    pub fn all(&self, label: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.label == label)
            .map(|f| f.text.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Merges runs of equally labeled words into [`Field`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSegmenter;

impl Segmenter for FieldSegmenter {
    type Output = Reference;

    fn segment(&self, source: &str, tokens: &[Token], labels: &[String]) -> Reference {
        let fields = runs(labels)
            .into_iter()
            .filter_map(|(label, start, end)| {
                let (from, to) = tokenizer::span(tokens, start, end)?;
                Some(Field {
                    label: label.to_string(),
                    text: source[from..to].to_string(),
                })
            })
            .collect();
        Reference { fields }
    }
}

/// A block of document lines the finder labeled as a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceSpan {
    /// First line, inclusive.
    pub start: usize,
    /// Last line, exclusive.
    pub end: usize,
    pub text: String,
}

/// Collects contiguous lines carrying a given label into [`ReferenceSpan`]s.
#[derive(Debug, Clone)]
pub struct SpanSegmenter {
    label: String,
}

impl SpanSegmenter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for SpanSegmenter {
    fn default() -> Self {
        Self::new(REFERENCE_LABEL)
    }
}

impl Segmenter for SpanSegmenter {
    type Output = Vec<ReferenceSpan>;

    fn segment(&self, _source: &str, tokens: &[Token], labels: &[String]) -> Vec<ReferenceSpan> {
        runs(labels)
            .into_iter()
            .filter(|(label, _, _)| *label == self.label)
            .map(|(_, start, end)| ReferenceSpan {
                start: tokens[start].index,
                end: tokens[end - 1].index + 1,
                text: tokens[start..end]
                    .iter()
                    .map(|t| t.text.trim())
                    .collect::<Vec<_>>()
                    .join("\n"),
            })
            .collect()
    }
}

/// Maximal runs of identical labels as `(label, start, end)`.
fn runs(labels: &[String]) -> Vec<(&str, usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < labels.len() {
        let start = i;
        while i < labels.len() && labels[i] == labels[start] {
            i += 1;
        }
        out.push((labels[start].as_str(), start, i));
    }
    out
}
