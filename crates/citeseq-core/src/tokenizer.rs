//! # Tokenizer
//!
//! Splits reference strings into words and documents into lines. Both keep
//! byte offsets into the original input so labeled runs can be mapped back
//! to the exact source text.

/// A token extracted from an input string with positional information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text content
    pub text: String,
    /// Start position in the original string
    pub start: usize,
    /// End position in the original string
    pub end: usize,
    /// Token index in the sequence
    pub index: usize,
}

/// How an input is cut into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tokenizer {
    /// Whitespace-separated words of a single reference.
    #[default]
    Words,
    /// Lines of a document, blank lines included.
    Lines,
}

impl Tokenizer {
    /// Tokenize `input` according to the mode.
    ///
    /// # Examples
    /// ```
    /// use citeseq_core::tokenizer::Tokenizer;
    ///
    /// let tokens = Tokenizer::Words.tokenize("Smith, J. (2001) On parsing.");
    /// assert_eq!(tokens[0].text, "Smith,");
    /// assert_eq!(tokens.len(), 5);
    /// ```
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        match self {
            Tokenizer::Words => tokenize_words(input),
            Tokenizer::Lines => tokenize_lines(input),
        }
    }
}

/// Byte range in the original input covered by `tokens[start_idx..end_idx]`.
pub fn span(tokens: &[Token], start_idx: usize, end_idx: usize) -> Option<(usize, usize)> {
    if start_idx >= tokens.len() || end_idx > tokens.len() || start_idx >= end_idx {
        return None;
    }
    Some((tokens[start_idx].start, tokens[end_idx - 1].end))
}

fn tokenize_words(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start: Option<usize> = None;

    for (idx, c) in input.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = current_start.take() {
                push_token(&mut tokens, input, start, idx);
            }
        } else if current_start.is_none() {
            current_start = Some(idx);
        }
    }

    if let Some(start) = current_start {
        push_token(&mut tokens, input, start, input.len());
    }

    tokens
}

fn tokenize_lines(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start = 0;

    for line in input.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        tokens.push(Token {
            text: content.to_string(),
            start,
            end: start + content.len(),
            index: tokens.len(),
        });
        start += line.len();
    }

    tokens
}

fn push_token(tokens: &mut Vec<Token>, input: &str, start: usize, end: usize) {
    tokens.push(Token {
        text: input[start..end].to_string(),
        start,
        end,
        index: tokens.len(),
    });
}

/// Project tokens to their texts, the form the feature extractor consumes.
pub fn texts(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(|t| t.text.clone()).collect()
}
