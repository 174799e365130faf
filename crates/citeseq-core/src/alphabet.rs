//! # Label Alphabet
//!
//! Maps label symbols (`author`, `title`, `ref`, ...) to dense integer codes
//! used as indices into the weight tables. Codes are handed out in
//! first-seen order while the alphabet is open; after [`LabelAlphabet::freeze`]
//! the label space is closed.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CiteseqError, Result};

/// Bidirectional label symbol <-> code mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelAlphabet {
    symbols: Vec<String>,
    codes: HashMap<String, usize>,
    frozen: bool,
}

impl LabelAlphabet {
    /// Create an empty, open alphabet.
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            codes: HashMap::new(),
            frozen: false,
        }
    }

    /// Build a frozen alphabet from an ordered symbol list.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::ModelLoad` if a symbol appears twice.
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut alphabet = Self::new();
        for symbol in symbols {
            let symbol = symbol.into();
            if alphabet.codes.contains_key(&symbol) {
                return Err(CiteseqError::ModelLoad(format!(
                    "duplicate label {symbol:?} in alphabet"
                )));
            }
            alphabet.insert(symbol);
        }
        alphabet.freeze();
        Ok(alphabet)
    }

    /// Return the code for `symbol`, assigning a new one while the alphabet is open.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::UnknownLabel` if the alphabet is frozen and
    /// `symbol` was never seen.
    pub fn encode(&mut self, symbol: &str) -> Result<usize> {
        if let Some(&code) = self.codes.get(symbol) {
            return Ok(code);
        }
        if self.frozen {
            return Err(CiteseqError::UnknownLabel(symbol.to_string()));
        }
        Ok(self.insert(symbol.to_string()))
    }

    /// Look up a code without ever extending the alphabet.
    pub fn code(&self, symbol: &str) -> Option<usize> {
        self.codes.get(symbol).copied()
    }

    /// Return the symbol for `code`.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.symbols.get(code).map(String::as_str)
    }

    /// Close the label space.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// All symbols in code order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn insert(&mut self, symbol: String) -> usize {
        let code = self.symbols.len();
        self.codes.insert(symbol.clone(), code);
        self.symbols.push(symbol);
        code
    }
}

impl Default for LabelAlphabet {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<String>> for LabelAlphabet {
    type Error = CiteseqError;

    fn try_from(symbols: Vec<String>) -> Result<Self> {
        Self::from_symbols(symbols)
    }
}

impl From<LabelAlphabet> for Vec<String> {
    fn from(alphabet: LabelAlphabet) -> Self {
        alphabet.symbols
    }
}

impl fmt::Display for LabelAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.symbols.join(", "))
    }
}
