//! # Feature Templates
//!
//! Turns a token sequence into per-token feature names. The template set is
//! a closed enumeration with stable serialized names so a persisted model
//! records exactly which templates produced its feature index. Bump
//! [`TEMPLATE_VERSION`] whenever the output of any template changes.
//!
//! Two stock sets exist:
//!
//! - [`FeatureSet::reference`]: word-level templates for labeling the fields
//!   of a single reference string.
//! - [`FeatureSet::document`]: line-level templates for finding references
//!   in a whole document.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Version of the template semantics below.
pub const TEMPLATE_VERSION: u32 = 1;

const FIRST_NAMES: &[&str] = &[
    "adam", "alan", "albert", "alice", "andrew", "anna", "anne", "barbara", "charles", "christian",
    "daniel", "david", "elizabeth", "emily", "eric", "frank", "george", "hans", "helen", "henry",
    "jack", "james", "jane", "jean", "john", "joseph", "karl", "laura", "maria", "mark", "mary",
    "michael", "paul", "peter", "richard", "robert", "sarah", "susan", "thomas", "william",
];

const PUBLISHER_WORDS: &[&str] = &[
    "academic", "books", "cambridge", "elsevier", "oxford", "press", "publisher", "publishers",
    "publishing", "routledge", "springer", "university", "verlag", "wiley",
];

const MONTHS: &[&str] = &[
    "jan", "january", "feb", "february", "mar", "march", "apr", "april", "may", "jun", "june",
    "jul", "july", "aug", "august", "sep", "sept", "september", "oct", "october", "nov",
    "november", "dec", "december",
];

const JOURNAL_WORDS: &[&str] = &[
    "annals", "bulletin", "conference", "journal", "letters", "proceedings", "quarterly",
    "review", "symposium", "transactions", "workshop",
];

const EDITOR_WORDS: &[&str] = &["ed", "eds", "edited", "editor", "editors", "hrsg", "hg"];

const VOLUME_WORDS: &[&str] = &["issue", "no", "nr", "p", "pages", "pp", "vol", "volume"];

const CONJUNCTIONS: &[&str] = &["and", "&", "et", "und", "y"];

/// A single feature-generating function, identified by a stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureTemplate {
    /// Constant feature active on every token.
    Bias,
    /// Lowercased token text.
    Word,
    /// Compressed character classes (`Smith,` -> `Xx,`).
    Shape,
    /// Leading characters of the lowercased, punctuation-stripped token.
    Prefix(usize),
    /// Trailing characters of the lowercased, punctuation-stripped token.
    Suffix(usize),
    /// Final punctuation mark of the trimmed token.
    TrailingPunct,
    /// Year, digit run, page range, ordinal or roman numeral.
    NumberClass,
    /// Membership in the built-in word lists.
    Lexicon,
    /// Opening/closing brackets and quotes.
    Enclosure,
    /// First/last flags and position decile.
    Position,
    /// Lowercased text of the token at a relative offset.
    Neighbor(isize),
    /// Line is empty after trimming.
    Blank,
    /// Line starts with whitespace.
    Indent,
    /// Bucketed trimmed line length.
    LineLength,
    /// Line starts with `[12]` or `12.` style numbering.
    Numbering,
    /// Line contains something that looks like a year.
    HasYear,
    /// Line contains a page range.
    HasPages,
    /// Line contains `et al`.
    EtAl,
    /// Line is a bibliography section heading.
    Heading,
    /// Bucketed share of uppercase letters.
    CapsRatio,
    /// Lowercased first word of the line.
    FirstWord,
    /// Coarse shape of the line at a relative offset.
    NeighborLine(isize),
}

/// An ordered list of templates plus the version that defines their meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub name: String,
    pub version: u32,
    pub templates: Vec<FeatureTemplate>,
}

impl FeatureSet {
    /// Compile this set into an extractor.
    pub fn extractor(&self) -> Result<FeatureExtractor> {
        FeatureExtractor::new(self)
    }

    /// Word-level templates for labeling reference fields.
    pub fn reference() -> Self {
        use FeatureTemplate::*;
        Self {
            name: "reference".to_string(),
            version: TEMPLATE_VERSION,
            templates: vec![
                Bias,
                Word,
                Shape,
                Prefix(1),
                Prefix(2),
                Prefix(3),
                Suffix(1),
                Suffix(2),
                Suffix(3),
                TrailingPunct,
                NumberClass,
                Lexicon,
                Enclosure,
                Position,
                Neighbor(-2),
                Neighbor(-1),
                Neighbor(1),
                Neighbor(2),
            ],
        }
    }

    /// Line-level templates for finding references in documents.
    pub fn document() -> Self {
        use FeatureTemplate::*;
        Self {
            name: "document".to_string(),
            version: TEMPLATE_VERSION,
            templates: vec![
                Bias,
                Blank,
                Indent,
                LineLength,
                Numbering,
                HasYear,
                HasPages,
                EtAl,
                Heading,
                CapsRatio,
                FirstWord,
                TrailingPunct,
                Position,
                NeighborLine(-1),
                NeighborLine(1),
            ],
        }
    }
}

/// Compiled form of a [`FeatureSet`].
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    templates: Vec<FeatureTemplate>,
    re_year: Regex,
    re_pages: Regex,
    re_ordinal: Regex,
    re_roman: Regex,
    re_numbering: Regex,
    re_et_al: Regex,
    re_heading: Regex,
}

impl FeatureExtractor {
    /// Compile the patterns used by the templates.
    ///
    /// # Errors
    ///
    /// Returns `CiteseqError::RegexError` if a pattern fails to compile (should
    /// never happen with the static patterns defined here).
    pub fn new(feature_set: &FeatureSet) -> Result<Self> {
        Ok(Self {
            templates: feature_set.templates.clone(),
            re_year: Regex::new(r"\b(1[5-9]\d{2}|20\d{2})[a-z]?\b")?,
            re_pages: Regex::new(r"\b\d+\s*(-|–|—)+\s*\d+\b")?,
            re_ordinal: Regex::new(r"(?i)^\d+(st|nd|rd|th|e|er)$")?,
            re_roman: Regex::new(r"(?i)^m{0,3}(cm|cd|d?c{0,3})(xc|xl|l?x{0,3})(ix|iv|v?i{0,3})$")?,
            re_numbering: Regex::new(r"^\s*(\[\d+\]|\(\d+\)|\d+\.)(\s|$)")?,
            re_et_al: Regex::new(r"(?i)\bet\.?\s+al\b")?,
            re_heading: Regex::new(
                r"(?i)^\s*(\d+\.?\s*)?(references|bibliography|works cited|literature cited|literature|sources)\s*:?\s*$",
            )?,
        })
    }

    /// Features for every position of `tokens`, aligned by index.
    pub fn extract_all(&self, tokens: &[String]) -> Vec<Vec<String>> {
        (0..tokens.len()).map(|i| self.extract(tokens, i)).collect()
    }

    /// Features for the token at `position`.
    ///
    /// Neighbor templates only look at positions inside the sequence; at the
    /// boundaries they contribute nothing.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of bounds.
    pub fn extract(&self, tokens: &[String], position: usize) -> Vec<String> {
        let token = tokens[position].as_str();
        let mut out = Vec::new();
        for template in &self.templates {
            self.apply(*template, tokens, position, token, &mut out);
        }
        out
    }

    fn apply(
        &self,
        template: FeatureTemplate,
        tokens: &[String],
        i: usize,
        token: &str,
        out: &mut Vec<String>,
    ) {
        use FeatureTemplate::*;
        match template {
            Bias => out.push("bias".to_string()),
            Word => out.push(format!("w={}", token.to_lowercase())),
            Shape => out.push(format!("shape={}", shape(token))),
            Prefix(n) => {
                let chars: Vec<char> = stripped_lower(token).chars().collect();
                if chars.len() >= n {
                    let prefix: String = chars[..n].iter().collect();
                    out.push(format!("prefix{n}={prefix}"));
                }
            }
            Suffix(n) => {
                let chars: Vec<char> = stripped_lower(token).chars().collect();
                if chars.len() >= n {
                    let suffix: String = chars[chars.len() - n..].iter().collect();
                    out.push(format!("suffix{n}={suffix}"));
                }
            }
            TrailingPunct => {
                if let Some(c) = token.trim_end().chars().last() {
                    if c.is_ascii_punctuation() || matches!(c, '”' | '’' | '–') {
                        out.push(format!("punct={c}"));
                    }
                }
            }
            NumberClass => self.number_class(token, out),
            Lexicon => lexicon(token, out),
            Enclosure => enclosure(token, out),
            Position => {
                let len = tokens.len();
                if i == 0 {
                    out.push("first".to_string());
                }
                if i + 1 == len {
                    out.push("last".to_string());
                }
                out.push(format!("pos={}", i * 10 / len));
            }
            Neighbor(offset) => {
                if let Some(neighbor) = neighbor(tokens, i, offset) {
                    out.push(format!("w[{offset}]={}", neighbor.to_lowercase()));
                }
            }
            Blank => {
                if token.trim().is_empty() {
                    out.push("blank".to_string());
                }
            }
            Indent => {
                if !token.trim().is_empty() && token.starts_with(char::is_whitespace) {
                    out.push("indent".to_string());
                }
            }
            LineLength => {
                let len = token.trim().chars().count();
                let bucket = match len {
                    0 => "empty",
                    1..=19 => "short",
                    20..=59 => "medium",
                    _ => "long",
                };
                out.push(format!("len={bucket}"));
            }
            Numbering => {
                if self.re_numbering.is_match(token) {
                    out.push("numbered".to_string());
                }
            }
            HasYear => {
                if self.re_year.is_match(token) {
                    out.push("has_year".to_string());
                }
            }
            HasPages => {
                if self.re_pages.is_match(token) {
                    out.push("has_pages".to_string());
                }
            }
            EtAl => {
                if self.re_et_al.is_match(token) {
                    out.push("et_al".to_string());
                }
            }
            Heading => {
                if self.re_heading.is_match(token) {
                    out.push("heading".to_string());
                }
            }
            CapsRatio => {
                let letters = token.chars().filter(|c| c.is_alphabetic()).count();
                if letters > 0 {
                    let upper = token.chars().filter(|c| c.is_uppercase()).count();
                    let bucket = match upper * 10 / letters {
                        0..=1 => "low",
                        2..=6 => "mid",
                        _ => "high",
                    };
                    out.push(format!("caps={bucket}"));
                }
            }
            FirstWord => {
                if let Some(word) = token.split_whitespace().next() {
                    let word = stripped_lower(word);
                    if !word.is_empty() {
                        out.push(format!("first={word}"));
                    }
                }
            }
            NeighborLine(offset) => {
                if let Some(line) = neighbor(tokens, i, offset) {
                    out.push(format!("line[{offset}]={}", self.line_shape(line)));
                }
            }
        }
    }

    fn number_class(&self, token: &str, out: &mut Vec<String>) {
        let core = token.trim_matches(|c: char| !c.is_alphanumeric());
        if core.is_empty() {
            return;
        }
        if self.re_pages.is_match(token) {
            out.push("num=range".to_string());
        } else if core.chars().all(|c| c.is_ascii_digit()) {
            if core.len() == 4 && self.re_year.is_match(core) {
                out.push("num=year".to_string());
            } else {
                out.push(format!("num=digits{}", core.len().min(5)));
            }
        } else if self.re_year.is_match(core) && core.len() == 5 {
            // 2001a
            out.push("num=year".to_string());
        } else if self.re_ordinal.is_match(core) {
            out.push("num=ordinal".to_string());
        } else if self.re_roman.is_match(core) {
            out.push("num=roman".to_string());
        }
        if core.chars().any(|c| c.is_ascii_digit()) {
            out.push("has_digit".to_string());
        }
    }

    fn line_shape(&self, line: &str) -> &'static str {
        if line.trim().is_empty() {
            "blank"
        } else if self.re_numbering.is_match(line) {
            "numbered"
        } else if line.starts_with(char::is_whitespace) {
            "indent"
        } else {
            "text"
        }
    }
}

fn neighbor(tokens: &[String], i: usize, offset: isize) -> Option<&str> {
    let idx = i.checked_add_signed(offset)?;
    tokens.get(idx).map(String::as_str)
}

fn stripped_lower(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Compress the character classes of `token`: uppercase `X`, lowercase `x`,
/// digit `d`, everything else kept verbatim; runs collapse to one symbol.
fn shape(token: &str) -> String {
    let mut out = String::new();
    let mut last = None;
    for c in token.chars() {
        let class = if c.is_uppercase() {
            'X'
        } else if c.is_lowercase() {
            'x'
        } else if c.is_ascii_digit() {
            'd'
        } else {
            c
        };
        if last != Some(class) {
            out.push(class);
            last = Some(class);
        }
    }
    out
}

fn lexicon(token: &str, out: &mut Vec<String>) {
    let word = stripped_lower(token);
    let word = if word.is_empty() { token.to_string() } else { word };
    let lists: [(&str, &[&str]); 7] = [
        ("first_name", FIRST_NAMES),
        ("publisher", PUBLISHER_WORDS),
        ("month", MONTHS),
        ("journal", JOURNAL_WORDS),
        ("editor", EDITOR_WORDS),
        ("volume", VOLUME_WORDS),
        ("conjunction", CONJUNCTIONS),
    ];
    for (name, words) in lists {
        if words.contains(&word.as_str()) {
            out.push(format!("lex={name}"));
        }
    }
}

fn enclosure(token: &str, out: &mut Vec<String>) {
    let first = token.chars().next();
    let last = token.trim_end_matches(['.', ',', ';', ':']).chars().last();
    match first {
        Some('(') => out.push("open=paren".to_string()),
        Some('[') => out.push("open=bracket".to_string()),
        Some('"' | '“' | '‘' | '«') => out.push("open=quote".to_string()),
        _ => {}
    }
    match last {
        Some(')') => out.push("close=paren".to_string()),
        Some(']') => out.push("close=bracket".to_string()),
        Some('"' | '”' | '’' | '»') => out.push("close=quote".to_string()),
        _ => {}
    }
}
