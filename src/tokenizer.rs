//! Word extraction for utterance matching.
//!
//! Raw utterances are split into normalized [`Word`]s before anything is
//! ranked, so skills only ever see the normalized form. The bundled
//! [`WordTokenizer`] keeps letter and digit runs and lowercases them;
//! embedders with their own extraction plug in through [`Tokenizer`].

use lazy_static::lazy_static;
use mockall::automock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref WORD_PATTERN: Regex =
        Regex::new(r"[\p{L}\p{N}]+").expect("Failed to compile word pattern");
}

/// A single normalized word of an utterance. Construction lowercases, so
/// two words that differ only in case compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word(String);

impl Word {
    pub fn new(raw: &str) -> Self {
        Word(raw.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Word {
    fn from(raw: &str) -> Self {
        Word::new(raw)
    }
}

/// Splits an utterance into the words the ranker scores against.
#[automock]
pub trait Tokenizer: Send + Sync {
    /// Empty input yields an empty sequence; word order is preserved.
    fn tokenize(&self, utterance: &str) -> Vec<Word>;
}

/// Default tokenizer: contiguous letter and digit runs, lowercased.
/// Punctuation and whitespace never reach the skills.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, utterance: &str) -> Vec<Word> {
        WORD_PATTERN
            .find_iter(utterance)
            .map(|m| Word::new(m.as_str()))
            .collect()
    }
}
