//! Stopword configuration
//!
//! The set is built once at startup and passed by reference into the
//! tokenizer. It is never mutated after construction.

use attrprobe_core::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// NLTK English stopword list
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "am", "an", "and", "any",
    "are", "aren", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
    "between", "both", "but", "by", "can", "couldn", "couldn't", "d", "did", "didn", "didn't",
    "do", "does", "doesn", "doesn't", "doing", "don", "don't", "down", "during", "each", "few",
    "for", "from", "further", "had", "hadn", "hadn't", "has", "hasn", "hasn't", "have", "haven",
    "haven't", "having", "he", "he'd", "he'll", "he's", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "i'd", "i'll", "i'm", "i've", "if", "in", "into", "is", "isn",
    "isn't", "it", "it'd", "it'll", "it's", "its", "itself", "just", "ll", "m", "ma", "me",
    "mightn", "mightn't", "more", "most", "mustn", "mustn't", "my", "myself", "needn",
    "needn't", "no", "nor", "not", "now", "o", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "ourselves", "out", "over", "own", "re", "s", "same", "shan", "shan't", "she",
    "she'd", "she'll", "she's", "should", "should've", "shouldn", "shouldn't", "so", "some",
    "such", "t", "than", "that", "that'll", "the", "their", "theirs", "them", "themselves",
    "then", "there", "these", "they", "they'd", "they'll", "they're", "they've", "this",
    "those", "through", "to", "too", "under", "until", "up", "ve", "very", "was", "wasn",
    "wasn't", "we", "we'd", "we'll", "we're", "we've", "were", "weren", "weren't", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "won", "won't",
    "wouldn", "wouldn't", "y", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

/// Honorifics excluded from content features
pub const DEFAULT_HONORIFICS: &[&str] = &["mr", "ms", "mrs", "miss"];

/// Immutable stopword configuration
#[derive(Debug, Clone)]
pub struct StopwordSet {
    stopwords: HashSet<String>,
    content_exclusions: HashSet<String>,
}

impl StopwordSet {
    /// Build from explicit stopwords and content-mode extras
    pub fn new<I, J, S, T>(stopwords: I, honorifics: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let stopwords: HashSet<String> = stopwords
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut content_exclusions = stopwords.clone();
        content_exclusions.extend(
            honorifics
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );

        Self {
            stopwords,
            content_exclusions,
        }
    }

    /// The embedded English list with the default honorifics
    pub fn english() -> Self {
        Self::new(ENGLISH_STOPWORDS.iter(), DEFAULT_HONORIFICS.iter())
    }

    /// Load stopwords from a file with one word per line (`#` starts a comment)
    pub fn from_file<J, T>(path: impl AsRef<Path>, honorifics: J) -> Result<Self>
    where
        J: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read stopword file {}: {}",
                path.display(),
                e
            ))
        })?;

        let words: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();

        if words.is_empty() {
            return Err(Error::config(format!(
                "Stopword file {} contains no words",
                path.display()
            )));
        }

        info!("Loaded {} stopwords from {}", words.len(), path.display());
        Ok(Self::new(words, honorifics))
    }

    /// Whether a normalised token is a stopword
    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Whether a normalised token is excluded from content features
    pub fn excludes_from_content(&self, token: &str) -> bool {
        self.content_exclusions.contains(token)
    }

    /// Number of stopwords (honorifics not counted)
    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    /// Whether the stopword list is empty
    pub fn is_empty(&self) -> bool {
        self.stopwords.is_empty()
    }
}

impl Default for StopwordSet {
    fn default() -> Self {
        Self::english()
    }
}
