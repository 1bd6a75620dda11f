//! Core types for attrprobe

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single generated response with its author attribute and generation group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The generated text
    pub text: String,

    /// Raw attribute value (e.g. "F", "Faculty")
    pub label: String,

    /// Generation group (seed) used to partition folds
    pub group_id: i64,
}

impl Document {
    /// Create a new document
    pub fn new(text: impl Into<String>, label: impl Into<String>, group_id: i64) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            group_id,
        }
    }
}

/// An immutable, validated table of documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Build a corpus, rejecting documents with empty text or label
    pub fn new(documents: Vec<Document>) -> Result<Self> {
        if let Some(pos) = documents
            .iter()
            .position(|d| d.text.trim().is_empty() || d.label.trim().is_empty())
        {
            return Err(Error::data(format!(
                "document {} has empty text or label",
                pos
            )));
        }

        Ok(Self { documents })
    }

    /// All documents in input order
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus has no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Texts in document order
    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.text.as_str()).collect()
    }

    /// Labels in document order
    pub fn labels(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.label.as_str()).collect()
    }

    /// Group ids in document order
    pub fn group_ids(&self) -> Vec<i64> {
        self.documents.iter().map(|d| d.group_id).collect()
    }

    /// Distinct labels, sorted
    pub fn distinct_labels(&self) -> BTreeSet<&str> {
        self.documents.iter().map(|d| d.label.as_str()).collect()
    }

    /// Distinct group ids, ascending
    pub fn distinct_groups(&self) -> BTreeSet<i64> {
        self.documents.iter().map(|d| d.group_id).collect()
    }
}

/// Feature representation of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    /// TF-IDF over topical vocabulary (stopwords and honorifics removed)
    #[serde(rename = "content")]
    Content,

    /// Standardised counts over stopwords only
    #[serde(rename = "stopwords")]
    FunctionWords,
}

impl Mode {
    /// All modes in reporting order
    pub const ALL: [Mode; 2] = [Mode::Content, Mode::FunctionWords];

    /// Stable key used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::FunctionWords => "stopwords",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "stopwords" | "function_words" | "function-words" => Ok(Self::FunctionWords),
            other => Err(Error::config(format!(
                "mode must be 'content' or 'stopwords', got '{}'",
                other
            ))),
        }
    }
}
