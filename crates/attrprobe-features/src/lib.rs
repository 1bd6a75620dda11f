//! attrprobe Features
//!
//! Turns raw response text into fixed-width numeric feature matrices.
//!
//! Two representations are supported:
//! - Content: TF-IDF over non-stopword tokens (honorifics excluded)
//! - Function words: standardised counts over stopword tokens only

pub mod encoder;
pub mod stopwords;
pub mod tokenizer;
pub mod vectorizer;

pub use encoder::{
    FeatureBudget, FeatureEncoder, FeatureMatrix, DEFAULT_MAX_FEATURES,
    DEFAULT_REDUCED_MAX_FEATURES,
};
pub use stopwords::{StopwordSet, DEFAULT_HONORIFICS, ENGLISH_STOPWORDS};
pub use tokenizer::tokenize;
pub use vectorizer::{StandardScaler, TfidfTransformer, Vocabulary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::encoder::{FeatureBudget, FeatureEncoder, FeatureMatrix};
    pub use crate::stopwords::StopwordSet;
    pub use crate::tokenizer::tokenize;
}
