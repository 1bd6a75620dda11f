//! attrprobe Core
//!
//! Core types shared across the attrprobe probing pipeline.
//!
//! This crate provides:
//! - Documents and corpora (the flat text/label/group table)
//! - Feature representation modes
//! - Attribute category tables and reference-category label encoding
//! - Error types and result handling

pub mod attribute;
pub mod error;
pub mod types;

pub use attribute::{Attribute, CategoryTable, LabelEncoder};
pub use error::{Error, Result};
pub use types::{Corpus, Document, Mode};

/// Seed used for every model instantiation
pub const RANDOM_SEED: u64 = 42;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::attribute::{Attribute, LabelEncoder};
    pub use crate::error::{Error, Result};
    pub use crate::types::{Corpus, Document, Mode};
    pub use crate::RANDOM_SEED;
}
