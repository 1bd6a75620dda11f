//! Demographic attributes and reference-category label encoding
//!
//! Every attribute has a fixed, ordered category set whose first entry is the
//! reference category (domain ordinal 0). The inferential estimator uses the
//! *last* internal class as its baseline, so the encoder moves the reference
//! category to internal index `K-1` and shifts every other category down by
//! one. [`LabelEncoder::domain_ordinal`] undoes the shift for reporting.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A demographic dimension being probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Sex,
    RaceEthnicity,
    PatronType,
}

/// Ordered category table for one attribute
#[derive(Debug, Clone, Copy)]
pub struct CategoryTable {
    /// Categories in domain order; index is the domain ordinal
    pub categories: &'static [&'static str],

    /// Domain ordinal of the reference category
    pub reference: usize,
}

const SEX: CategoryTable = CategoryTable {
    categories: &["F", "M"],
    reference: 0,
};

const RACE_ETHNICITY: CategoryTable = CategoryTable {
    categories: &[
        "White",
        "Black or African American",
        "Asian or Pacific Islander",
        "American Indian or Alaska Native",
        "Two or More Races",
        "Hispanic or Latino",
    ],
    reference: 0,
};

const PATRON_TYPE: CategoryTable = CategoryTable {
    categories: &[
        "Undergraduate student",
        "Graduate student",
        "Faculty",
        "Staff",
        "Alumni",
        "Outside user",
    ],
    reference: 0,
};

impl Attribute {
    /// All attributes in reporting order
    pub const ALL: [Attribute; 3] = [
        Attribute::Sex,
        Attribute::RaceEthnicity,
        Attribute::PatronType,
    ];

    /// Field name of this attribute in generation logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sex => "sex",
            Self::RaceEthnicity => "race_ethnicity",
            Self::PatronType => "patron_type",
        }
    }

    /// The attribute's category table
    pub fn table(&self) -> &'static CategoryTable {
        match self {
            Self::Sex => &SEX,
            Self::RaceEthnicity => &RACE_ETHNICITY,
            Self::PatronType => &PATRON_TYPE,
        }
    }

    /// Number of categories
    pub fn num_classes(&self) -> usize {
        self.table().categories.len()
    }

    /// The reference (baseline) category
    pub fn reference_category(&self) -> &'static str {
        let table = self.table();
        table.categories[table.reference]
    }

    /// Find the attribute whose category set equals the observed label set
    pub fn detect<'a, I>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let observed: BTreeSet<&str> = labels.into_iter().collect();

        Self::ALL
            .into_iter()
            .find(|attr| attr.matches(&observed))
            .ok_or_else(|| Error::label_mismatch("any attribute", observed.iter().copied()))
    }

    fn matches(&self, observed: &BTreeSet<&str>) -> bool {
        let expected: BTreeSet<&str> = self.table().categories.iter().copied().collect();
        &expected == observed
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sex" => Ok(Self::Sex),
            "race_ethnicity" | "race-ethnicity" | "race" => Ok(Self::RaceEthnicity),
            "patron_type" | "patron-type" | "patron" => Ok(Self::PatronType),
            other => Err(Error::config(format!(
                "attribute must be one of sex, race_ethnicity, patron_type; got '{}'",
                other
            ))),
        }
    }
}

/// Maps raw labels of one attribute to internal class indices
///
/// Internal order: non-reference categories in domain order, then the
/// reference category.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    attribute: Attribute,
    classes: Vec<&'static str>,
}

impl LabelEncoder {
    /// Build the encoder for an attribute without checking any labels
    pub fn for_attribute(attribute: Attribute) -> Self {
        let table = attribute.table();
        let mut classes: Vec<&'static str> = table
            .categories
            .iter()
            .enumerate()
            .filter(|(ordinal, _)| *ordinal != table.reference)
            .map(|(_, c)| *c)
            .collect();
        classes.push(table.categories[table.reference]);

        Self { attribute, classes }
    }

    /// Build the encoder and check that `labels` cover the category set exactly
    pub fn fit<'a, I>(attribute: Attribute, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let observed: BTreeSet<&str> = labels.into_iter().collect();
        if !attribute.matches(&observed) {
            return Err(Error::label_mismatch(
                attribute.as_str(),
                observed.iter().copied(),
            ));
        }

        let encoder = Self::for_attribute(attribute);
        debug!(
            attribute = %attribute,
            classes = ?encoder.classes,
            "label encoder fitted"
        );
        Ok(encoder)
    }

    /// The attribute this encoder belongs to
    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Categories in internal index order
    pub fn classes(&self) -> &[&'static str] {
        &self.classes
    }

    /// Number of classes
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Internal index of the reference category (always `K-1`)
    pub fn reference_index(&self) -> usize {
        self.classes.len() - 1
    }

    /// Encode a single label
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| *c == label)
            .ok_or_else(|| Error::label_mismatch(self.attribute.as_str(), [label]))
    }

    /// Encode a sequence of labels
    pub fn transform<'a, I>(&self, labels: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels.into_iter().map(|l| self.encode(l)).collect()
    }

    /// Raw label for an internal index
    pub fn decode(&self, index: usize) -> Option<&'static str> {
        self.classes.get(index).copied()
    }

    /// Domain ordinal (as documented for reports) for an internal index
    pub fn domain_ordinal(&self, index: usize) -> Option<usize> {
        let label = self.decode(index)?;
        self.attribute
            .table()
            .categories
            .iter()
            .position(|c| *c == label)
    }
}
