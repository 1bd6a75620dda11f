//! Vocabulary selection, count matrices, TF-IDF weighting and standardisation

use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;

/// Ordered feature vocabulary; column `i` of a feature matrix is `names()[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Select at most `budget` terms from tokenized documents.
    ///
    /// Terms are ranked by corpus-wide count (ties alphabetical); the kept
    /// terms are then ordered alphabetically.
    pub fn fit(docs: &[Vec<String>], budget: usize) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for doc in docs {
            for token in doc {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(budget);

        let mut names: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        names.sort();

        Self::from_names(names)
    }

    /// Build from an already ordered list of names
    pub fn from_names(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Column index of a term
    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Feature names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no term qualified
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Raw term counts, one row per document
    pub fn count_matrix(&self, docs: &[Vec<String>]) -> Array2<f64> {
        let mut counts = Array2::<f64>::zeros((docs.len(), self.len()));
        for (row, doc) in docs.iter().enumerate() {
            for token in doc {
                if let Some(col) = self.get(token) {
                    counts[[row, col]] += 1.0;
                }
            }
        }
        counts
    }
}

/// Smoothed inverse document frequency with L2 row normalisation
#[derive(Debug, Clone)]
pub struct TfidfTransformer {
    idf: Array1<f64>,
}

impl TfidfTransformer {
    /// `idf = ln((1 + n) / (1 + df)) + 1`
    pub fn fit(counts: &Array2<f64>) -> Self {
        let n_docs = counts.nrows() as f64;
        let idf = counts
            .axis_iter(Axis(1))
            .map(|col| {
                let df = col.iter().filter(|v| **v > 0.0).count() as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        Self { idf }
    }

    /// Per-feature idf weights
    pub fn idf(&self) -> &Array1<f64> {
        &self.idf
    }

    /// Weight counts by idf, then L2-normalise every non-zero row
    pub fn transform(&self, counts: &Array2<f64>) -> Array2<f64> {
        let mut weighted = counts * &self.idf;
        for mut row in weighted.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row /= norm;
            }
        }
        weighted
    }
}

/// Per-column zero-mean / unit-variance scaling (population variance)
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Compute column means and standard deviations; zero-variance columns keep scale 1
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_cols = x.ncols();
        if x.nrows() == 0 {
            return Self {
                mean: Array1::zeros(n_cols),
                scale: Array1::ones(n_cols),
            };
        }

        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_cols));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });

        Self { mean, scale }
    }

    /// Apply the fitted centring and scaling
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_vocabulary_budget_and_ties() {
        let docs = docs(&[&["b", "a", "c", "c"], &["d", "b", "a"]]);
        // counts: a=2, b=2, c=2, d=1 -> ties broken alphabetically
        let vocab = Vocabulary::fit(&docs, 2);
        assert_eq!(vocab.names(), &["a".to_string(), "b".to_string()]);

        let vocab = Vocabulary::fit(&docs, 10);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.get("d"), Some(3));
    }

    #[test]
    fn test_count_matrix() {
        let docs = docs(&[&["a", "a", "b"], &[]]);
        let vocab = Vocabulary::fit(&docs, 10);
        let counts = vocab.count_matrix(&docs);
        assert_eq!(counts.shape(), &[2, 2]);
        assert_eq!(counts[[0, 0]], 2.0);
        assert_eq!(counts[[1, 0]], 0.0);
    }

    #[test]
    fn test_tfidf_rows_are_unit_norm() {
        let docs = docs(&[&["x", "y"], &["x"], &[]]);
        let vocab = Vocabulary::fit(&docs, 10);
        let counts = vocab.count_matrix(&docs);
        let tfidf = TfidfTransformer::fit(&counts);

        // x appears in 2 of 3 docs, y in 1 of 3
        let expected_x = (4.0f64 / 3.0).ln() + 1.0;
        assert!((tfidf.idf()[0] - expected_x).abs() < 1e-12);

        let weighted = tfidf.transform(&counts);
        for row in 0..2 {
            let norm: f64 = weighted.row(row).iter().map(|v| v * v).sum();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        assert!(weighted.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_standard_scaler() {
        let x = ndarray::array![[1.0, 5.0], [3.0, 5.0]];
        let scaled = StandardScaler::fit(&x).transform(&x);
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 1.0).abs() < 1e-12);
        assert_eq!(scaled[[0, 1]], 0.0);
        assert_eq!(scaled[[1, 1]], 0.0);
    }
}
