//! Cross-fold averaging of feature weights

use attrprobe_classifiers::FeatureWeight;
use std::collections::BTreeMap;

/// Mean weight per feature over the folds that reported it, sorted by
/// descending mean with ties broken by feature name
pub fn mean_weights<'a, I>(folds: I) -> Vec<FeatureWeight>
where
    I: IntoIterator<Item = &'a [FeatureWeight]>,
{
    let mut totals: BTreeMap<&'a str, (f64, usize)> = BTreeMap::new();
    for fold in folds {
        for record in fold {
            let entry = totals.entry(record.feature.as_str()).or_insert((0.0, 0));
            entry.0 += record.weight;
            entry.1 += 1;
        }
    }

    let mut means: Vec<FeatureWeight> = totals
        .into_iter()
        .map(|(feature, (sum, count))| FeatureWeight::new(feature, sum / count as f64))
        .collect();

    means.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    means
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_over_reporting_folds_only() {
        let fold_a = vec![FeatureWeight::new("x", 2.0), FeatureWeight::new("y", 1.0)];
        let fold_b = vec![FeatureWeight::new("x", 4.0)];

        let means = mean_weights([fold_a.as_slice(), fold_b.as_slice()]);
        assert_eq!(
            means,
            vec![FeatureWeight::new("x", 3.0), FeatureWeight::new("y", 1.0)]
        );
    }

    #[test]
    fn test_ties_sorted_by_name() {
        let fold = vec![
            FeatureWeight::new("beta", -1.0),
            FeatureWeight::new("zeta", 0.5),
            FeatureWeight::new("alpha", 0.5),
        ];
        let names: Vec<String> = mean_weights([fold.as_slice()])
            .into_iter()
            .map(|w| w.feature)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta", "beta"]);
    }

    #[test]
    fn test_no_folds() {
        assert!(mean_weights(std::iter::empty::<&[FeatureWeight]>()).is_empty());
    }
}
