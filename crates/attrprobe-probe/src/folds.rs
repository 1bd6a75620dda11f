//! Leave-one-group-out fold construction

use attrprobe_core::{Error, Result};
use std::collections::BTreeMap;

/// One cross-validation split: every document of `group` is held out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Held-out group id
    pub group: i64,

    /// Row indices used for training, ascending
    pub train: Vec<usize>,

    /// Row indices used for testing, ascending
    pub test: Vec<usize>,
}

/// One fold per distinct group id, in ascending group order
///
/// Fails when there are no rows or only one group, since a fold would then
/// have nothing to train on.
pub fn leave_one_group_out(groups: &[i64]) -> Result<Vec<Fold>> {
    if groups.is_empty() {
        return Err(Error::data("cannot build folds over zero documents"));
    }

    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, group) in groups.iter().enumerate() {
        members.entry(*group).or_default().push(row);
    }

    if members.len() < 2 {
        let group = groups[0];
        return Err(Error::data(format!(
            "fold for group {} has an empty training partition",
            group
        )));
    }

    Ok(members
        .into_iter()
        .map(|(group, test)| {
            let train = groups
                .iter()
                .enumerate()
                .filter(|(_, g)| **g != group)
                .map(|(row, _)| row)
                .collect();
            Fold { group, train, test }
        })
        .collect())
}
