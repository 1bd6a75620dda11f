//! Gradient-boosted decision trees
//!
//! Second-order boosting with exact greedy splits grown level by level.
//! Binary targets use a logistic objective with a single tree per round;
//! multiclass targets use softmax with one tree per class per round. Split
//! gain and leaf weights carry L1 (`reg_alpha`) and L2 (`reg_lambda`)
//! penalties on the leaf weights.

use crate::classifier::{
    check_prediction_input, check_training_input, not_fitted, Classifier, ClassifierKind,
};
use crate::config::BoostingConfig;
use crate::logistic::argmax;
use crate::weights::RawWeights;
use attrprobe_core::Result;
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Hessian floor
const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Best split found for one frontier node
#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Node awaiting a split decision at the current depth
#[derive(Debug, Clone, Copy)]
struct Frontier {
    node: usize,
    grad: f64,
    hess: f64,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    sorted: &'a [Vec<usize>],
    config: &'a BoostingConfig,
}

impl<'a> TreeBuilder<'a> {
    fn soft_threshold(&self, g: f64) -> f64 {
        let alpha = self.config.reg_alpha;
        if g > alpha {
            g - alpha
        } else if g < -alpha {
            g + alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let t = self.soft_threshold(g);
        t * t / (h + self.config.reg_lambda)
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -self.soft_threshold(g) / (h + self.config.reg_lambda) * self.config.learning_rate
    }

    /// Grow one tree over the sampled `rows` using only `columns`
    fn build(
        &self,
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        columns: &[usize],
        split_counts: &mut BTreeMap<usize, u32>,
    ) -> Tree {
        let n = self.x.nrows();
        let mut nodes = vec![Node::Leaf(0.0)];

        // frontier slot of every row still in a growing node
        let mut slot: Vec<Option<usize>> = vec![None; n];
        let (mut g_root, mut h_root) = (0.0, 0.0);
        for &r in rows {
            slot[r] = Some(0);
            g_root += grad[r];
            h_root += hess[r];
        }
        let mut frontier = vec![Frontier {
            node: 0,
            grad: g_root,
            hess: h_root,
        }];

        for _depth in 0..self.config.max_depth {
            if frontier.is_empty() {
                break;
            }
            let best = self.find_splits(grad, hess, &slot, &frontier, columns);

            let mut next = Vec::new();
            let mut routes: Vec<Option<(Candidate, usize)>> = vec![None; frontier.len()];
            for (k, front) in frontier.iter().enumerate() {
                match best[k] {
                    Some(candidate) => {
                        let left = nodes.len();
                        nodes.push(Node::Leaf(0.0));
                        nodes.push(Node::Leaf(0.0));
                        nodes[front.node] = Node::Split {
                            feature: candidate.feature,
                            threshold: candidate.threshold,
                            left,
                            right: left + 1,
                        };
                        *split_counts.entry(candidate.feature).or_insert(0) += 1;
                        routes[k] = Some((candidate, next.len()));
                        next.push(Frontier {
                            node: left,
                            grad: 0.0,
                            hess: 0.0,
                        });
                        next.push(Frontier {
                            node: left + 1,
                            grad: 0.0,
                            hess: 0.0,
                        });
                    }
                    None => {
                        nodes[front.node] = Node::Leaf(self.leaf_value(front.grad, front.hess));
                    }
                }
            }

            for r in 0..n {
                let Some(k) = slot[r] else { continue };
                slot[r] = routes[k].map(|(candidate, first)| {
                    let child = if self.x[[r, candidate.feature]] < candidate.threshold {
                        first
                    } else {
                        first + 1
                    };
                    next[child].grad += grad[r];
                    next[child].hess += hess[r];
                    child
                });
            }
            frontier = next;
        }

        for front in &frontier {
            nodes[front.node] = Node::Leaf(self.leaf_value(front.grad, front.hess));
        }

        Tree { nodes }
    }

    /// Exact greedy scan over presorted columns for every frontier node
    fn find_splits(
        &self,
        grad: &[f64],
        hess: &[f64],
        slot: &[Option<usize>],
        frontier: &[Frontier],
        columns: &[usize],
    ) -> Vec<Option<Candidate>> {
        let mcw = self.config.min_child_weight;
        let mut best: Vec<Option<Candidate>> = vec![None; frontier.len()];

        for &feature in columns {
            let mut left_g = vec![0.0; frontier.len()];
            let mut left_h = vec![0.0; frontier.len()];
            let mut previous: Vec<Option<f64>> = vec![None; frontier.len()];

            for &r in &self.sorted[feature] {
                let Some(k) = slot[r] else { continue };
                let value = self.x[[r, feature]];

                if let Some(prev) = previous[k] {
                    if value > prev {
                        let front = &frontier[k];
                        let (gl, hl) = (left_g[k], left_h[k]);
                        let (gr, hr) = (front.grad - gl, front.hess - hl);
                        if hl >= mcw && hr >= mcw {
                            let gain = self.score(gl, hl) + self.score(gr, hr)
                                - self.score(front.grad, front.hess);
                            let improves = match best[k] {
                                Some(current) => gain > current.gain,
                                None => gain > 0.0,
                            };
                            if improves {
                                best[k] = Some(Candidate {
                                    feature,
                                    threshold: prev + (value - prev) / 2.0,
                                    gain,
                                });
                            }
                        }
                    }
                }

                left_g[k] += grad[r];
                left_h[k] += hess[r];
                previous[k] = Some(value);
            }
        }

        best
    }
}

#[derive(Debug, Clone)]
struct FittedBoosting {
    /// `rounds[t][g]` is the tree for output group `g` in round `t`
    rounds: Vec<Vec<Tree>>,
    n_features: usize,
    n_classes: usize,
    split_counts: BTreeMap<usize, u32>,
}

impl FittedBoosting {
    fn n_groups(&self) -> usize {
        output_groups(self.n_classes)
    }

    fn margins(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let mut margins = vec![0.0; self.n_groups()];
        for round in &self.rounds {
            for (g, tree) in round.iter().enumerate() {
                margins[g] += tree.predict(row);
            }
        }
        margins
    }
}

fn output_groups(n_classes: usize) -> usize {
    if n_classes == 2 {
        1
    } else {
        n_classes
    }
}

/// Gradient-boosted tree classifier
#[derive(Debug, Clone)]
pub struct BoostingClassifier {
    config: BoostingConfig,
    fitted: Option<FittedBoosting>,
}

impl BoostingClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Total number of trees in the fitted ensemble
    pub fn n_trees(&self) -> usize {
        self.fitted
            .as_ref()
            .map(|f| f.rounds.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn sample_rows(&self, n: usize, rng: &mut StdRng) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        (0..n)
            .filter(|_| rng.gen::<f64>() < self.config.subsample)
            .collect()
    }

    fn sample_columns(&self, p: usize, rng: &mut StdRng) -> Vec<usize> {
        let k = ((p as f64) * self.config.colsample_bytree).round() as usize;
        let k = k.clamp(1, p);
        let mut columns = sample(rng, p, k).into_vec();
        columns.sort_unstable();
        columns
    }
}

impl Default for BoostingClassifier {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

impl Classifier for BoostingClassifier {
    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Xgboost
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(x, y, n_classes)?;
        let (n, p) = x.dim();
        let groups = output_groups(n_classes);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let sorted: Vec<Vec<usize>> = (0..p)
            .map(|f| {
                let mut idx: Vec<usize> = (0..n).collect();
                idx.sort_by(|&a, &b| {
                    x[[a, f]]
                        .partial_cmp(&x[[b, f]])
                        .unwrap_or(Ordering::Equal)
                });
                idx
            })
            .collect();

        let builder = TreeBuilder {
            x,
            sorted: &sorted,
            config: &self.config,
        };

        let mut margins = vec![vec![0.0; groups]; n];
        let mut rounds = Vec::with_capacity(self.config.n_estimators);
        let mut split_counts = BTreeMap::new();
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for _ in 0..self.config.n_estimators {
            let probs: Vec<Vec<f64>> = margins.iter().map(|m| probabilities(m)).collect();
            let mut round = Vec::with_capacity(groups);

            for g in 0..groups {
                for i in 0..n {
                    let (gi, hi) = if groups == 1 {
                        let p = probs[i][0];
                        let target = if y[i] == 1 { 1.0 } else { 0.0 };
                        (p - target, (p * (1.0 - p)).max(MIN_HESSIAN))
                    } else {
                        let p = probs[i][g];
                        let target = if y[i] == g { 1.0 } else { 0.0 };
                        (p - target, (2.0 * p * (1.0 - p)).max(MIN_HESSIAN))
                    };
                    grad[i] = gi;
                    hess[i] = hi;
                }

                let rows = self.sample_rows(n, &mut rng);
                let columns = self.sample_columns(p, &mut rng);
                let tree = builder.build(&grad, &hess, &rows, &columns, &mut split_counts);
                round.push(tree);
            }

            for (i, m) in margins.iter_mut().enumerate() {
                for (g, tree) in round.iter().enumerate() {
                    m[g] += tree.predict(x.row(i));
                }
            }
            rounds.push(round);
        }

        debug!(
            rounds = rounds.len(),
            groups,
            splits = split_counts.values().sum::<u32>(),
            "boosting finished"
        );

        self.fitted = Some(FittedBoosting {
            rounds,
            n_features: p,
            n_classes,
            split_counts,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        check_prediction_input(x, fitted.n_features)?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                let margins = fitted.margins(row);
                if fitted.n_groups() == 1 {
                    usize::from(margins[0] > 0.0)
                } else {
                    argmax(margins)
                }
            })
            .collect())
    }

    fn raw_weights(&self) -> Result<RawWeights> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.kind()))?;
        Ok(RawWeights::SplitCounts(fitted.split_counts.clone()))
    }
}

/// Sigmoid of a single margin, softmax of several
fn probabilities(margins: &[f64]) -> Vec<f64> {
    if margins.len() == 1 {
        return vec![1.0 / (1.0 + (-margins[0]).exp())];
    }
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
