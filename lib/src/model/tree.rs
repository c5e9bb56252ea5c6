//! CART regression tree.
//!
//! Splits minimise the summed squared error of the two children, which is
//! equivalent to maximising `S_l^2 / n_l + S_r^2 / n_r` where `S` is the
//! target sum of a child. Nodes are stored in a flat vector; children always
//! have larger indices than their parent.

use crate::error::{CaloriesError, Result};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Minimum improvement for a split to be kept.
const MIN_GAIN: f64 = 1e-12;

/// Growth limits for a single tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at each split; `None` considers every candidate feature.
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(CaloriesError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(CaloriesError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(CaloriesError::InvalidParameter(
                "max_features must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the given sample `rows` of `x`, restricted to `features`.
    ///
    /// `rows` may contain repeats (bootstrap samples).
    pub fn fit(
        config: &TreeConfig,
        x: &Array2<f64>,
        y: &[f64],
        rows: &[usize],
        features: &[usize],
        rng: &mut StdRng,
    ) -> Result<Self> {
        config.validate()?;
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(CaloriesError::InvalidParameter(format!(
                "x has {} rows but y has {} values",
                n_samples,
                y.len()
            )));
        }
        if rows.is_empty() {
            return Err(CaloriesError::EmptyData(
                "Cannot fit a tree without samples".to_string(),
            ));
        }
        if features.is_empty() || features.iter().any(|&f| f >= n_features) {
            return Err(CaloriesError::InvalidParameter(format!(
                "candidate features {:?} invalid for {} columns",
                features, n_features
            )));
        }

        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack: Vec<(usize, Vec<usize>, usize)> = vec![(0, rows.to_vec(), 0)];

        while let Some((node_id, node_rows, depth)) = stack.pop() {
            let value = mean_of(y, &node_rows);
            let can_split = node_rows.len() >= config.min_samples_split
                && node_rows.len() >= 2 * config.min_samples_leaf
                && config.max_depth.map_or(true, |max| depth < max);

            let best = if can_split {
                let candidates = draw_features(features, config.max_features, rng);
                best_split(x, y, &node_rows, &candidates, config.min_samples_leaf)
            } else {
                None
            };

            match best {
                Some(split) => {
                    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = node_rows
                        .iter()
                        .partition(|&&r| x[[r, split.feature]] <= split.threshold);
                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes[node_id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    stack.push((right, right_rows, depth + 1));
                    stack.push((left, left_rows, depth + 1));
                }
                None => nodes[node_id] = Node::Leaf { value },
            }
        }

        Ok(Self { nodes, n_features })
    }

    /// Predict a single row. The row must have `n_features` entries.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Structural check used after deserialization.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(id, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < self.n_features
                        && !threshold.is_nan()
                        && *left > id
                        && *right > id
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}

fn draw_features(features: &[usize], max_features: Option<usize>, rng: &mut StdRng) -> Vec<usize> {
    match max_features {
        Some(k) if k < features.len() => index::sample(rng, features.len(), k)
            .into_iter()
            .map(|i| features[i])
            .collect(),
        _ => features.to_vec(),
    }
}

fn best_split(
    x: &Array2<f64>,
    y: &[f64],
    rows: &[usize],
    features: &[usize],
    min_samples_leaf: usize,
) -> Option<BestSplit> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| y[r]).sum();
    let parent_score = total * total / n as f64;

    let mut best: Option<BestSplit> = None;
    let mut order: Vec<usize> = rows.to_vec();

    for &feature in features {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += y[order[i]];
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }
            let here = x[[order[i], feature]];
            let next = x[[order[i + 1], feature]];
            if here == next {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            let gain = score - parent_score;
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut threshold = here + (next - here) / 2.0;
                // midpoint can round up to `next` for adjacent floats
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn fit_all(config: &TreeConfig, x: &Array2<f64>, y: &[f64]) -> RegressionTree {
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let features: Vec<usize> = (0..x.ncols()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        RegressionTree::fit(config, x, y, &rows, &features, &mut rng).unwrap()
    }

    #[test]
    fn test_tree_learns_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = [5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let tree = fit_all(&TreeConfig::default(), &x, &y);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_row(array![2.5].view()), 5.0);
        assert_eq!(tree.predict_row(array![11.5].view()), 20.0);
        // threshold is the midpoint between 3 and 10
        assert_eq!(tree.predict_row(array![6.4].view()), 5.0);
        assert_eq!(tree.predict_row(array![6.6].view()), 20.0);
    }

    #[test]
    fn test_tree_picks_informative_feature() {
        // feature 0 is noise, feature 1 determines the target
        let x = array![[3.0, 0.0], [1.0, 0.0], [2.0, 1.0], [0.0, 1.0]];
        let y = [0.0, 0.0, 10.0, 10.0];
        let tree = fit_all(&TreeConfig::default(), &x, &y);

        assert_eq!(tree.predict_row(array![100.0, 0.0].view()), 0.0);
        assert_eq!(tree.predict_row(array![-100.0, 1.0].view()), 10.0);
    }

    #[test]
    fn test_tree_constant_target_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = [7.0, 7.0, 7.0];
        let tree = fit_all(&TreeConfig::default(), &x, &y);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(array![42.0].view()), 7.0);
    }

    #[test]
    fn test_tree_max_depth_zero_predicts_mean() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [1.0, 2.0, 3.0, 6.0];
        let config = TreeConfig {
            max_depth: Some(0),
            ..TreeConfig::default()
        };
        let tree = fit_all(&config, &x, &y);
        assert_eq!(tree.predict_row(array![1.0].view()), 3.0);
    }

    #[test]
    fn test_tree_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = [0.0, 0.0, 0.0, 100.0];
        let config = TreeConfig {
            min_samples_leaf: 2,
            ..TreeConfig::default()
        };
        let tree = fit_all(&config, &x, &y);
        // the outlier cannot be isolated in a leaf of one
        assert_eq!(tree.predict_row(array![4.0].view()), 50.0);
    }

    #[test]
    fn test_tree_rejects_empty_rows() {
        let x = array![[1.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let result = RegressionTree::fit(&TreeConfig::default(), &x, &[1.0], &[], &[0], &mut rng);
        assert!(matches!(result, Err(CaloriesError::EmptyData(_))));
    }

    #[test]
    fn test_tree_rejects_bad_config() {
        let config = TreeConfig {
            min_samples_split: 1,
            ..TreeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tree_is_well_formed_after_fit() {
        let x = array![[1.0, 4.0], [2.0, 3.0], [3.0, 2.0], [4.0, 1.0]];
        let y = [1.0, 2.0, 3.0, 4.0];
        let tree = fit_all(&TreeConfig::default(), &x, &y);
        assert!(tree.is_well_formed());
    }
}
