//! Random forest regressor: bootstrap-sampled trees, averaged.

use super::tree::{RegressionTree, TreeConfig};
use super::{FittedRegressor, Regressor};
use crate::error::{CaloriesError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Hyperparameters of the forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForestConfig {
    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Unfitted random forest.
#[derive(Clone, Debug, Default)]
pub struct RandomForestRegressor {
    config: RandomForestConfig,
}

impl RandomForestRegressor {
    pub fn new(config: RandomForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }
}

/// Each tree gets its own stream so results do not depend on thread scheduling.
fn tree_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Regressor for RandomForestRegressor {
    type Fitted = FittedRandomForest;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self::Fitted> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(CaloriesError::EmptyData(
                "Cannot fit RandomForest on empty data".to_string(),
            ));
        }
        if self.config.n_estimators == 0 {
            return Err(CaloriesError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        let tree_config = self.config.tree_config();
        tree_config.validate()?;

        let y = y.to_vec();
        let features: Vec<usize> = (0..n_features).collect();

        let trees = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(tree_seed(self.config.seed, i));
                let rows: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                RegressionTree::fit(&tree_config, x, &y, &rows, &features, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FittedRandomForest { trees, n_features })
    }
}

/// Fitted random forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedRandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl FittedRandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.trees.is_empty()
            && self
                .trees
                .iter()
                .all(|t| t.n_features() == self.n_features && t.is_well_formed())
    }
}

impl FittedRegressor for FittedRandomForest {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }
}
