//! Gradient-boosted regression trees (squared error).
//!
//! Training starts from the target mean and adds one shallow tree per round,
//! fitted to the current residuals on a row subsample and a column subsample,
//! shrunk by the learning rate.
//!
//! Training is compiled only with the `boosting` feature. A fitted model can
//! always be loaded and used for prediction.

use super::tree::RegressionTree;
use super::FittedRegressor;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

#[cfg(feature = "boosting")]
use super::tree::TreeConfig;
#[cfg(feature = "boosting")]
use super::Regressor;
#[cfg(feature = "boosting")]
use crate::error::{CaloriesError, Result};
#[cfg(feature = "boosting")]
use ndarray::{Array1, Array2};
#[cfg(feature = "boosting")]
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// Hyperparameters of the boosted ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) for each round.
    pub subsample: f64,
    /// Fraction of columns drawn for each tree.
    pub colsample_bytree: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 800,
            max_depth: 6,
            learning_rate: 0.05,
            subsample: 0.9,
            colsample_bytree: 0.9,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[cfg(feature = "boosting")]
impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(CaloriesError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(CaloriesError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [
            ("subsample", self.subsample),
            ("colsample_bytree", self.colsample_bytree),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CaloriesError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Unfitted boosted ensemble.
#[cfg(feature = "boosting")]
#[derive(Clone, Debug, Default)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
}

#[cfg(feature = "boosting")]
impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }
}

#[cfg(feature = "boosting")]
fn fraction_of(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).round() as usize).clamp(1, n)
}

#[cfg(feature = "boosting")]
impl Regressor for GradientBoostingRegressor {
    type Fitted = FittedGradientBoosting;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self::Fitted> {
        self.config.validate()?;
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(CaloriesError::EmptyData(
                "Cannot fit GradientBoosting on empty data".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(CaloriesError::InvalidParameter(
                "GradientBoosting needs at least one feature".to_string(),
            ));
        }

        let tree_config = TreeConfig {
            max_depth: Some(self.config.max_depth),
            min_samples_leaf: self.config.min_samples_leaf,
            ..TreeConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let n_rows = fraction_of(n_samples, self.config.subsample);
        let n_cols = fraction_of(n_features, self.config.colsample_bytree);

        let base = y.mean().unwrap_or(0.0);
        let mut predictions = vec![base; n_samples];
        let mut residuals = vec![0.0; n_samples];
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            for (r, (t, p)) in residuals.iter_mut().zip(y.iter().zip(&predictions)) {
                *r = t - p;
            }
            let mut rows = index::sample(&mut rng, n_samples, n_rows).into_vec();
            rows.sort_unstable();
            let mut features = index::sample(&mut rng, n_features, n_cols).into_vec();
            features.sort_unstable();

            let tree = RegressionTree::fit(&tree_config, x, &residuals, &rows, &features, &mut rng)?;
            for (i, p) in predictions.iter_mut().enumerate() {
                *p += self.config.learning_rate * tree.predict_row(x.row(i));
            }
            trees.push(tree);
        }

        Ok(FittedGradientBoosting {
            base,
            learning_rate: self.config.learning_rate,
            trees,
            n_features,
        })
    }
}

/// Fitted boosted ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedGradientBoosting {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl FittedGradientBoosting {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.base.is_finite()
            && self.learning_rate.is_finite()
            && self
                .trees
                .iter()
                .all(|t| t.n_features() == self.n_features && t.is_well_formed())
    }
}

impl FittedRegressor for FittedGradientBoosting {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.base
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    fn n_features_in(&self) -> usize {
        self.n_features
    }
}

#[cfg(all(test, feature = "boosting"))]
mod tests {
    use super::*;
    use ndarray::array;

    fn quadratic_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 3), |(i, j)| match j {
            0 => i as f64 / 6.0,
            1 => (i % 7) as f64,
            _ => (i % 2) as f64,
        });
        let y = x.column(0).mapv(|v| v * v) + x.column(2).mapv(|v| 5.0 * v);
        (x, y)
    }

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            n_estimators: 150,
            max_depth: 3,
            learning_rate: 0.1,
            ..GradientBoostingConfig::default()
        }
    }

    #[test]
    fn test_boosting_reduces_training_error() {
        let (x, y) = quadratic_data();
        let model = GradientBoostingRegressor::new(small_config()).fit(&x, &y).unwrap();

        let preds = model.predict_batch(&x).unwrap();
        let mean = y.mean().unwrap();
        let baseline: f64 = y.iter().map(|t| (t - mean).abs()).sum::<f64>() / y.len() as f64;
        let mae: f64 =
            preds.iter().zip(y.iter()).map(|(p, t)| (p - t).abs()).sum::<f64>() / y.len() as f64;
        assert!(mae < baseline / 5.0, "mae={} baseline={}", mae, baseline);
    }

    #[test]
    fn test_boosting_single_round_moves_toward_target() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 10.0];
        let config = GradientBoostingConfig {
            n_estimators: 1,
            learning_rate: 0.5,
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..GradientBoostingConfig::default()
        };
        let model = GradientBoostingRegressor::new(config).fit(&x, &y).unwrap();
        // base 5, residuals -5/+5, half a step
        assert_eq!(model.predict_row(array![0.0].view()), 2.5);
        assert_eq!(model.predict_row(array![1.0].view()), 7.5);
    }

    #[test]
    fn test_boosting_is_deterministic_for_seed() {
        let (x, y) = quadratic_data();
        let a = GradientBoostingRegressor::new(small_config()).fit(&x, &y).unwrap();
        let b = GradientBoostingRegressor::new(small_config()).fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_boosting_rejects_bad_subsample() {
        let (x, y) = quadratic_data();
        let config = GradientBoostingConfig {
            subsample: 1.5,
            ..small_config()
        };
        assert!(matches!(
            GradientBoostingRegressor::new(config).fit(&x, &y),
            Err(CaloriesError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_boosting_rejects_zero_features() {
        let x = Array2::<f64>::zeros((10, 0));
        let y = Array1::from(vec![1.0; 10]);
        assert!(matches!(
            GradientBoostingRegressor::new(small_config()).fit(&x, &y),
            Err(CaloriesError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_boosting_pipeline_with_zero_columns_is_an_error() {
        use crate::model::{Hyperparameters, ModelKind};
        use crate::pipeline::build_pipeline;

        let x = Array2::<f64>::zeros((10, 0));
        let y = Array1::from(vec![1.0; 10]);
        let pipeline = build_pipeline(ModelKind::GradientBoosting, &Hyperparameters::default()).unwrap();
        assert!(pipeline.fit(&x, &y, Vec::new()).is_err());
    }

    #[test]
    fn test_fraction_of_never_zero() {
        assert_eq!(fraction_of(5, 0.01), 1);
        assert_eq!(fraction_of(5, 0.9), 5);
        assert_eq!(fraction_of(10, 0.9), 9);
    }
}
