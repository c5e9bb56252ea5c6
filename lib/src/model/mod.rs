//! Regression model families.
//!
//! Two interchangeable tree ensembles sit behind the same pair of traits:
//!
//! - [`Regressor`]: unfitted estimator holding hyperparameters.
//! - [`FittedRegressor`]: inference-only predictor, serializable.
//!
//! [`ModelKind`] selects the family; [`build_regressor`] turns a kind plus
//! [`Hyperparameters`] into an [`UnfittedModel`]. Requesting the boosted
//! family from a build without the `boosting` feature fails with
//! [`CaloriesError::UnavailableModel`].

pub mod boosting;
pub mod forest;
pub mod tree;

pub use boosting::{FittedGradientBoosting, GradientBoostingConfig};
#[cfg(feature = "boosting")]
pub use boosting::GradientBoostingRegressor;
pub use forest::{FittedRandomForest, RandomForestConfig, RandomForestRegressor};
pub use tree::{RegressionTree, TreeConfig};

use crate::error::{CaloriesError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An unfitted estimator.
pub trait Regressor {
    type Fitted: FittedRegressor;

    /// Learn from `x` (samples × features) and targets `y`.
    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self::Fitted>;
}

/// A fitted estimator ready for inference.
pub trait FittedRegressor {
    /// Predict one row. The row must have [`Self::n_features_in`] entries.
    fn predict_row(&self, row: ArrayView1<f64>) -> f64;

    /// Number of features seen during fit.
    fn n_features_in(&self) -> usize;

    /// Predict every row of `x`.
    fn predict_batch(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features_in() {
            return Err(CaloriesError::FeatureMismatch {
                expected_features: self.n_features_in(),
                got_features: x.ncols(),
            });
        }
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }
}

/// Regressor family selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ModelKind {
    /// Random forest of bootstrap trees.
    #[serde(rename = "rf")]
    #[value(name = "rf")]
    RandomForest,
    /// Gradient-boosted trees.
    #[default]
    #[serde(rename = "gbt", alias = "xgb")]
    #[value(name = "gbt", alias = "xgb")]
    GradientBoosting,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "rf",
            ModelKind::GradientBoosting => "gbt",
        }
    }

    /// Whether this build can train the family.
    pub fn is_available(&self) -> bool {
        match self {
            ModelKind::RandomForest => true,
            ModelKind::GradientBoosting => cfg!(feature = "boosting"),
        }
    }

    /// Fail with [`CaloriesError::UnavailableModel`] unless [`Self::is_available`].
    pub fn ensure_available(&self) -> Result<()> {
        require_available(*self, self.is_available())
    }
}

fn require_available(kind: ModelKind, available: bool) -> Result<()> {
    if available {
        Ok(())
    } else {
        Err(CaloriesError::UnavailableModel {
            requested: kind.to_string(),
            suggestion: format!("--model {}", ModelKind::RandomForest),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters for both families; only the selected one is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub random_forest: RandomForestConfig,
    pub gradient_boosting: GradientBoostingConfig,
}

/// An unfitted estimator of either family.
#[derive(Clone, Debug)]
pub enum UnfittedModel {
    RandomForest(RandomForestRegressor),
    #[cfg(feature = "boosting")]
    GradientBoosting(GradientBoostingRegressor),
}

impl UnfittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            UnfittedModel::RandomForest(_) => ModelKind::RandomForest,
            #[cfg(feature = "boosting")]
            UnfittedModel::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }
}

impl Regressor for UnfittedModel {
    type Fitted = FittedModel;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedModel> {
        match self {
            UnfittedModel::RandomForest(m) => m.fit(x, y).map(FittedModel::RandomForest),
            #[cfg(feature = "boosting")]
            UnfittedModel::GradientBoosting(m) => m.fit(x, y).map(FittedModel::GradientBoosting),
        }
    }
}

/// A fitted estimator of either family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FittedModel {
    RandomForest(FittedRandomForest),
    GradientBoosting(FittedGradientBoosting),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
            FittedModel::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            FittedModel::RandomForest(m) => m.is_well_formed(),
            FittedModel::GradientBoosting(m) => m.is_well_formed(),
        }
    }
}

impl FittedRegressor for FittedModel {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            FittedModel::RandomForest(m) => m.predict_row(row),
            FittedModel::GradientBoosting(m) => m.predict_row(row),
        }
    }

    fn n_features_in(&self) -> usize {
        match self {
            FittedModel::RandomForest(m) => m.n_features_in(),
            FittedModel::GradientBoosting(m) => m.n_features_in(),
        }
    }
}

/// Construct the unfitted regressor for `kind`.
pub fn build_regressor(kind: ModelKind, hyper: &Hyperparameters) -> Result<UnfittedModel> {
    match kind {
        ModelKind::RandomForest => Ok(UnfittedModel::RandomForest(RandomForestRegressor::new(
            hyper.random_forest.clone(),
        ))),
        #[cfg(feature = "boosting")]
        ModelKind::GradientBoosting => Ok(UnfittedModel::GradientBoosting(
            GradientBoostingRegressor::new(hyper.gradient_boosting.clone()),
        )),
        #[cfg(not(feature = "boosting"))]
        ModelKind::GradientBoosting => {
            kind.ensure_available()?;
            Err(CaloriesError::InvalidParameter(format!(
                "no trainer compiled for {}",
                kind
            )))
        }
    }
}
