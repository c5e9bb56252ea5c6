//! Core traits for preprocessing transformers.
//!
//! - [`Transformer`]: used during fitting; has hyperparameters and learns from data.
//! - [`FittedTransformer`]: after fitting; ready for inference and serialization.

use crate::error::Result;
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for unfitted transformers with hyperparameters.
///
/// A transformer learns parameters from training data and can then transform
/// new data using those learned parameters.
pub trait Transformer: Clone {
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer;

    /// Fit the transformer to the training data.
    ///
    /// # Errors
    /// Returns an error if the data is empty or contains non-finite values.
    fn fit(&self, data: &Array2<f64>) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the data in one step.
    fn fit_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self.fit(data)?;
        fitted.transform(data)
    }
}

/// Trait for fitted transformers ready for inference.
///
/// `extract_params()` followed by `from_params()` is a round-trip.
pub trait FittedTransformer: Clone {
    /// Serializable representation of learned parameters.
    type Params: Serialize + DeserializeOwned;

    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// Returns [`crate::CaloriesError::FeatureMismatch`] if the number of
    /// columns differs from the one seen during fit.
    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>>;

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted transformer from parameters.
    fn from_params(params: Self::Params) -> Result<Self>
    where
        Self: Sized;

    /// Returns the number of features seen during fit.
    fn n_features_in(&self) -> usize;
}
