//! Prediction pipeline: standard scaling followed by a regressor.
//!
//! The scaler is part of the pipeline so it is only ever fitted on the
//! training partition. A [`FittedPipeline`] remembers the feature names it
//! was fitted on; the bundle checks its stored feature order against them.

use crate::error::{CaloriesError, Result};
use crate::model::{
    build_regressor, FittedModel, FittedRegressor, Hyperparameters, ModelKind, Regressor,
    UnfittedModel,
};
use crate::preprocessing::{
    FittedStandardScaler, FittedTransformer, StandardScaler, StandardScalerParams, Transformer,
};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Unfitted pipeline.
#[derive(Clone, Debug)]
pub struct Pipeline {
    scaler: StandardScaler,
    model: UnfittedModel,
}

/// Build the unfitted pipeline for a regressor family.
///
/// Fails with [`CaloriesError::UnavailableModel`] when the family was not
/// compiled into this build.
pub fn build_pipeline(kind: ModelKind, hyper: &Hyperparameters) -> Result<Pipeline> {
    Ok(Pipeline {
        scaler: StandardScaler::new(),
        model: build_regressor(kind, hyper)?,
    })
}

impl Pipeline {
    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    /// Fit scaler and regressor on `x`, whose columns are named `feature_names`.
    pub fn fit(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        feature_names: Vec<String>,
    ) -> Result<FittedPipeline> {
        if feature_names.len() != x.ncols() {
            return Err(CaloriesError::FeatureMismatch {
                expected_features: feature_names.len(),
                got_features: x.ncols(),
            });
        }
        if y.len() != x.nrows() {
            return Err(CaloriesError::InvalidParameter(format!(
                "x has {} rows but y has {} values",
                x.nrows(),
                y.len()
            )));
        }

        let scaler = self.scaler.fit(x)?;
        let scaled = scaler.transform(x)?;
        let model = self.model.fit(&scaled, y)?;

        Ok(FittedPipeline {
            feature_names,
            scaler,
            model,
        })
    }
}

/// Serializable form of a [`FittedPipeline`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPipelineParams {
    pub feature_names: Vec<String>,
    pub scaler: StandardScalerParams,
    pub model: FittedModel,
}

/// Fitted pipeline ready for inference.
#[derive(Clone, Debug)]
pub struct FittedPipeline {
    feature_names: Vec<String>,
    scaler: FittedStandardScaler,
    model: FittedModel,
}

impl FittedPipeline {
    /// Feature names seen during fit, in column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features_in(&self) -> usize {
        self.feature_names.len()
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scaled = self.scaler.transform(x)?;
        self.model.predict_batch(&scaled)
    }

    /// Predict a single row given in feature order.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features_in() {
            return Err(CaloriesError::FeatureMismatch {
                expected_features: self.n_features_in(),
                got_features: row.len(),
            });
        }
        let scaled = self.scaler.transform_row(ArrayView1::from(row))?;
        Ok(self.model.predict_row(scaled.view()))
    }

    pub fn extract_params(&self) -> FittedPipelineParams {
        FittedPipelineParams {
            feature_names: self.feature_names.clone(),
            scaler: self.scaler.extract_params(),
            model: self.model.clone(),
        }
    }

    /// Rebuild from parameters, checking that the parts agree on width.
    pub fn from_params(params: FittedPipelineParams) -> Result<Self> {
        let scaler = FittedStandardScaler::from_params(params.scaler)?;
        let width = params.feature_names.len();
        if scaler.n_features_in() != width || params.model.n_features_in() != width {
            return Err(CaloriesError::FeatureMismatch {
                expected_features: width,
                got_features: params.model.n_features_in(),
            });
        }
        if !params.model.is_well_formed() {
            return Err(CaloriesError::InvalidParameter(
                "fitted model is structurally invalid".to_string(),
            ));
        }
        Ok(Self {
            feature_names: params.feature_names,
            scaler,
            model: params.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RandomForestConfig;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    fn small_hyper() -> Hyperparameters {
        Hyperparameters {
            random_forest: RandomForestConfig {
                n_estimators: 5,
                ..RandomForestConfig::default()
            },
            ..Hyperparameters::default()
        }
    }

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                100.0 + (i % 3) as f64
            }
        });
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let (x, y) = data();
        let fitted = build_pipeline(ModelKind::RandomForest, &small_hyper())
            .unwrap()
            .fit(&x, &y, names(2))
            .unwrap();

        assert_eq!(fitted.feature_names(), names(2).as_slice());
        let preds = fitted.predict(&x).unwrap();
        assert_eq!(preds.len(), 30);
        assert!(preds[0] < preds[29]);
    }

    #[test]
    fn test_pipeline_predict_row_matches_batch() {
        let (x, y) = data();
        let fitted = build_pipeline(ModelKind::RandomForest, &small_hyper())
            .unwrap()
            .fit(&x, &y, names(2))
            .unwrap();

        let batch = fitted.predict(&x).unwrap();
        for i in [0, 7, 29] {
            let row = x.row(i).to_vec();
            assert_eq!(fitted.predict_row(&row).unwrap(), batch[i]);
        }
    }

    #[test]
    fn test_pipeline_rejects_wrong_width() {
        let (x, y) = data();
        let fitted = build_pipeline(ModelKind::RandomForest, &small_hyper())
            .unwrap()
            .fit(&x, &y, names(2))
            .unwrap();

        assert!(matches!(
            fitted.predict_row(&[1.0, 2.0, 3.0]),
            Err(CaloriesError::FeatureMismatch {
                expected_features: 2,
                got_features: 3
            })
        ));
        assert!(fitted.predict(&Array2::zeros((1, 3))).is_err());
    }

    #[test]
    fn test_pipeline_fit_rejects_name_count_mismatch() {
        let (x, y) = data();
        let pipeline = build_pipeline(ModelKind::RandomForest, &small_hyper()).unwrap();
        assert!(pipeline.fit(&x, &y, names(3)).is_err());
    }

    #[test]
    fn test_pipeline_params_roundtrip() {
        let (x, y) = data();
        let fitted = build_pipeline(ModelKind::RandomForest, &small_hyper())
            .unwrap()
            .fit(&x, &y, names(2))
            .unwrap();

        let restored = FittedPipeline::from_params(fitted.extract_params()).unwrap();
        assert_eq!(restored.feature_names(), fitted.feature_names());
        assert_eq!(restored.predict(&x).unwrap(), fitted.predict(&x).unwrap());
    }

    #[test]
    fn test_pipeline_from_params_rejects_width_disagreement() {
        let (x, y) = data();
        let fitted = build_pipeline(ModelKind::RandomForest, &small_hyper())
            .unwrap()
            .fit(&x, &y, names(2))
            .unwrap();

        let mut params = fitted.extract_params();
        params.feature_names.push("extra".to_string());
        assert!(FittedPipeline::from_params(params).is_err());
    }
}
