//! Serving-time adapter between one raw request record and the bundle.
//!
//! A [`Predictor`] is built once from a loaded [`PredictionBundle`] and is
//! never mutated, so any number of threads may share it. Each call:
//!
//! 1. validates ranged fields,
//! 2. encodes the categorical field,
//! 3. reorders by the bundle's feature order (extra fields drop out here),
//! 4. predicts the single row.

use crate::bundle::PredictionBundle;
use crate::contract::{
    reorder, FeatureContract, FieldValue, Record, AGE, BODY_TEMP, DURATION, GENDER, HEART_RATE,
    HEIGHT, WEIGHT,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One prediction request.
///
/// `Weight` and `Duration` are accepted from richer clients and ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Gender")]
    pub gender: FieldValue,
    #[serde(rename = "Height")]
    pub height: f64,
    #[serde(rename = "Weight", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(rename = "Duration", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "Heart_Rate")]
    pub heart_rate: f64,
    #[serde(rename = "Body_Temp")]
    pub body_temp: f64,
}

impl InferenceRecord {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(AGE.to_string(), FieldValue::Number(self.age));
        record.insert(GENDER.to_string(), self.gender.clone());
        record.insert(HEIGHT.to_string(), FieldValue::Number(self.height));
        record.insert(HEART_RATE.to_string(), FieldValue::Number(self.heart_rate));
        record.insert(BODY_TEMP.to_string(), FieldValue::Number(self.body_temp));
        if let Some(weight) = self.weight {
            record.insert(WEIGHT.to_string(), FieldValue::Number(weight));
        }
        if let Some(duration) = self.duration {
            record.insert(DURATION.to_string(), FieldValue::Number(duration));
        }
        record
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub calories: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Read-only prediction service state.
#[derive(Clone, Debug)]
pub struct Predictor {
    bundle: Arc<PredictionBundle>,
    contract: FeatureContract,
}

impl Predictor {
    /// Predictor with the calories ranges and categories.
    pub fn new(bundle: Arc<PredictionBundle>) -> Self {
        Self::with_contract(bundle, FeatureContract::calories())
    }

    /// Use `contract` for ranges and categories. Its feature order is
    /// replaced by the bundle's.
    pub fn with_contract(bundle: Arc<PredictionBundle>, contract: FeatureContract) -> Self {
        let contract = contract.with_ordered_fields(bundle.ordered_fields().to_vec());
        Self { bundle, contract }
    }

    pub fn bundle(&self) -> &PredictionBundle {
        &self.bundle
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }

    pub fn predict(&self, request: &InferenceRecord) -> Result<PredictionResponse> {
        let calories = self.predict_record(&request.to_record())?;
        Ok(PredictionResponse { calories })
    }

    /// Predict from a free-form record of named fields.
    pub fn predict_record(&self, record: &Record) -> Result<f64> {
        self.contract.validate(record)?;
        let encoded = self.contract.encode_categorical(record)?;
        let row = reorder(&encoded, self.bundle.ordered_fields())?;
        let calories = self.bundle.predict_row(&row)?;
        debug!(?row, calories, "prediction");
        Ok(calories)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse { ok: true }
    }
}
