//! Feature contract: which fields feed the model, in what order, and how they
//! are normalised.
//!
//! The same [`FeatureContract`] is consulted by the data preparer at training
//! time and by the inference adapter at serving time. The feature order is
//! the only part learned from data; it travels to the service inside the
//! prediction bundle.
//!
//! # Example
//! ```
//! use calories_predictor::contract::{reorder, FeatureContract, FieldValue, Record};
//!
//! let contract = FeatureContract::calories();
//! let mut record = Record::new();
//! record.insert("Age".into(), FieldValue::Number(30.0));
//! record.insert("Height".into(), FieldValue::Number(175.0));
//! record.insert("Gender".into(), FieldValue::Text("Female".into()));
//! record.insert("Heart_Rate".into(), FieldValue::Number(100.0));
//! record.insert("Body_Temp".into(), FieldValue::Number(40.0));
//! record.insert("Weight".into(), FieldValue::Number(70.0));
//!
//! let encoded = contract.encode_categorical(&record).unwrap();
//! let row = reorder(&encoded, contract.ordered_fields()).unwrap();
//! assert_eq!(row, vec![30.0, 175.0, 1.0, 100.0, 40.0]);
//! ```

use crate::error::{CaloriesError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const USER_ID: &str = "User_ID";
pub const CALORIES: &str = "Calories";
pub const AGE: &str = "Age";
pub const HEIGHT: &str = "Height";
pub const GENDER: &str = "Gender";
pub const HEART_RATE: &str = "Heart_Rate";
pub const BODY_TEMP: &str = "Body_Temp";
pub const WEIGHT: &str = "Weight";
pub const DURATION: &str = "Duration";

/// A raw field value: either already numeric or textual.
///
/// For the categorical field this is the `{NumericCode, TextualCategory}`
/// union; it is resolved to a number exactly once, by the contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One row of named fields.
pub type Record = BTreeMap<String, FieldValue>;

/// Inclusive validity bounds for a numeric field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

impl FieldRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Canonical definition of model inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureContract {
    ordered_fields: Vec<String>,
    ranges: BTreeMap<String, FieldRange>,
    categorical_map: BTreeMap<String, BTreeMap<String, f64>>,
    join_key: String,
    target: String,
    leakage_columns: Vec<String>,
}

impl Default for FeatureContract {
    fn default() -> Self {
        Self::calories()
    }
}

impl FeatureContract {
    /// Contract for the calories dataset.
    ///
    /// `ordered_fields` starts as the order the reference dataset produces;
    /// a trained bundle always carries the authoritative order.
    pub fn calories() -> Self {
        let mut ranges = BTreeMap::new();
        ranges.insert(AGE.to_string(), FieldRange::new(10.0, 100.0));
        ranges.insert(HEIGHT.to_string(), FieldRange::new(120.0, 220.0));
        ranges.insert(HEART_RATE.to_string(), FieldRange::new(40.0, 220.0));
        ranges.insert(BODY_TEMP.to_string(), FieldRange::new(30.0, 45.0));

        let mut gender = BTreeMap::new();
        gender.insert("male".to_string(), 0.0);
        gender.insert("female".to_string(), 1.0);
        let mut categorical_map = BTreeMap::new();
        categorical_map.insert(GENDER.to_string(), gender);

        Self {
            ordered_fields: [AGE, HEIGHT, GENDER, HEART_RATE, BODY_TEMP]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ranges,
            categorical_map,
            join_key: USER_ID.to_string(),
            target: CALORIES.to_string(),
            leakage_columns: vec![WEIGHT.to_string(), DURATION.to_string()],
        }
    }

    /// Replace the feature order, e.g. with the one learned from training data.
    pub fn with_ordered_fields(mut self, fields: Vec<String>) -> Self {
        self.ordered_fields = fields;
        self
    }

    pub fn with_range(mut self, field: &str, min: f64, max: f64) -> Self {
        self.ranges.insert(field.to_string(), FieldRange::new(min, max));
        self
    }

    /// Register a categorical field. Category keys are matched case-insensitively.
    pub fn with_categories(mut self, field: &str, codes: &[(&str, f64)]) -> Self {
        let map = codes
            .iter()
            .map(|(name, code)| (name.to_lowercase(), *code))
            .collect();
        self.categorical_map.insert(field.to_string(), map);
        self
    }

    pub fn with_leakage_columns(mut self, columns: Vec<String>) -> Self {
        self.leakage_columns = columns;
        self
    }

    pub fn ordered_fields(&self) -> &[String] {
        &self.ordered_fields
    }

    pub fn ranges(&self) -> &BTreeMap<String, FieldRange> {
        &self.ranges
    }

    pub fn categorical_map(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.categorical_map
    }

    pub fn join_key(&self) -> &str {
        &self.join_key
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn leakage_columns(&self) -> &[String] {
        &self.leakage_columns
    }

    pub fn is_categorical(&self, field: &str) -> bool {
        self.categorical_map.contains_key(field)
    }

    /// Resolve a single value of `field` to its numeric form.
    ///
    /// For categorical fields a textual value must be a known category and a
    /// numeric value must be one of the known codes; both fail with
    /// [`CaloriesError::UnknownCategory`] otherwise.
    pub fn encode_value(&self, field: &str, value: &FieldValue) -> Result<f64> {
        match self.categorical_map.get(field) {
            Some(codes) => match value {
                FieldValue::Text(text) => {
                    codes.get(&text.to_lowercase()).copied().ok_or_else(|| {
                        CaloriesError::UnknownCategory {
                            field: field.to_string(),
                            value: text.clone(),
                        }
                    })
                }
                FieldValue::Number(code) => {
                    if codes.values().any(|known| known == code) {
                        Ok(*code)
                    } else {
                        Err(CaloriesError::UnknownCategory {
                            field: field.to_string(),
                            value: code.to_string(),
                        })
                    }
                }
            },
            None => numeric_value(field, value),
        }
    }

    /// Map every categorical field of `record` through the category table.
    ///
    /// Non-categorical fields are copied unchanged.
    pub fn encode_categorical(&self, record: &Record) -> Result<Record> {
        let mut encoded = record.clone();
        for field in self.categorical_map.keys() {
            if let Some(value) = record.get(field) {
                let code = self.encode_value(field, value)?;
                encoded.insert(field.clone(), FieldValue::Number(code));
            }
        }
        Ok(encoded)
    }

    /// Check every ranged field present in `record` against its bounds.
    ///
    /// Absent fields are not reported here; [`reorder`] reports them as
    /// [`CaloriesError::MissingField`].
    pub fn validate(&self, record: &Record) -> Result<()> {
        for (field, range) in &self.ranges {
            let Some(value) = record.get(field) else {
                continue;
            };
            let value = numeric_value(field, value)?;
            if !range.contains(value) {
                return Err(CaloriesError::Validation {
                    field: field.clone(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// [`reorder`] using this contract's own field order.
    pub fn reorder_record(&self, record: &Record) -> Result<Vec<f64>> {
        reorder(record, &self.ordered_fields)
    }
}

/// Extract values of `record` in exactly `ordered_fields` order.
///
/// Fields outside `ordered_fields` are ignored. Values must already be
/// numeric (or numeric text); run [`FeatureContract::encode_categorical`] first.
pub fn reorder(record: &Record, ordered_fields: &[String]) -> Result<Vec<f64>> {
    ordered_fields
        .iter()
        .map(|field| {
            let value = record
                .get(field)
                .ok_or_else(|| CaloriesError::MissingField(field.clone()))?;
            numeric_value(field, value)
        })
        .collect()
}

fn numeric_value(field: &str, value: &FieldValue) -> Result<f64> {
    match value {
        FieldValue::Number(v) => Ok(*v),
        FieldValue::Text(text) => {
            text.trim()
                .parse::<f64>()
                .map_err(|_| CaloriesError::NonNumericFeature {
                    column: field.to_string(),
                })
        }
    }
}
