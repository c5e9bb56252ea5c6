//! Data preparation: raw merged table to `(X, y, ordered_fields)`.
//!
//! Steps run in a fixed order:
//!
//! 1. Text categorical columns are encoded through the contract; numeric
//!    ones are checked against the known codes.
//! 2. Leakage columns are dropped when present.
//! 3. Join key and target must exist, otherwise [`CaloriesError::Schema`]
//!    lists what is missing before anything else happens.
//! 4. Every remaining column other than key and target becomes a feature.
//!    Target and feature values must be finite numbers.
//! 5. The feature column order is recorded as `ordered_fields`.
//!
//! Nothing here is random; the feature order follows the input table.

use crate::contract::{FeatureContract, FieldValue};
use crate::dataset::{ColumnData, Table};
use crate::error::{CaloriesError, Result};
use ndarray::{Array1, Array2};
use tracing::debug;

/// Model-ready training data.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedData {
    /// Samples × features, columns in `ordered_fields` order.
    pub features: Array2<f64>,
    pub target: Array1<f64>,
    pub ordered_fields: Vec<String>,
}

impl PreparedData {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }
}

/// Apply the feature contract to a raw table.
pub fn prepare(table: &Table, contract: &FeatureContract) -> Result<PreparedData> {
    let mut table = table.clone();

    for field in contract.categorical_map().keys() {
        let Some(column) = table.column(field) else {
            continue;
        };
        let codes = match &column.data {
            ColumnData::Text(values) => values
                .iter()
                .map(|v| contract.encode_value(field, &FieldValue::Text(v.clone())))
                .collect::<Result<Vec<f64>>>()?,
            ColumnData::Numeric(values) => values
                .iter()
                .map(|&v| contract.encode_value(field, &FieldValue::Number(v)))
                .collect::<Result<Vec<f64>>>()?,
        };
        table.replace_column(field, ColumnData::Numeric(codes))?;
    }

    for column in contract.leakage_columns() {
        if table.drop_column(column) {
            debug!(column = %column, "dropped leakage column");
        }
    }

    let missing: Vec<String> = [contract.join_key(), contract.target()]
        .iter()
        .filter(|name| !table.has_column(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CaloriesError::Schema {
            missing,
            present: table.column_names().iter().map(|s| s.to_string()).collect(),
        });
    }

    if table.n_rows() == 0 {
        return Err(CaloriesError::EmptyData("table has no rows".to_string()));
    }

    // NaN and infinities parse as floats but are not usable values.
    let non_numeric_target = |row: usize| CaloriesError::NonNumericTarget {
        column: contract.target().to_string(),
        row,
    };
    let target = match table.column(contract.target()).map(|c| &c.data) {
        Some(ColumnData::Numeric(values)) => {
            if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                return Err(non_numeric_target(row));
            }
            Array1::from(values.clone())
        }
        Some(ColumnData::Text(values)) => {
            let row = values
                .iter()
                .position(|v| v.trim().parse::<f64>().map_or(true, |x| !x.is_finite()))
                .unwrap_or(0);
            return Err(non_numeric_target(row));
        }
        None => return Err(CaloriesError::MissingField(contract.target().to_string())),
    };

    let feature_columns: Vec<_> = table
        .columns()
        .iter()
        .filter(|c| c.name != contract.join_key() && c.name != contract.target())
        .collect();
    if feature_columns.is_empty() {
        return Err(CaloriesError::EmptyData(
            "no feature columns remain after dropping key, target and leakage columns".to_string(),
        ));
    }

    let n_rows = table.n_rows();
    let mut features = Array2::zeros((n_rows, feature_columns.len()));
    for (j, column) in feature_columns.iter().enumerate() {
        match &column.data {
            ColumnData::Numeric(values) => {
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(CaloriesError::NonNumericFeature {
                        column: column.name.clone(),
                    });
                }
                for (i, v) in values.iter().enumerate() {
                    features[[i, j]] = *v;
                }
            }
            ColumnData::Text(_) => {
                return Err(CaloriesError::NonNumericFeature {
                    column: column.name.clone(),
                })
            }
        }
    }

    let ordered_fields: Vec<String> = feature_columns.iter().map(|c| c.name.clone()).collect();
    debug!(rows = n_rows, features = ?ordered_fields, "prepared training data");

    Ok(PreparedData {
        features,
        target,
        ordered_fields,
    })
}
