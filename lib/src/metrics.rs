//! Regression metrics for the validation report.

use crate::error::{CaloriesError, Result};
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(CaloriesError::InvalidParameter(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(CaloriesError::EmptyData(
            "Cannot score an empty partition".to_string(),
        ));
    }
    Ok(())
}

/// Mean Absolute Error.
///
/// MAE = mean(|y_true - y_pred|)
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sum_abs: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).abs())
        .sum();
    Ok(sum_abs / y_true.len() as f64)
}

/// Mean Squared Error.
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sum_sq: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    Ok(sum_sq / y_true.len() as f64)
}

/// Coefficient of determination.
///
/// R² = 1 - SS_res / SS_tot. A constant target scores 1 when predicted
/// exactly and 0 otherwise.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// All validation metrics at once. MAE is the headline number.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r_squared: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        Ok(Self {
            mae: mean_absolute_error(y_true, y_pred)?,
            rmse: mean_squared_error(y_true, y_pred)?.sqrt(),
            r_squared: r_squared(y_true, y_pred)?,
        })
    }
}
