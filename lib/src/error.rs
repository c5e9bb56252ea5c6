//! Error types shared by training, bundling and inference.

use thiserror::Error;

/// Error type for every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum CaloriesError {
    /// Required training columns are absent.
    #[error("Missing required columns: {missing:?}. Columns present: {present:?}")]
    Schema {
        missing: Vec<String>,
        present: Vec<String>,
    },
    /// A textual category that the feature contract does not know about.
    #[error("Unknown category for {field}: {value:?}")]
    UnknownCategory { field: String, value: String },
    /// A field required by the feature order is absent from the record.
    #[error("Missing field: {0}")]
    MissingField(String),
    /// A numeric value outside its allowed physiological range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    Validation {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The requested model family was not compiled in.
    #[error("Model family '{requested}' is unavailable in this build. Use {suggestion} instead")]
    UnavailableModel {
        requested: String,
        suggestion: String,
    },
    /// Bundle bytes could not be decoded.
    #[error("Corrupt bundle: {0}")]
    CorruptBundle(String),
    /// Bundle decoded, but its feature order disagrees with the fitted pipeline.
    #[error("Incompatible bundle: pipeline expects {expected:?}, bundle lists {found:?}")]
    IncompatibleBundle {
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// The target column holds a value that is not a number.
    #[error("Target column {column} is not numeric (row {row})")]
    NonNumericTarget { column: String, row: usize },
    /// A feature column that is neither numeric nor a known categorical field.
    #[error("Feature column {column} is not numeric")]
    NonNumericFeature { column: String },
    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
    /// Invalid hyperparameter or option value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A configuration file that could not be parsed.
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CaloriesError {
    /// True for errors caused by a malformed request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CaloriesError::UnknownCategory { .. }
                | CaloriesError::MissingField(_)
                | CaloriesError::Validation { .. }
                | CaloriesError::FeatureMismatch { .. }
        )
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CaloriesError>;
