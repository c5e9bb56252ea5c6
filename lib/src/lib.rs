//! # calories_predictor
//!
//! Calories-burned regression with a strict feature contract shared between
//! training and serving.
//!
//! ## Core Design Principles
//!
//! - **One feature order**: the order of model inputs is learned once from the
//!   training table and travels inside the [`PredictionBundle`]; serving never
//!   assumes it.
//! - **Training/Inference Separation**: unfitted estimators and fitted
//!   predictors are different types; only fitted ones are serialized.
//! - **Explicit failures**: schema, category, range and bundle problems are
//!   distinct [`CaloriesError`] variants, never silent defaults.
//!
//! ## Quick Start
//!
//! ```rust
//! use calories_predictor::contract::FeatureContract;
//! use calories_predictor::dataset::Table;
//! use calories_predictor::model::{Hyperparameters, ModelKind, RandomForestConfig};
//! use calories_predictor::prepare::prepare;
//! use calories_predictor::trainer::Trainer;
//!
//! let mut csv = String::from("User_ID,Gender,Age,Height,Heart_Rate,Body_Temp,Duration,Calories\n");
//! for i in 0..40 {
//!     let hr = 80 + i;
//!     let gender = if i % 2 == 0 { "male" } else { "female" };
//!     csv.push_str(&format!("{},{},{},170,{},40,{},{}\n", i, gender, 20 + i, hr, i, hr * 2));
//! }
//! let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
//! let data = prepare(&table, &FeatureContract::calories()).unwrap();
//!
//! let hyper = Hyperparameters {
//!     random_forest: RandomForestConfig { n_estimators: 10, ..Default::default() },
//!     ..Default::default()
//! };
//! let report = Trainer::builder()
//!     .model(ModelKind::RandomForest)
//!     .hyperparameters(hyper)
//!     .verbose(false)
//!     .build()
//!     .fit(&data)
//!     .unwrap();
//!
//! assert_eq!(
//!     report.bundle.ordered_fields(),
//!     &["Gender", "Age", "Height", "Heart_Rate", "Body_Temp"]
//! );
//! ```
//!
//! ## Module Structure
//!
//! - `contract`: field names, ranges, categorical codes, reordering
//! - `dataset`: CSV tables and the key join
//! - `prepare`: raw table to feature matrix, target and feature order
//! - `preprocessing`: standard scaling
//! - `model`: regression tree, random forest, gradient boosting
//! - `pipeline`: scaler and regressor composed
//! - `metrics`: MAE, RMSE, R²
//! - `trainer`: split, fit, validate
//! - `bundle`: persisted pipeline plus feature order
//! - `inference`: per-request validation, encoding and prediction
//! - `config`: TOML training settings, serving address
//! - `logging`: subscriber setup for the binaries
//! - `server`: HTTP front end

/// Crate error type.
pub mod error;

/// Feature contract shared by training and serving.
pub mod contract;

/// Tabular input loading.
pub mod dataset;

/// Data preprocessing transformers.
pub mod preprocessing;

/// Regressor families.
pub mod model;

pub mod pipeline;

pub mod prepare;

pub mod metrics;

/// Train/validation orchestration.
pub mod trainer;

pub mod bundle;

pub mod inference;

pub mod config;

pub mod logging;

pub mod server;

pub use bundle::PredictionBundle;
pub use contract::{FeatureContract, FieldValue, Record};
pub use error::{CaloriesError, Result};
pub use inference::{InferenceRecord, PredictionResponse, Predictor};
pub use model::ModelKind;
pub use pipeline::{build_pipeline, FittedPipeline, Pipeline};
pub use prepare::{prepare, PreparedData};
pub use trainer::{Trainer, TrainingReport};
