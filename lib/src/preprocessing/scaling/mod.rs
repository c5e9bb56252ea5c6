//! Scaling transformers for feature normalization.
//!
//! Tree ensembles are scale-invariant, but the scaler is still fitted as the
//! first pipeline step so that every fitted pipeline applies the same
//! transform at serving time as during training.

pub mod standard;

pub use standard::{
    FittedStandardScaler, StandardScaler, StandardScalerConfig, StandardScalerParams,
};
