//! Data preprocessing transformers for the prediction pipeline.
//!
//! Transformers follow a two-state pattern:
//!
//! - [`Transformer`]: unfitted transformer with hyperparameters
//! - [`FittedTransformer`]: fitted transformer ready for inference and serialization
//!
//! Only [`StandardScaler`] is provided; it is fitted on the training
//! partition alone and carried inside the fitted pipeline.

pub mod scaling;
pub mod traits;

pub use scaling::{
    FittedStandardScaler, StandardScaler, StandardScalerConfig, StandardScalerParams,
};
pub use traits::{FittedTransformer, Transformer};
