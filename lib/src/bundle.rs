//! Prediction bundle: the fitted pipeline plus its feature order, persisted
//! as one self-contained file.
//!
//! Layout: 8-byte magic, little-endian `u32` format version, then a bincode
//! body. Anything that fails to decode is [`CaloriesError::CorruptBundle`];
//! a decoded bundle whose feature order disagrees with the pipeline is
//! [`CaloriesError::IncompatibleBundle`].

use crate::error::{CaloriesError, Result};
use crate::pipeline::{FittedPipeline, FittedPipelineParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

const MAGIC: &[u8; 8] = b"CALBNDL\0";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + 4;

#[derive(Serialize, Deserialize)]
struct BundleBody {
    ordered_fields: Vec<String>,
    pipeline: FittedPipelineParams,
}

/// Immutable pairing of a fitted pipeline and the feature order it expects.
#[derive(Clone, Debug)]
pub struct PredictionBundle {
    pipeline: FittedPipeline,
    ordered_fields: Vec<String>,
}

fn check_compatible(pipeline: &FittedPipeline, ordered_fields: &[String]) -> Result<()> {
    if pipeline.feature_names() != ordered_fields {
        return Err(CaloriesError::IncompatibleBundle {
            expected: pipeline.feature_names().to_vec(),
            found: ordered_fields.to_vec(),
        });
    }
    Ok(())
}

impl PredictionBundle {
    /// Pair a pipeline with its feature order.
    ///
    /// The order must equal the names the pipeline was fitted on.
    pub fn new(pipeline: FittedPipeline, ordered_fields: Vec<String>) -> Result<Self> {
        check_compatible(&pipeline, &ordered_fields)?;
        Ok(Self {
            pipeline,
            ordered_fields,
        })
    }

    pub fn pipeline(&self) -> &FittedPipeline {
        &self.pipeline
    }

    pub fn ordered_fields(&self) -> &[String] {
        &self.ordered_fields
    }

    /// Predict one row already laid out in [`Self::ordered_fields`] order.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        self.pipeline.predict_row(row)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = BundleBody {
            ordered_fields: self.ordered_fields.clone(),
            pipeline: self.pipeline.extract_params(),
        };
        let encoded = bincode::serialize(&body)
            .map_err(|e| CaloriesError::CorruptBundle(format!("failed to encode: {}", e)))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + encoded.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&encoded);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(CaloriesError::CorruptBundle(
                "not a calories prediction bundle".to_string(),
            ));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(CaloriesError::CorruptBundle(format!(
                "unsupported bundle format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let body: BundleBody = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| CaloriesError::CorruptBundle(format!("failed to decode: {}", e)))?;
        let pipeline = FittedPipeline::from_params(body.pipeline)
            .map_err(|e| CaloriesError::CorruptBundle(format!("invalid pipeline: {}", e)))?;

        Self::new(pipeline, body.ordered_fields)
    }

    /// Write the bundle to `path`, creating the parent directory if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "saved prediction bundle");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let bundle = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            model = %bundle.pipeline.kind(),
            features = ?bundle.ordered_fields,
            "loaded prediction bundle"
        );
        Ok(bundle)
    }
}
