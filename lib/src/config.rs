//! Training and serving configuration.
//!
//! Training settings can come from a TOML file; any key left out keeps its
//! default. Command-line flags are applied on top by the binaries.
//!
//! ```toml
//! model = "rf"
//! validation_fraction = 0.1
//! split_seed = 22
//!
//! [random_forest]
//! n_estimators = 200
//!
//! [gradient_boosting]
//! learning_rate = 0.1
//! ```

use crate::error::{CaloriesError, Result};
use crate::model::{Hyperparameters, ModelKind};
use crate::trainer::Trainer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model: ModelKind,
    /// Share of rows held out for validation.
    pub validation_fraction: f64,
    /// Seed of the train/validation shuffle.
    pub split_seed: u64,
    #[serde(flatten)]
    pub hyperparameters: Hyperparameters,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            validation_fraction: 0.10,
            split_seed: 22,
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl TrainingConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| CaloriesError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| CaloriesError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CaloriesError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(CaloriesError::InvalidParameter(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }

    pub fn trainer(&self, verbose: bool) -> Trainer {
        Trainer::builder()
            .model(self.model)
            .hyperparameters(self.hyperparameters.clone())
            .validation_fraction(self.validation_fraction)
            .seed(self.split_seed)
            .verbose(verbose)
            .build()
    }
}

/// Where the inference service listens and which bundle it loads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            model_path: PathBuf::from("calories_model.bin"),
        }
    }
}

impl ServeConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve `host:port` to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address()
            .to_socket_addrs()
            .map_err(|e| CaloriesError::Config(format!("{}: {}", self.bind_address(), e)))?
            .next()
            .ok_or_else(|| {
                CaloriesError::Config(format!("{} resolves to no address", self.bind_address()))
            })
    }
}
