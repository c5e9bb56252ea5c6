// trainer/mod.rs
use crate::{
    bundle::PredictionBundle,
    error::{CaloriesError, Result},
    metrics::RegressionMetrics,
    model::{Hyperparameters, ModelKind},
    pipeline::build_pipeline,
    prepare::PreparedData,
};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Instant;

/// Logs at `info` when the trainer is verbose, at `debug` otherwise.
macro_rules! progress {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

/// Fits a pipeline on a reproducible train/validation split and scores it.
///
/// Once built via `TrainerBuilder`, it is immutable and can be reused across
/// several prepared datasets.
#[derive(Clone, Debug)]
pub struct Trainer {
    pub(crate) model: ModelKind,
    pub(crate) hyperparameters: Hyperparameters,
    pub(crate) validation_fraction: f64,
    pub(crate) seed: u64,
    pub(crate) verbose: bool,
}

/// Fluent builder for constructing a `Trainer`.
///
/// Defaults:
/// - `model`: gradient boosting
/// - `validation_fraction`: 0.10
/// - `seed`: 22
/// - `verbose`: true
#[derive(Clone, Debug)]
pub struct TrainerBuilder {
    model: ModelKind,
    hyperparameters: Hyperparameters,
    validation_fraction: f64,
    seed: u64,
    verbose: bool,
}

impl Default for TrainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainerBuilder {
    pub fn new() -> Self {
        Self {
            model: ModelKind::default(),
            hyperparameters: Hyperparameters::default(),
            validation_fraction: 0.10,
            seed: 22,
            verbose: true,
        }
    }

    pub fn model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    /// Share of rows held out for validation, strictly between 0 and 1.
    pub fn validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    /// Seed of the train/validation shuffle.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// When `false`, training milestones are logged at `debug` instead of `info`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Trainer {
        Trainer {
            model: self.model,
            hyperparameters: self.hyperparameters,
            validation_fraction: self.validation_fraction,
            seed: self.seed,
            verbose: self.verbose,
        }
    }
}

/// Outcome of a successful training run.
#[derive(Clone, Debug)]
pub struct TrainingReport {
    pub bundle: PredictionBundle,
    pub metrics: RegressionMetrics,
    pub n_train: usize,
    pub n_validation: usize,
}

impl TrainingReport {
    /// Validation mean absolute error.
    pub fn mae(&self) -> f64 {
        self.metrics.mae
    }
}

/// Shuffle `0..n_samples` with `seed` and cut off `ceil(fraction * n)` rows
/// for validation. Returns `(train, validation)` row indices.
pub fn train_validation_split(
    n_samples: usize,
    fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(CaloriesError::InvalidParameter(format!(
            "validation fraction must be in (0, 1), got {}",
            fraction
        )));
    }
    if n_samples == 0 {
        return Err(CaloriesError::EmptyData("Dataset is empty".to_string()));
    }

    let n_validation = ((n_samples as f64) * fraction).ceil() as usize;
    if n_validation >= n_samples {
        return Err(CaloriesError::EmptyData(format!(
            "training partition is empty: {} rows with validation fraction {}",
            n_samples, fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_validation);
    Ok((train, indices))
}

impl Trainer {
    /// Convenience constructor that starts the builder pattern.
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::new()
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    /// Split, fit on the training partition, score on the validation partition.
    ///
    /// # Returns
    /// The prediction bundle plus validation metrics, or an error if:
    /// - the requested model family is unavailable in this build
    /// - the training partition would be empty
    /// - fitting fails
    ///
    /// No bundle exists unless every step succeeded.
    pub fn fit(&self, data: &PreparedData) -> Result<TrainingReport> {
        // fail on configuration before touching the data
        let pipeline = build_pipeline(self.model, &self.hyperparameters)?;

        let (train_idx, val_idx) =
            train_validation_split(data.n_samples(), self.validation_fraction, self.seed)?;
        let x_train = data.features.select(Axis(0), &train_idx);
        let y_train = data.target.select(Axis(0), &train_idx);
        let x_val = data.features.select(Axis(0), &val_idx);
        let y_val = data.target.select(Axis(0), &val_idx);

        progress!(
            self.verbose,
            model = %self.model,
            train_rows = train_idx.len(),
            validation_rows = val_idx.len(),
            features = ?data.ordered_fields,
            "fitting pipeline"
        );
        let started = Instant::now();
        let fitted = pipeline.fit(&x_train, &y_train, data.ordered_fields.clone())?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        progress!(self.verbose, elapsed_ms, "pipeline fitted");

        let predictions = fitted.predict(&x_val)?;
        let metrics = RegressionMetrics::compute(&y_val.to_vec(), &predictions.to_vec())?;
        progress!(
            self.verbose,
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r_squared,
            "validation scored"
        );

        let bundle = PredictionBundle::new(fitted, data.ordered_fields.clone())?;
        Ok(TrainingReport {
            bundle,
            metrics,
            n_train: train_idx.len(),
            n_validation: val_idx.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RandomForestConfig;
    use ndarray::{Array1, Array2};

    fn small_forest() -> Hyperparameters {
        Hyperparameters {
            random_forest: RandomForestConfig {
                n_estimators: 10,
                ..RandomForestConfig::default()
            },
            ..Hyperparameters::default()
        }
    }

    fn synthetic(n: usize) -> PreparedData {
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                (i % 25) as f64
            } else {
                (i % 4) as f64
            }
        });
        let target: Array1<f64> = features
            .rows()
            .into_iter()
            .map(|r| 4.0 * r[0] + r[1])
            .collect();
        PreparedData {
            features,
            target,
            ordered_fields: vec!["a".to_string(), "b".to_string()],
        }
    }

    // === TrainerBuilder Tests ===

    #[test]
    fn test_trainer_builder_default_values() {
        let trainer = Trainer::builder().build();

        assert_eq!(trainer.model, ModelKind::GradientBoosting);
        assert_eq!(trainer.validation_fraction, 0.10);
        assert_eq!(trainer.seed, 22);
        assert!(trainer.verbose);
    }

    #[test]
    fn test_trainer_builder_chaining() {
        let trainer = Trainer::builder()
            .model(ModelKind::RandomForest)
            .validation_fraction(0.25)
            .seed(7)
            .verbose(false)
            .build();

        assert_eq!(trainer.model(), ModelKind::RandomForest);
        assert_eq!(trainer.validation_fraction, 0.25);
        assert_eq!(trainer.seed, 7);
        assert!(!trainer.verbose);
    }

    // === Split Tests ===

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, val) = train_validation_split(100, 0.1, 22).unwrap();
        assert_eq!(val.len(), 10);
        assert_eq!(train.len(), 90);

        let mut all: Vec<usize> = train.iter().chain(val.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_validation_up() {
        let (train, val) = train_validation_split(15, 0.1, 22).unwrap();
        assert_eq!(val.len(), 2);
        assert_eq!(train.len(), 13);
    }

    #[test]
    fn test_split_is_reproducible() {
        assert_eq!(
            train_validation_split(50, 0.2, 22).unwrap(),
            train_validation_split(50, 0.2, 22).unwrap()
        );
        assert_ne!(
            train_validation_split(50, 0.2, 22).unwrap(),
            train_validation_split(50, 0.2, 23).unwrap()
        );
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(train_validation_split(10, 0.0, 22).is_err());
        assert!(train_validation_split(10, 1.0, 22).is_err());
        assert!(train_validation_split(10, f64::NAN, 22).is_err());
    }

    #[test]
    fn test_split_empty_training_partition() {
        assert!(matches!(
            train_validation_split(1, 0.1, 22),
            Err(CaloriesError::EmptyData(_))
        ));
        assert!(matches!(
            train_validation_split(0, 0.1, 22),
            Err(CaloriesError::EmptyData(_))
        ));
    }

    // === Trainer Tests ===

    #[test]
    fn test_trainer_fit_random_forest() {
        let data = synthetic(200);
        let report = Trainer::builder()
            .model(ModelKind::RandomForest)
            .hyperparameters(small_forest())
            .verbose(false)
            .build()
            .fit(&data)
            .unwrap();

        assert_eq!(report.n_train, 180);
        assert_eq!(report.n_validation, 20);
        assert_eq!(report.bundle.ordered_fields(), data.ordered_fields.as_slice());
        assert!(report.mae() < 5.0, "mae = {}", report.mae());
    }

    #[cfg(feature = "boosting")]
    #[test]
    fn test_trainer_fit_gradient_boosting() {
        use crate::model::GradientBoostingConfig;

        let data = synthetic(200);
        let hyper = Hyperparameters {
            gradient_boosting: GradientBoostingConfig {
                n_estimators: 100,
                max_depth: 3,
                learning_rate: 0.1,
                ..GradientBoostingConfig::default()
            },
            ..Hyperparameters::default()
        };
        let report = Trainer::builder()
            .model(ModelKind::GradientBoosting)
            .hyperparameters(hyper)
            .verbose(false)
            .build()
            .fit(&data)
            .unwrap();

        assert_eq!(report.bundle.pipeline().kind(), ModelKind::GradientBoosting);
        assert!(report.mae() < 5.0, "mae = {}", report.mae());
    }

    #[test]
    fn test_trainer_is_reproducible() {
        let data = synthetic(60);
        let trainer = Trainer::builder()
            .model(ModelKind::RandomForest)
            .hyperparameters(small_forest())
            .verbose(false)
            .build();

        let a = trainer.fit(&data).unwrap();
        let b = trainer.fit(&data).unwrap();
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_trainer_single_row_has_no_training_partition() {
        let data = synthetic(1);
        let result = Trainer::builder()
            .model(ModelKind::RandomForest)
            .hyperparameters(small_forest())
            .verbose(false)
            .build()
            .fit(&data);
        assert!(matches!(result, Err(CaloriesError::EmptyData(_))));
    }
}
