//! Train a calories model and export it as a prediction bundle.
//!
//! ```text
//! calories-train --calories calories.csv --exercise exercise.csv --model rf --out ml-api/calories_model.bin
//! ```

use anyhow::{Context, Result};
use calories_predictor::config::TrainingConfig;
use calories_predictor::contract::FeatureContract;
use calories_predictor::dataset::Table;
use calories_predictor::logging::{init_logging, level_from_verbosity};
use calories_predictor::model::ModelKind;
use calories_predictor::prepare::prepare;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "calories-train")]
#[command(about = "Train a calories-burned regressor and export a prediction bundle", long_about = None)]
struct Args {
    /// CSV with the target column (optionally every feature too)
    #[arg(long)]
    calories: PathBuf,

    /// CSV with the exercise features, joined on User_ID
    #[arg(long)]
    exercise: Option<PathBuf>,

    /// Model family: xgb/gbt (gradient boosting) or rf (random forest)
    #[arg(long, value_enum)]
    model: Option<ModelKind>,

    /// Share of rows held out for validation
    #[arg(long = "test-size", alias = "test_size")]
    test_size: Option<f64>,

    /// Where to write the bundle
    #[arg(long, default_value = "ml-api/calories_model.bin")]
    out: PathBuf,

    /// TOML file with training settings and hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(level_from_verbosity(args.verbose), args.log_json);

    let mut config = match &args.config {
        Some(path) => TrainingConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(test_size) = args.test_size {
        config.validation_fraction = test_size;
    }
    config.validate().context("Invalid training settings")?;
    config.model.ensure_available()?;

    let contract = FeatureContract::calories();

    info!(path = %args.calories.display(), "loading data");
    let mut table = Table::from_csv_path(&args.calories)
        .with_context(|| format!("Failed to read {}", args.calories.display()))?;
    if let Some(exercise) = &args.exercise {
        let features = Table::from_csv_path(exercise)
            .with_context(|| format!("Failed to read {}", exercise.display()))?;
        table = table
            .inner_join(&features, contract.join_key())
            .with_context(|| format!("Failed to join on {}", contract.join_key()))?;
    }
    info!(rows = table.n_rows(), columns = table.n_columns(), "data loaded");

    let data = prepare(&table, &contract).context("Failed to prepare training data")?;
    let report = config.trainer(true).fit(&data).context("Training failed")?;

    report
        .bundle
        .save(&args.out)
        .with_context(|| format!("Failed to save bundle to {}", args.out.display()))?;

    println!("MAE (validation): {:.4}", report.mae());
    println!("Saved model to: {}", args.out.display());
    println!("Feature order: {:?}", report.bundle.ordered_fields());
    Ok(())
}
