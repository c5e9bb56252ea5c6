//! Serve predictions from a saved bundle over HTTP.

use anyhow::{Context, Result};
use calories_predictor::bundle::PredictionBundle;
use calories_predictor::config::ServeConfig;
use calories_predictor::inference::Predictor;
use calories_predictor::logging::{init_logging, level_from_verbosity};
use calories_predictor::server::PredictionServer;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "calories-serve")]
#[command(about = "HTTP inference service for a calories prediction bundle", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "CALORIES_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, env = "CALORIES_PORT", default_value_t = 8080)]
    port: u16,

    /// Bundle written by calories-train
    #[arg(short, long, env = "CALORIES_MODEL", default_value = "calories_model.bin")]
    model: PathBuf,

    /// Verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl From<&Args> for ServeConfig {
    fn from(args: &Args) -> Self {
        ServeConfig {
            host: args.host.clone(),
            port: args.port,
            model_path: args.model.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(level_from_verbosity(args.verbose), args.log_json);
    let config = ServeConfig::from(&args);

    // A missing or unreadable bundle is fatal at startup.
    let bundle = PredictionBundle::load(&config.model_path)
        .with_context(|| format!("Failed to load bundle {}", config.model_path.display()))?;
    info!(
        model = %bundle.pipeline().kind(),
        features = ?bundle.ordered_fields(),
        "bundle ready"
    );

    let addr = config.socket_addr()?;
    let predictor = Arc::new(Predictor::new(Arc::new(bundle)));
    PredictionServer::new(predictor)
        .run(addr)
        .await
        .with_context(|| format!("Failed to serve on {}", addr))?;
    Ok(())
}
