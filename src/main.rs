use std::path::PathBuf;

use mlproject::components::data_ingestion::DataIngestion;
use mlproject::config;
use mlproject::logger;
use mlproject::pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "mlproject",
    about = "Ingest a raw dataset into train/test artifacts",
    version
)]
struct Args {
    /// TOML config file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Raw CSV dataset to ingest
    #[arg(long)]
    source: Option<PathBuf>,
    /// Output directory for raw/train/test artifacts
    #[arg(long)]
    artifacts: Option<PathBuf>,
    /// Fraction of rows routed to the test split
    #[arg(long)]
    test_ratio: Option<f64>,
    /// Directory for per-run log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Log to stderr only
    #[arg(long, default_value_t = false)]
    no_log_file: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(source) = args.source {
        config.ingestion.source_path = source;
    }
    if let Some(artifacts) = args.artifacts {
        config.ingestion.artifacts_dir = artifacts;
    }
    if let Some(test_ratio) = args.test_ratio {
        config.ingestion.test_ratio = test_ratio;
    }
    if let Some(log_dir) = args.log_dir {
        config.logging.dir = log_dir;
    }
    if args.no_log_file {
        config.logging.to_file = false;
    }

    let _guard = logger::init_tracing(&config.logging, args.verbose)?;
    debug!(?config, "resolved configuration");

    let ingestion = DataIngestion::new(config.ingestion);
    let artifacts = pipeline::run(&ingestion)?;

    debug!(
        train = %artifacts.train_data_path.display(),
        test = %artifacts.test_data_path.display(),
        train_rows = artifacts.train_rows,
        test_rows = artifacts.test_rows,
        "pipeline finished"
    );
    Ok(())
}
