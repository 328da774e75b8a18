use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tabpipe::pipeline::{run, PipelineConfig};
use tracing_subscriber::EnvFilter;

/// Train tabular classifiers and write a submission file
#[derive(Parser, Debug)]
#[command(name = "tabpipe", version, about)]
struct Args {
    /// Training table (CSV with the target column)
    #[arg(long, default_value = "train.csv")]
    train: PathBuf,

    /// Test table to predict (CSV without the target column)
    #[arg(long, default_value = "test.csv")]
    test: PathBuf,

    /// Where to write the predictions
    #[arg(long, default_value = "submission.csv")]
    output: PathBuf,

    /// Name of the target column in the training table
    #[arg(long, default_value = "Target")]
    target: String,

    /// Validation holdout fraction
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Random seed for splitting, sampling, and tree building
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabpipe=info")),
        )
        .init();

    let args = Args::parse();

    let config = PipelineConfig {
        train_path: args.train,
        test_path: args.test,
        output_path: args.output,
        ..PipelineConfig::default()
    }
    .with_target_column(args.target)
    .with_test_size(args.test_size)
    .with_seed(args.seed);

    let report = run(&config)?;
    println!("{}", report.render());

    Ok(())
}
