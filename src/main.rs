use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use batch_sentiment::core::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_LENGTH};
use batch_sentiment::models::sentiment_roberta::{DEFAULT_MODEL_ID, DEFAULT_REVISION};
use batch_sentiment::{score_csv, RobertaSentimentOptions, SentimentAnalysisPipelineBuilder};

/// Score the `content` column of a CSV file as negative, neutral or positive.
#[derive(Parser, Debug)]
#[command(name = "batch-sentiment", version, about)]
struct Cli {
    /// CSV file with a `content` column.
    #[arg(short, long, env = "BATCH_SENTIMENT_INPUT")]
    input: PathBuf,

    /// Where to write the scored table.
    #[arg(
        short,
        long,
        env = "BATCH_SENTIMENT_OUTPUT",
        default_value = "processed/dropbox_with_sentiment.csv"
    )]
    output: PathBuf,

    /// Rows per forward pass.
    #[arg(long, env = "BATCH_SENTIMENT_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Token limit per row.
    #[arg(long, env = "BATCH_SENTIMENT_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Never use CUDA or Metal.
    #[arg(long, env = "BATCH_SENTIMENT_CPU")]
    cpu: bool,

    /// Hub repository id, or a local directory holding the model files.
    #[arg(long, env = "BATCH_SENTIMENT_MODEL", default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Hub revision (branch, tag or commit).
    #[arg(long, env = "BATCH_SENTIMENT_REVISION", default_value = DEFAULT_REVISION)]
    revision: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let pipeline = SentimentAnalysisPipelineBuilder::roberta(RobertaSentimentOptions {
        model_id: cli.model,
        revision: cli.revision,
    })
    .batch_size(cli.batch_size)
    .max_length(cli.max_length)
    .use_accelerated_device(!cli.cpu)
    .build()?;

    let report = score_csv(&pipeline, &cli.input, &cli.output)?;

    print!("{}", report.tally);
    println!(
        "{} rows in {:.1}s ({:.1} rows/s)",
        report.stats.rows,
        report.stats.elapsed.as_secs_f64(),
        report.stats.rows_per_second()
    );
    println!("Saved: {}", report.output.display());
    Ok(())
}
