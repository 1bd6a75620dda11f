//! attrprobe CLI
//!
//! Probes LLM generations for demographic signal: loads each model's
//! generation logs, runs every (model, attribute, mode) probe and writes the
//! nested results as JSON.

use anyhow::{Context, Result};
use attrprobe_core::{Attribute, Mode};
use attrprobe_probe::Probe;
use clap::Parser;
use tracing::{info, warn};

mod config;
mod grid;
mod loader;
mod report;

use crate::config::GridConfig;
use grid::{run_grid, GridOptions};
use report::{InferenceTable, TopFeatures, DEFAULT_TOP_N};

/// Single probe run by `--debug` unless overridden
const DEBUG_MODEL: &str = "google/gemma-2-9b-it";
const DEBUG_ATTRIBUTE: Attribute = Attribute::PatronType;
const DEBUG_MODE: Mode = Mode::FunctionWords;

#[derive(Parser, Debug)]
#[command(name = "attrprobe")]
#[command(about = "Run the attribute-probing suite over LLM generations", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "attrprobe.yaml")]
    config: String,

    /// Directory holding the generation logs
    #[arg(short, long)]
    input_dir: Option<std::path::PathBuf>,

    /// Result file
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,

    /// Only probe this model
    #[arg(short, long)]
    model: Option<String>,

    /// Only probe this attribute (sex, race_ethnicity, patron_type)
    #[arg(short, long)]
    attribute: Option<Attribute>,

    /// Only use this mode (content, stopwords)
    #[arg(long)]
    mode: Option<Mode>,

    /// Concurrent probe tasks; 0 uses every core
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Abort on the first failed run
    #[arg(long)]
    fail_fast: bool,

    /// Run a single probe, propagate its errors and print its inferential table
    #[arg(long)]
    debug: bool,

    /// Rows per printed feature table; 0 disables the tables
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    attrprobe_probe::describe_metrics();

    let config = GridConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded from {}", cli.config);
    info!("Input directory: {}", config.input_dir.display());

    let probe = Probe::new(config.probe.clone()).context("Invalid probe settings")?;
    info!("Stopwords: {}", probe.stopwords().len());

    if cli.debug {
        return run_debug(&cli, &config, &probe);
    }

    let jobs = if cli.jobs == 0 {
        num_cpus::get()
    } else {
        cli.jobs
    };
    let options = GridOptions {
        jobs,
        fail_fast: cli.fail_fast,
    };

    let results = run_grid(&config, probe, options).await?;

    if cli.top_n > 0 {
        for (model, run) in results.iter() {
            println!("\n##### {} / {} / {}", model, run.attribute, run.mode);
            print!("{}", TopFeatures::new(run, cli.top_n));
        }
    }

    report::write_results(&config.output_path, &results)?;
    for failure in results.failures() {
        warn!(
            "Skipped {} / {} / {}: {}",
            failure.model, failure.attribute, failure.mode, failure.error
        );
    }
    if results.is_empty() {
        anyhow::bail!("every probe run failed");
    }

    println!(
        "\nAll experiments completed and results saved to '{}'.",
        config.output_path.display()
    );
    Ok(())
}

/// Single probe with errors propagated
fn run_debug(cli: &Cli, config: &GridConfig, probe: &Probe) -> Result<()> {
    let model = cli.model.as_deref().unwrap_or(DEBUG_MODEL);
    let attribute = cli.attribute.unwrap_or(DEBUG_ATTRIBUTE);
    let mode = cli.mode.unwrap_or(DEBUG_MODE);
    println!(
        "DEBUG: running single probe for {} / {} / {}",
        model, attribute, mode
    );

    let corpus =
        loader::load_generations(&config.input_dir, model, attribute, &config.failure_token)?;
    let result = probe.run_for_model(&corpus, model, attribute, mode)?;

    if cli.top_n > 0 {
        print!("{}", TopFeatures::new(&result, cli.top_n));
    }
    println!("\nDEBUG: full inferential table:\n");
    match &result.inference_error {
        Some(error) => println!("unavailable: {}", error),
        None => print!("{}", InferenceTable(&result.inference)),
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("attrprobe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("attrprobe=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
