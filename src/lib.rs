//! PixelMood: sentiment analysis of typed comments and screenshot text over hosted models.
//!
//! The library side is [`pipeline::Analyzer`]; [`run`] is the CLI entry point used by the binary.

mod cli;
pub mod config;
pub mod inference;
pub mod pipeline;
pub mod presentation;
pub mod report;
pub mod segmenter;
pub mod sentiment;
pub mod system;

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub use pipeline::{Analyzer, PipelineConfig, Submission, SubmissionError};
pub use presentation::DisplayCategory;
pub use report::AnalysisReport;
pub use sentiment::{classify, SentimentModel, SentimentResult};
pub use system::{OcrEngine, OcrProgress};

fn init_tracing(level: config::LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    let level = cli.log_level.unwrap_or_else(config::load_log_level);
    init_tracing(level);

    let settings = config::load_settings();
    debug!(
        inference_url = %settings.inference_url,
        has_api_key = settings.api_key.is_some(),
        "Settings resolved"
    );

    // One cooperative context: submissions never run anything in parallel.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli.command, settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
