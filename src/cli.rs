//! Command-line front end over the submission pipeline.

use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::config::{self, ConfigError, LogLevel, Settings};
use crate::pipeline::{Analyzer, Submission};
use crate::presentation::{copy_report, render_report, report_json};
use crate::sentiment::HostedSentimentModel;
use crate::system::{HostedOcrEngine, OcrProgress};

#[derive(Parser, Debug)]
#[command(name = "pixelmood")]
#[command(version, about = "Sentiment analysis of comments and screenshots", long_about = None)]
pub struct Cli {
    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(long, global = true, value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze typed comment text and/or the text in a screenshot
    Analyze(AnalyzeArgs),

    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Comment text to analyze; `-` reads it from stdin
    #[arg(short, long)]
    pub text: Option<String>,

    /// Screenshot whose text should be analyzed
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Inference API key (overrides environment and config file)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Drop OCR lines shorter than this many characters
    #[arg(long)]
    pub min_line_length: Option<usize>,

    /// How to print the report on stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Copy the JSON report to the clipboard
    #[arg(long)]
    pub copy: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not print progress on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration (API key masked)
    Show,
    /// Print the config file location
    Path,
    /// Save the inference API key
    SetApiKey { key: String },
    /// Save the default log level
    SetLogLevel {
        #[arg(value_parser = parse_log_level)]
        level: LogLevel,
    },
    /// Save the minimum OCR line length
    SetMinLineLength { min_length: usize },
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{s}'"))
}

pub async fn execute(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Analyze(args) => analyze(args, settings).await,
        Commands::Config(cmd) => config_command(cmd, &settings),
    }
}

fn print_progress(progress: OcrProgress) {
    match progress {
        OcrProgress::Preparing => eprintln!("Reading image..."),
        OcrProgress::Recognizing { bytes } => {
            eprintln!("Extracting text ({} KB uploaded)...", bytes.div_ceil(1024))
        }
        OcrProgress::Done { chars } => eprintln!("Extracted {chars} characters"),
    }
}

/// Applies per-run flags on top of the resolved settings. A blank `--api-key` is ignored.
fn apply_overrides(
    settings: &mut Settings,
    api_key: Option<String>,
    min_line_length: Option<usize>,
) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        settings.api_key = Some(key);
    }
    if let Some(min_length) = min_line_length {
        settings.min_line_length = min_length;
    }
}

async fn analyze(args: AnalyzeArgs, mut settings: Settings) -> Result<()> {
    apply_overrides(&mut settings, args.api_key, args.min_line_length);

    let manual_text = match args.text {
        Some(text) if text == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read comment text from stdin")?;
            Some(buf)
        }
        other => other,
    };

    let image = match &args.image {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read image {}", path.display()))?,
        ),
        None => None,
    };

    let analyzer = Analyzer::new(
        HostedOcrEngine::new(settings.ocr_endpoint()),
        HostedSentimentModel::new(settings.sentiment_endpoint()),
    );
    let quiet = args.quiet;
    let progress = move |p: OcrProgress| {
        if !quiet {
            print_progress(p);
        }
    };

    let submission = Submission::new(manual_text, image);
    let report = analyzer
        .run_submission(&submission, &settings.pipeline_config(), &progress)
        .await?;

    match args.format {
        OutputFormat::Text => print!("{}", render_report(&report)),
        OutputFormat::Json => println!("{}", report_json(&report)?),
    }

    if let Some(path) = &args.output {
        tokio::fs::write(path, report_json(&report)?)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !quiet {
            eprintln!("Saved report to {}", path.display());
        }
    }

    if args.copy {
        let to_copy = report.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let (ack, hold) = copy_report(&to_copy)?;
            if !quiet {
                eprintln!("{}: report JSON is on the clipboard", ack.label_at(Instant::now()));
            }
            // Serve the contents for as long as the acknowledgment is shown.
            hold.release_at(ack.expires_at());
            debug!("Copy acknowledgment expired");
            Ok(())
        })
        .await
        .context("Clipboard task failed")??;
    }

    Ok(())
}

fn config_command(cmd: ConfigCommand, settings: &Settings) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&settings.redacted_json())?);
        }
        ConfigCommand::Path => {
            let path = config::config_path().ok_or(ConfigError::NoConfigDir)?;
            println!("{}", path.display());
        }
        ConfigCommand::SetApiKey { key } => {
            let key = key.trim().to_string();
            anyhow::ensure!(!key.is_empty(), "API key must not be empty");
            let path = config::save_api_key(key).context("Failed to save API key")?;
            println!("Saved API key to {}", path.display());
        }
        ConfigCommand::SetLogLevel { level } => {
            let path = config::save_log_level(level).context("Failed to save log level")?;
            println!("Saved log level {} to {}", level.as_str(), path.display());
        }
        ConfigCommand::SetMinLineLength { min_length } => {
            let path = config::save_min_line_length(min_length)
                .context("Failed to save minimum line length")?;
            println!("Saved minimum line length {min_length} to {}", path.display());
        }
    }
    Ok(())
}
