use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

mod config;
mod deltas;
mod error;
mod ingest;
mod models;
mod patterns;
mod report;
mod stats;

use config::Thresholds;
use ingest::PipelineOutput;

#[derive(Parser)]
#[command(name = "appstat")]
#[command(about = "Job application CSV statistics and pattern analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print overall and per-dimension statistics
    Stats {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Detect threshold-rule patterns
    Patterns {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        /// Override the maximum number of surfaced patterns
        #[arg(long)]
        max_exposed: Option<usize>,
    },
    /// Narrate per-group interview-rate deviations
    Insights {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
        /// Override the maximum number of findings
        #[arg(long)]
        top: Option<usize>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { csv, config, json } => {
            let thresholds = Thresholds::load_or_default(config.as_deref())?;
            let output = load_applications(&csv, json)?;
            let stats = stats::build_stats(&output.records, &thresholds);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Commands::Patterns {
            csv,
            config,
            json,
            max_exposed,
        } => {
            let mut thresholds = Thresholds::load_or_default(config.as_deref())?;
            if let Some(max_exposed) = max_exposed {
                thresholds.max_exposed_patterns = max_exposed;
            }
            let output = load_applications(&csv, json)?;
            let stats = stats::build_stats(&output.records, &thresholds);
            let patterns = patterns::detect_patterns(&stats, &thresholds);
            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else if patterns.is_empty() {
                println!("No patterns surfaced for this dataset.");
            } else {
                for pattern in &patterns {
                    println!("{}", report::pattern_line(pattern));
                }
            }
        }
        Commands::Insights {
            csv,
            config,
            json,
            top,
        } => {
            let mut thresholds = Thresholds::load_or_default(config.as_deref())?;
            if let Some(top) = top {
                thresholds.max_delta_findings = top;
            }
            let output = load_applications(&csv, json)?;
            let stats = stats::build_stats(&output.records, &thresholds);
            let findings = deltas::detect_deltas(&stats, &thresholds);
            let sentences = report::narrate(&findings);
            if json {
                println!("{}", serde_json::to_string_pretty(&sentences)?);
            } else if sentences.is_empty() {
                println!("No rate deviations above the reporting threshold.");
            } else {
                for sentence in &sentences {
                    println!("- {}", sentence.text);
                }
            }
        }
        Commands::Report { csv, config, out } => {
            let thresholds = Thresholds::load_or_default(config.as_deref())?;
            let output = load_applications(&csv, false)?;
            let stats = stats::build_stats(&output.records, &thresholds);
            let patterns = patterns::detect_patterns(&stats, &thresholds);
            let findings = deltas::detect_deltas(&stats, &thresholds);
            let sentences = report::narrate(&findings);
            let source_name = csv
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| csv.display().to_string());
            let report = report::build_report(&source_name, &stats, &patterns, &sentences);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("appstat=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

/// Read and normalize the CSV. Pipeline failures are expected user
/// conditions: print the structured error and exit instead of unwinding
/// through anyhow.
fn load_applications(csv: &Path, json: bool) -> anyhow::Result<PipelineOutput> {
    let text = std::fs::read_to_string(csv)
        .with_context(|| format!("failed to read {}", csv.display()))?;
    let parsed = ingest::tokenize(&text);
    match ingest::run_pipeline(&parsed) {
        Ok(output) => Ok(output),
        Err(err) => {
            if json {
                eprintln!("{}", serde_json::to_string_pretty(&err.to_json())?);
            } else {
                eprintln!("{}: {}", err.code(), err);
            }
            std::process::exit(1);
        }
    }
}

fn print_stats(stats: &models::StatsResult) {
    println!("Applications: {}", stats.overall.total);
    for status in models::Status::ALL {
        println!("  {}: {}", status.as_str(), stats.overall.by_status.get(status));
    }
    match stats.overall.interview_rate {
        Some(rate) => println!("Interview rate: {:.1}%", rate * 100.0),
        None => println!("Interview rate: n/a (sample below minimum)"),
    }

    for breakdown in &stats.breakdowns {
        println!();
        println!("By {}:", breakdown.dimension.as_str());
        for row in &breakdown.rows {
            match row.interview_rate {
                Some(rate) => println!(
                    "  - {}: {} applications (interview rate {:.1}%)",
                    row.key,
                    row.total,
                    rate * 100.0
                ),
                None => println!(
                    "  - {}: {} applications (interview rate n/a)",
                    row.key, row.total
                ),
            }
        }
    }
}
