//! Report formatting for the CLI

use clap::ValueEnum;
use colored::Colorize;
use holecheck_common::{Outcome, RunReport};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Single JSON object
    Json,
}

/// Print the report to stdout
pub fn print_report(report: &RunReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            let headline = match &report.outcome {
                Outcome::DefectConfirmed { .. } => format!("✗ {}", report.outcome).red().bold(),
                Outcome::NoDefect { .. } => format!("✓ {}", report.outcome).green().bold(),
                Outcome::RunFailed { .. } => format!("⚠ {}", report.outcome).yellow().bold(),
            };
            println!("{}", headline);
            println!("  run:      {}", report.run_id);
            if let Some(artifact) = &report.artifact {
                println!("  save:     {}", artifact.display());
            }
            println!("  duration: {:.1}s", report.duration_ms as f64 / 1000.0);
        }
    }
    Ok(())
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}
