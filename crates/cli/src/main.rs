//! holecheck CLI - Main Entry Point
//!
//! Called once per candidate by a delta-debugging minimizer. The verdict goes
//! to stdout and the exit code: 0 bricks are missing, 1 all bricks loaded,
//! 2 the run itself failed.

use clap::{Parser, ValueEnum};
use holecheck_common::{InteractionMode, OracleConfig};
use holecheck_oracle::{ArtifactInput, Oracle};
use std::path::PathBuf;
use tracing::{info, warn};

mod output;

/// Exit code for a run that never produced a verdict
const EXIT_RUN_FAILED: i32 = 2;

/// holecheck - does the game drop bricks from this save?
#[derive(Parser)]
#[command(name = "holecheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model to convert, or a finished save with --skip-convert
    input: PathBuf,

    /// Configuration file
    #[arg(long, default_value_os_t = holecheck_common::default_config_path())]
    config: PathBuf,

    /// How to drive the game
    #[arg(long)]
    mode: Option<ModeArg>,

    /// Access token for dedicated mode
    #[arg(long, env = "HOLECHECK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Converter scale factor
    #[arg(long)]
    scale: Option<u32>,

    /// Seconds to wait after bricks start loading
    #[arg(long)]
    load_settle_secs: Option<u64>,

    /// Seconds to wait for any single trigger
    #[arg(long)]
    trigger_timeout_secs: Option<u64>,

    /// Treat the input as an already converted save
    #[arg(long)]
    skip_convert: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Desktop client driven through its menus
    Ui,
    /// Dedicated server driven through its console
    Dedicated,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, config: &mut OracleConfig) {
        let mode = self.mode.or(match config.mode {
            InteractionMode::Ui => None,
            InteractionMode::Dedicated { .. } => Some(ModeArg::Dedicated),
        });
        match mode {
            Some(ModeArg::Ui) => config.mode = InteractionMode::Ui,
            Some(ModeArg::Dedicated) => {
                let token = match (&self.token, &config.mode) {
                    (Some(token), _) => token.clone(),
                    (None, InteractionMode::Dedicated { token }) => token.clone(),
                    (None, InteractionMode::Ui) => String::new(),
                };
                config.mode = InteractionMode::Dedicated { token };
            }
            None => {}
        }

        if let Some(scale) = self.scale {
            config.converter.scale = scale;
        }
        if let Some(secs) = self.load_settle_secs {
            config.timing.load_settle_secs = secs;
        }
        if let Some(secs) = self.trigger_timeout_secs {
            config.timing.trigger_timeout_secs = secs;
        }
    }

    fn artifact_input(&self) -> ArtifactInput {
        if self.skip_convert {
            ArtifactInput::Save(self.input.clone())
        } else {
            ArtifactInput::Source(self.input.clone())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the report
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            EXIT_RUN_FAILED
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = OracleConfig::load(&cli.config)?;
    cli.apply(&mut config);
    info!(
        "holecheck v{} ({} mode)",
        holecheck_common::VERSION,
        if config.mode.is_dedicated() { "dedicated" } else { "ui" }
    );

    let oracle = Oracle::new(config);
    let cancel = oracle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, shutting the target down");
            cancel.cancel();
        }
    });

    let report = oracle.run(cli.artifact_input()).await;
    output::print_report(&report, cli.format)?;
    Ok(report.outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("holecheck").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let cli = parse(&[
            "model.obj",
            "--scale",
            "8",
            "--load-settle-secs",
            "3",
            "--trigger-timeout-secs",
            "60",
        ]);
        let mut config = OracleConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.converter.scale, 8);
        assert_eq!(config.timing.load_settle_secs, 3);
        assert_eq!(config.timing.trigger_timeout_secs, 60);
        assert_eq!(config.mode, InteractionMode::Ui);
        assert_eq!(cli.artifact_input(), ArtifactInput::Source("model.obj".into()));
    }

    #[test]
    fn test_dedicated_flag_keeps_configured_token() {
        let cli = parse(&["output.bls", "--skip-convert", "--mode", "dedicated"]);
        let mut config = OracleConfig::default();
        config.mode = InteractionMode::Dedicated {
            token: "from-file".to_string(),
        };
        cli.apply(&mut config);

        assert_eq!(
            config.mode,
            InteractionMode::Dedicated {
                token: "from-file".to_string()
            }
        );
        assert_eq!(cli.artifact_input(), ArtifactInput::Save("output.bls".into()));
    }

    #[test]
    fn test_ui_flag_overrides_dedicated_file() {
        let cli = parse(&["model.obj", "--mode", "ui"]);
        let mut config = OracleConfig::default();
        config.mode = InteractionMode::Dedicated {
            token: "tok".to_string(),
        };
        cli.apply(&mut config);
        assert_eq!(config.mode, InteractionMode::Ui);
    }
}
