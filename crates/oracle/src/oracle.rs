//! Top-level orchestration of one verdict
//!
//! Convert, place, launch, load, count, terminate, compare. The target is
//! terminated on every path out of [`Oracle::run`], and every failure becomes
//! [`Outcome::RunFailed`] instead of a negative verdict.

use crate::converter;
use crate::input::{ConsoleBackend, DesktopBackend, InputBackend, Injector};
use crate::layout::FixedLayout;
use crate::process::{LaunchPlan, Launcher, SystemLauncher, TargetHandle};
use crate::reader::OutputReader;
use crate::sequencer::LoadSequencer;
use crate::verdict::VerdictExtractor;
use holecheck_common::{
    Error, InteractionMode, LifecycleState, OracleConfig, Outcome, Result, RunReport,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// What the minimizer handed us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactInput {
    /// Model or schematic that still has to go through the converter
    Source(PathBuf),
    /// Save file that is already converted
    Save(PathBuf),
}

/// Single-use oracle answering exactly one verdict
pub struct Oracle {
    config: OracleConfig,
    launcher: Box<dyn Launcher>,
    desktop: Option<Box<dyn InputBackend>>,
    cancel: CancellationToken,
}

impl Oracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            launcher: Box::new(SystemLauncher),
            desktop: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_launcher(mut self, launcher: Box<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Input backend for UI mode (defaults to the configured input tool)
    pub fn with_desktop(mut self, backend: Box<dyn InputBackend>) -> Self {
        self.desktop = Some(backend);
        self
    }

    /// Token that aborts the run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Produce the verdict for one input
    pub async fn run(self, input: ArtifactInput) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("verdict", %run_id);
        let started_at = chrono::Utc::now().timestamp();
        let started = Instant::now();

        let mut artifact = None;
        let result = self
            .execute(input, &mut artifact)
            .instrument(span.clone())
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                span.in_scope(|| error!("Run failed: {}", e));
                Outcome::from_error(&e)
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        span.in_scope(|| info!("{} ({} ms)", outcome, duration_ms));

        RunReport {
            run_id: run_id.to_string(),
            started_at,
            duration_ms,
            artifact,
            outcome,
        }
    }

    async fn execute(mut self, input: ArtifactInput, artifact: &mut Option<PathBuf>) -> Result<Outcome> {
        self.config.validate()?;

        let save = match input {
            ArtifactInput::Source(source) => {
                converter::convert(&self.config.converter, &source).await?
            }
            ArtifactInput::Save(save) => {
                if !save.is_file() {
                    return Err(Error::ArtifactMissing(save));
                }
                save
            }
        };
        *artifact = Some(save.clone());

        let save_name = converter::place_in_saves(&save, &self.config.target.saves_dir).await?;

        let plan = LaunchPlan::from_config(&self.config);
        let process = self.launcher.launch(&plan).await?;
        let mut target = TargetHandle::new(process);

        let live = self.drive(&mut target, &save_name).await;
        target.terminate();
        let live_count = live?;

        let declared_total = VerdictExtractor::new(&self.config).declared_total(&save)?;
        Ok(VerdictExtractor::verdict(live_count, declared_total))
    }

    async fn drive(&mut self, target: &mut TargetHandle, save_name: &str) -> Result<u64> {
        let config = &self.config;
        let mut output = OutputReader::new(
            target.take_output()?,
            config.timing.trigger_timeout(),
            self.cancel.clone(),
        );

        let backend: Box<dyn InputBackend> = match &config.mode {
            InteractionMode::Dedicated { .. } => Box::new(ConsoleBackend::new(
                target.take_console()?,
                config.ui.submit_key.clone(),
            )),
            InteractionMode::Ui => match self.desktop.take() {
                Some(backend) => backend,
                None => Box::new(DesktopBackend::new(&config.ui.input_tool)),
            },
        };
        let mut input = Injector::new(
            backend,
            Box::new(FixedLayout::from_config(&config.ui)),
            config.timing.settle(),
            self.cancel.clone(),
        )
        .with_submit_key(config.ui.submit_key.clone());
        if config.mode == InteractionMode::Ui {
            input = input.with_focus_chord(config.ui.focus_chord.clone());
        }

        let mut sequencer = LoadSequencer::new(config, self.cancel.clone());
        sequencer.await_ready(&mut output).await?;
        target.advance(LifecycleState::Ready);

        sequencer.load(&mut output, &mut input, save_name).await?;
        target.advance(LifecycleState::Loaded);

        VerdictExtractor::new(config)
            .live_count(&mut output, &mut input)
            .await
    }
}
