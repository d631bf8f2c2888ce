//! Load sequencer
//!
//! Walks a freshly launched game to a settled world with the save loaded:
//!
//! ```text
//! Launched ──ready trigger──▶ EngineReady
//!   ui:        click start, select, launch ──▶ SceneReady
//!              renderer trigger, dismiss, click load, load save ──▶ ArtifactRequested
//!   dedicated: type load command ──▶ SceneReady ──▶ ArtifactRequested
//! ArtifactRequested ──loading trigger──▶ BricksLoading ──load settle──▶ LoadSettled
//! ```
//!
//! Trigger waits happen strictly in this order. There is no retry and no
//! partial recovery: any failed wait or missing control ends the run.

use crate::input::Injector;
use crate::reader::{pause, OutputReader};
use holecheck_common::config::controls;
use holecheck_common::{Error, InteractionMode, LoadStage, OracleConfig, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct LoadSequencer<'a> {
    config: &'a OracleConfig,
    cancel: CancellationToken,
    stage: LoadStage,
}

impl<'a> LoadSequencer<'a> {
    pub fn new(config: &'a OracleConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            stage: LoadStage::Launched,
        }
    }

    /// Last stage reached
    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    /// Wait for the game to finish booting.
    ///
    /// Output ending before the first trigger means the game never came up,
    /// which is reported as a launch failure.
    pub async fn await_ready(&mut self, output: &mut OutputReader) -> Result<()> {
        let trigger = self.config.triggers.ready(&self.config.mode);
        match output.wait_for(&trigger).await {
            Ok(_) => {
                self.enter(LoadStage::EngineReady);
                Ok(())
            }
            Err(Error::StreamClosed { waiting_for }) => Err(Error::Launch(format!(
                "target exited while waiting for {}",
                waiting_for
            ))),
            Err(e) => Err(e),
        }
    }

    /// Request the save and wait until its bricks have had time to settle
    pub async fn load(
        &mut self,
        output: &mut OutputReader,
        input: &mut Injector,
        save_name: &str,
    ) -> Result<()> {
        let config = self.config;
        match &config.mode {
            InteractionMode::Ui => self.request_via_menus(output, input).await?,
            InteractionMode::Dedicated { .. } => self.request_via_console(input, save_name).await?,
        }

        output.wait_for(&config.triggers.loading()).await?;
        self.enter(LoadStage::BricksLoading);

        // The game never reports that loading finished
        pause(config.timing.load_settle(), &self.cancel).await?;
        self.enter(LoadStage::LoadSettled);
        Ok(())
    }

    async fn request_via_menus(
        &mut self,
        output: &mut OutputReader,
        input: &mut Injector,
    ) -> Result<()> {
        // Into a single player instance
        input.click_control(controls::START_GAME).await?;
        input.click_control(controls::SELECT_GAME).await?;
        input.click_control(controls::LAUNCH_GAME).await?;
        self.enter(LoadStage::SceneReady);

        output.wait_for(&self.config.triggers.renderer()).await?;

        // The most recent save is listed first and preselected
        input.press(&self.config.ui.dismiss_key).await?;
        input.click_control(controls::LOAD).await?;
        input.click_control(controls::LOAD_SAVE).await?;
        self.enter(LoadStage::ArtifactRequested);
        Ok(())
    }

    async fn request_via_console(&mut self, input: &mut Injector, save_name: &str) -> Result<()> {
        input
            .submit(&self.config.commands.load_command(save_name))
            .await?;
        self.enter(LoadStage::SceneReady);
        self.enter(LoadStage::ArtifactRequested);
        Ok(())
    }

    fn enter(&mut self, stage: LoadStage) {
        info!("Load stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}
