//! Oracle configuration
//!
//! Built once per run and passed by reference into every component. Nothing
//! here touches process-wide environment variables.

use crate::error::{Error, Result};
use crate::types::{ScreenPoint, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Named on-screen controls the UI path clicks, in order of use
pub mod controls {
    pub const START_GAME: &str = "start_game";
    pub const SELECT_GAME: &str = "select_game";
    pub const LAUNCH_GAME: &str = "launch_game";
    pub const LOAD: &str = "load";
    pub const LOAD_SAVE: &str = "load_save";

    pub const REQUIRED: [&str; 5] = [START_GAME, SELECT_GAME, LAUNCH_GAME, LOAD, LOAD_SAVE];
}

/// Placeholder replaced by the save file name in the load command
pub const SAVE_PLACEHOLDER: &str = "{save}";
/// Placeholder replaced by the input path in converter arguments
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced by the scale in converter arguments
pub const SCALE_PLACEHOLDER: &str = "{scale}";

/// Top-level oracle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// How to launch the game
    pub target: TargetConfig,

    /// UI-driven or dedicated-server interaction
    pub mode: InteractionMode,

    /// Delays and timeouts
    pub timing: TimingConfig,

    /// Output lines that gate each stage
    pub triggers: TriggerConfig,

    /// Console command strings
    pub commands: CommandConfig,

    /// Desktop input settings for the UI path
    pub ui: UiConfig,

    /// Save file layout
    pub artifact: ArtifactConfig,

    /// External converter invocation
    pub converter: ConverterConfig,
}

/// Target executable configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Path to the game executable
    pub executable: PathBuf,

    /// Directory the game loads saves from
    pub saves_dir: PathBuf,

    /// Working directory for the game process
    pub working_dir: Option<PathBuf>,

    /// Extra arguments appended after the mode arguments
    pub extra_args: Vec<String>,

    /// Compatibility shim used to run the executable (None = run natively)
    pub compat: Option<CompatShim>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        let game_dir = crate::default_steam_apps_path()
            .join("common")
            .join("Blockland");
        let compat = if cfg!(windows) {
            None
        } else {
            Some(CompatShim::default())
        };

        Self {
            executable: game_dir.join("Blockland.exe"),
            saves_dir: game_dir.join("saves"),
            working_dir: None,
            extra_args: Vec::new(),
            compat,
        }
    }
}

/// Compatibility layer wrapping the executable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatShim {
    /// Shim program
    pub program: PathBuf,

    /// Arguments placed between the shim and the executable
    pub args: Vec<String>,

    /// Data directory exported to the shim's environment
    pub data_path: PathBuf,
}

impl CompatShim {
    /// Environment the shim expects, scoped to the child process
    pub fn env(&self) -> Vec<(&'static str, PathBuf)> {
        vec![
            ("STEAM_COMPAT_DATA_PATH", self.data_path.clone()),
            ("STEAM_COMPAT_CLIENT_INSTALL_PATH", self.data_path.clone()),
        ]
    }
}

impl Default for CompatShim {
    fn default() -> Self {
        let apps = crate::default_steam_apps_path();
        Self {
            program: apps.join("common").join("Proton - Experimental").join("proton"),
            args: vec!["run".to_string()],
            data_path: apps.join("compatdata"),
        }
    }
}

/// How the oracle talks to the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionMode {
    /// Click through the menus with simulated desktop input
    Ui,
    /// Run a dedicated server and type console commands into it
    Dedicated { token: String },
}

impl Default for InteractionMode {
    fn default() -> Self {
        Self::Ui
    }
}

impl InteractionMode {
    /// Arguments that select this mode on the game's command line
    pub fn launch_args(&self) -> Vec<String> {
        match self {
            InteractionMode::Ui => Vec::new(),
            InteractionMode::Dedicated { token } => {
                vec![token.clone(), "-dedicated".to_string()]
            }
        }
    }

    pub fn is_dedicated(&self) -> bool {
        matches!(self, InteractionMode::Dedicated { .. })
    }
}

/// Delays and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause after every injected input event
    pub settle_ms: u64,

    /// Pause after the loading trigger before any count is queried
    pub load_settle_secs: u64,

    /// Upper bound for any single trigger wait
    pub trigger_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1000,
            load_settle_secs: 10,
            trigger_timeout_secs: 300,
        }
    }
}

impl TimingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn load_settle(&self) -> Duration {
        Duration::from_secs(self.load_settle_secs)
    }

    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_timeout_secs)
    }
}

/// Output substrings used to synchronize with the game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Last line before the main menu accepts input
    pub engine_ready: String,

    /// Last line before the dedicated server accepts console commands
    pub dedicated_ready: String,

    /// Last line before a single player scene accepts input
    pub renderer_ready: String,

    /// Printed once the save starts populating the world
    pub bricks_loading: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            engine_ready: "Engine initialized".to_string(),
            dedicated_ready: "Dedicated server is now running.".to_string(),
            renderer_ready: "Linking GLSL program".to_string(),
            bricks_loading: "LOADING BRICKS".to_string(),
        }
    }
}

impl TriggerConfig {
    /// First trigger for the given mode
    pub fn ready(&self, mode: &InteractionMode) -> Trigger {
        match mode {
            InteractionMode::Ui => Trigger::new(&self.engine_ready, "engine ready"),
            InteractionMode::Dedicated { .. } => {
                Trigger::new(&self.dedicated_ready, "dedicated server ready")
            }
        }
    }

    pub fn renderer(&self) -> Trigger {
        Trigger::new(&self.renderer_ready, "renderer ready")
    }

    pub fn loading(&self) -> Trigger {
        Trigger::new(&self.bricks_loading, "bricks loading")
    }
}

/// Console commands understood by the game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Prints the number of bricks currently in the world
    pub count_query: String,

    /// Loads a save by relative path; `{save}` is the file name
    pub load_save: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            count_query: "echo(getBrickCount());".to_string(),
            load_save: r#"serverDirectSaveFileLoad("saves/{save}", 3, "", 1);"#.to_string(),
        }
    }
}

impl CommandConfig {
    pub fn load_command(&self, save_name: &str) -> String {
        self.load_save.replace(SAVE_PLACEHOLDER, save_name)
    }
}

/// Desktop input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// External input tool used to synthesize events
    pub input_tool: PathBuf,

    /// Key chord that brings the game's console to the foreground
    pub focus_chord: String,

    /// Key that closes the in-game overlay before loading
    pub dismiss_key: String,

    /// Key that submits a typed command
    pub submit_key: String,

    /// Fixed coordinates of each named control
    pub controls: BTreeMap<String, ScreenPoint>,
}

impl Default for UiConfig {
    fn default() -> Self {
        let mut controls = BTreeMap::new();
        controls.insert(controls::START_GAME.to_string(), ScreenPoint::new(697, 502));
        controls.insert(controls::SELECT_GAME.to_string(), ScreenPoint::new(1996, 1207));
        // The launch button replaces the select button in place
        controls.insert(controls::LAUNCH_GAME.to_string(), ScreenPoint::new(1996, 1207));
        controls.insert(controls::LOAD.to_string(), ScreenPoint::new(1220, 785));
        controls.insert(controls::LOAD_SAVE.to_string(), ScreenPoint::new(1544, 922));

        Self {
            input_tool: PathBuf::from("xdotool"),
            focus_chord: "alt+Tab".to_string(),
            dismiss_key: "Escape".to_string(),
            submit_key: "Return".to_string(),
            controls,
        }
    }
}

/// Where the declared total lives in a save file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// 0-based line index of the total line
    pub total_line_index: usize,

    /// Label token expected in front of the total
    pub total_label: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            total_line_index: 67,
            total_label: "Linecount".to_string(),
        }
    }
}

/// External converter producing the save file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Converter program
    pub program: PathBuf,

    /// Arguments with `{input}` and `{scale}` placeholders
    pub args: Vec<String>,

    /// Save file the converter writes
    pub output: PathBuf,

    /// Smallest cube size used during conversion
    pub scale: u32,

    /// Optional model to voxel pre-step
    pub voxelizer: Option<VoxelizerConfig>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("cargo"),
            args: ["run", "--release", "--", INPUT_PLACEHOLDER, SCALE_PLACEHOLDER]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output: PathBuf::from("output.bls"),
            scale: 4,
            voxelizer: None,
        }
    }
}

/// Voxelizer turning a 3-D model into the converter's input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelizerConfig {
    pub program: PathBuf,

    /// Arguments with an `{input}` placeholder
    pub args: Vec<String>,

    /// Directory the voxelizer writes into
    pub output_dir: PathBuf,

    /// Extension of the voxelizer's output file
    pub extension: String,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("binvox"),
            args: ["-e", "-rotz", "-t", "schematic", INPUT_PLACEHOLDER]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("assets/delta_debugging"),
            extension: "schematic".to_string(),
        }
    }
}

impl OracleConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a verdict
    pub fn validate(&self) -> Result<()> {
        let triggers = [
            ("engine_ready", &self.triggers.engine_ready),
            ("dedicated_ready", &self.triggers.dedicated_ready),
            ("renderer_ready", &self.triggers.renderer_ready),
            ("bricks_loading", &self.triggers.bricks_loading),
        ];
        for (name, pattern) in triggers {
            if pattern.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "trigger '{}' must not be empty",
                    name
                )));
            }
        }

        if self.timing.trigger_timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "trigger_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.commands.count_query.is_empty() {
            return Err(Error::InvalidConfig("count_query must not be empty".to_string()));
        }

        if !self.commands.load_save.contains(SAVE_PLACEHOLDER) {
            return Err(Error::InvalidConfig(format!(
                "load_save command must contain {}",
                SAVE_PLACEHOLDER
            )));
        }

        if self.artifact.total_label.is_empty() {
            return Err(Error::InvalidConfig("total_label must not be empty".to_string()));
        }

        if !self.converter.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            return Err(Error::InvalidConfig(format!(
                "converter args must contain {}",
                INPUT_PLACEHOLDER
            )));
        }

        match &self.mode {
            InteractionMode::Ui => {
                for name in controls::REQUIRED {
                    if !self.ui.controls.contains_key(name) {
                        return Err(Error::InvalidConfig(format!(
                            "ui mode needs coordinates for control '{}'",
                            name
                        )));
                    }
                }
            }
            InteractionMode::Dedicated { token } => {
                if token.is_empty() {
                    return Err(Error::InvalidConfig(
                        "dedicated mode needs an access token".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
