//! Core types for holecheck

use crate::error::{Error, FailureKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle of one running target instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Starting,
    Ready,
    Loaded,
    Terminated,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Starting
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::Loaded => write!(f, "loaded"),
            LifecycleState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Stages the load sequencer walks through, strictly in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    Launched,
    EngineReady,
    SceneReady,
    ArtifactRequested,
    BricksLoading,
    LoadSettled,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Launched => write!(f, "launched"),
            LoadStage::EngineReady => write!(f, "engine_ready"),
            LoadStage::SceneReady => write!(f, "scene_ready"),
            LoadStage::ArtifactRequested => write!(f, "artifact_requested"),
            LoadStage::BricksLoading => write!(f, "bricks_loading"),
            LoadStage::LoadSettled => write!(f, "load_settled"),
        }
    }
}

/// A substring in the target's output that marks internal progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub pattern: String,
    pub meaning: String,
}

impl Trigger {
    pub fn new(pattern: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            meaning: meaning.into(),
        }
    }

    /// Whether an output line satisfies this trigger
    pub fn matches(&self, line: &str) -> bool {
        line.contains(&self.pattern)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.meaning, self.pattern)
    }
}

/// Absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Verdict handed back to the minimizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Fewer bricks were loaded than the save declares
    DefectConfirmed { live_count: u64, declared_total: u64 },
    NoDefect { live_count: u64, declared_total: u64 },
    RunFailed { kind: FailureKind, reason: String },
}

impl Outcome {
    /// Reduce the two counts to a verdict. A live count above the declared
    /// total is not a defect.
    pub fn from_counts(live_count: u64, declared_total: u64) -> Self {
        if live_count < declared_total {
            Outcome::DefectConfirmed {
                live_count,
                declared_total,
            }
        } else {
            Outcome::NoDefect {
                live_count,
                declared_total,
            }
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Outcome::RunFailed {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Outcome::DefectConfirmed { .. })
    }

    /// Process exit code for the minimizer
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::DefectConfirmed { .. } => 0,
            Outcome::NoDefect { .. } => 1,
            Outcome::RunFailed { .. } => 2,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::DefectConfirmed {
                live_count,
                declared_total,
            } => write!(
                f,
                "defect confirmed: {} of {} bricks loaded",
                live_count, declared_total
            ),
            Outcome::NoDefect {
                live_count,
                declared_total,
            } => write!(
                f,
                "no defect: {} of {} bricks loaded",
                live_count, declared_total
            ),
            Outcome::RunFailed { kind, reason } => write!(f, "run failed ({}): {}", kind, reason),
        }
    }
}

/// Summary of one oracle invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: i64,
    pub duration_ms: u64,
    pub artifact: Option<PathBuf>,
    pub outcome: Outcome,
}
