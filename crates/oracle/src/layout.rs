//! Locating named on-screen controls

use holecheck_common::config::UiConfig;
use holecheck_common::{Error, Result, ScreenPoint};
use std::collections::BTreeMap;

/// Finds the screen position of a named control
pub trait ControlLocator: Send + Sync {
    fn locate(&self, control: &str) -> Result<ScreenPoint>;
}

/// Controls pinned to known coordinates for a fixed window layout
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    controls: BTreeMap<String, ScreenPoint>,
}

impl FixedLayout {
    pub fn new(controls: impl IntoIterator<Item = (String, ScreenPoint)>) -> Self {
        Self {
            controls: controls.into_iter().collect(),
        }
    }

    pub fn from_config(ui: &UiConfig) -> Self {
        Self {
            controls: ui.controls.clone(),
        }
    }
}

impl ControlLocator for FixedLayout {
    fn locate(&self, control: &str) -> Result<ScreenPoint> {
        self.controls
            .get(control)
            .copied()
            .ok_or_else(|| Error::ControlNotFound(control.to_string()))
    }
}
