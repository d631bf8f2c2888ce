//! holecheck oracle engine
//!
//! Answers one question for a delta-debugging loop: after the game loads a
//! converted save, are bricks missing?
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Oracle::run                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  converter    convert() -> save, place_in_saves() -> name   │
//! │  process      Launcher::launch(plan) -> TargetHandle        │
//! │  sequencer    await_ready() / load()                        │
//! │    ├── reader     OutputReader::wait_for(trigger)           │
//! │    └── input      Injector (desktop tool | stdin console)   │
//! │                     └── layout  ControlLocator              │
//! │  verdict      live_count() vs declared_total()              │
//! │  process      TargetHandle::terminate()  (every path)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod converter;
pub mod input;
pub mod layout;
pub mod oracle;
pub mod process;
pub mod reader;
pub mod sequencer;
pub mod verdict;

pub use oracle::{ArtifactInput, Oracle};
pub use process::{LaunchPlan, Launcher, SystemLauncher, TargetHandle, TargetProcess};
