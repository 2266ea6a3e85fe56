//! Data models for the launcher.
//!
//! - [`LauncherPaths`]: every file role of the launch pipeline, derived from three roots
//! - [`LauncherConfig`]: launcher settings loaded from `launcher.yaml`
//! - [`Preferences`]: the user-editable preference store
//! - [`ModList`] / [`ModEntry`]: the ordered mod collection
//! - [`LaunchState`] / [`LaunchStage`]: launch bookkeeping and the pipeline state machine
//! - [`LaunchContext`]: values resolved by the pipeline and consumed by the engine launch
//!
//! # Architecture Note
//!
//! Config structs derive `Serialize`/`Deserialize` for YAML persistence. `LaunchState`
//! is only mutated through [`StateManager`](crate::state::StateManager).

pub mod config;
pub mod launch_context;
pub mod launch_state;
pub mod mods;
pub mod paths;
pub mod preferences;

pub use config::{DisplayMetrics, EngineSettings, LauncherConfig, PathSettings};
pub use launch_context::{LaunchContext, LaunchTuning, MouseMode, Resolution};
pub use launch_state::{LaunchStage, LaunchState};
pub use mods::{ModEntry, ModKind, ModList};
pub use paths::{LauncherPaths, USER_CFG_PLACEHOLDER};
pub use preferences::{PreferenceValue, Preferences};
