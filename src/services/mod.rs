//! Services module - the launch configuration synthesis pipeline.
//!
//! Everything here is framework-agnostic business logic operating on the files
//! described by [`crate::models::LauncherPaths`]. The leaf services are plain
//! synchronous functions; [`launch::LaunchOrchestrator`] sequences them on a
//! blocking worker and hands a [`crate::models::LaunchContext`] to the engine
//! launcher.
//!
//! # Components
//!
//! - [`kv_patch`]: `key = value` line patching, single-key and batched
//! - [`defaults_blob`]: base64 engine defaults patching
//! - [`version_gate`]: installed-assets version check
//! - [`installer`]: static asset (re)installation and configuration reset
//! - [`synthesizer`]: merged `openmw.cfg` generation
//! - [`settings`]: user `settings.cfg` catalog application and seeding
//! - [`collaborators`]: traits for the game installation, mod inventory, asset
//!   copier and ini converter
//! - [`game_detection`]: filesystem game installation
//! - [`engine`]: engine environment, arguments and process launch
//! - [`launch`]: orchestration and the [`LaunchError`] taxonomy
//!
//! # File writes
//!
//! Every file the pipeline produces goes through [`write_atomic`], so a reader
//! never observes a half-written config.

pub mod collaborators;
pub mod defaults_blob;
pub mod engine;
pub mod game_detection;
pub mod installer;
pub mod kv_patch;
pub mod launch;
pub mod settings;
pub mod synthesizer;
pub mod version_gate;

pub use collaborators::{
    AssetCopier, DirectoryAssetCopier, GameInstallation, IniConverter, ModInventory,
};
pub use engine::{EngineLauncher, ProcessEngineLauncher, build_environment, split_command_line};
pub use game_detection::GameFilesInstallation;
pub use installer::{StaticAssetInstaller, reset_config};
pub use kv_patch::{PatchOutcome, SettingsDocument};
pub use launch::{Collaborators, LaunchError, LaunchOrchestrator, resolve_tuning};
pub use settings::{SETTINGS_CATALOG, SettingBinding, SettingsApplier, SettingsReport, ValueKind};
pub use synthesizer::ConfigSynthesizer;
pub use version_gate::{StaleReason, VersionCheck};

use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};

/// Replace `path` with `bytes` via a temp file in the same directory and a rename.
///
/// The parent directory is created when missing. A replaced file keeps its
/// permissions; a new file gets the temp file's (owner-only on Unix).
pub(crate) fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let existing = match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if let Some(permissions) = existing {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
