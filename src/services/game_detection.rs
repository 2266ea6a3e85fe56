//! Game installation detection for locating the Morrowind data files.
//!
//! A game installation is a directory (the `game_files` preference) containing a
//! `Data Files` subdirectory that holds the `Morrowind.esm` master. Both names are
//! matched case-insensitively because the files are commonly copied from Windows
//! installs onto case-sensitive filesystems.
//!
//! # Examples
//!
//! ```ignore
//! use omwlaunch::services::{GameFilesInstallation, GameInstallation};
//!
//! let installation = GameFilesInstallation::new("/games/Morrowind");
//! if installation.is_valid() {
//!     let data = installation.data_files()?;
//! }
//! ```

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use crate::services::collaborators::GameInstallation;

/// Name of the data directory inside a game installation
pub const DATA_FILES_DIR: &str = "Data Files";

/// Master file whose presence marks a usable installation
pub const MASTER_FILE: &str = "Morrowind.esm";

/// Game installation rooted at a user-selected directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFilesInstallation {
    root: Utf8PathBuf,
}

impl GameFilesInstallation {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Locates the data files directory of this installation.
    ///
    /// # Returns
    ///
    /// The `Data Files` directory if it exists and contains the master file,
    /// `None` otherwise
    ///
    /// # Errors
    ///
    /// Returns an error if the installation root cannot be listed
    pub fn find_data_files(&self) -> Result<Option<Utf8PathBuf>> {
        if self.root.as_str().is_empty() {
            return Ok(None);
        }

        let Some(data_dir) = find_entry_ignore_case(&self.root, DATA_FILES_DIR, true)? else {
            tracing::debug!("No '{}' directory under {}", DATA_FILES_DIR, self.root);
            return Ok(None);
        };

        if find_entry_ignore_case(&data_dir, MASTER_FILE, false)?.is_none() {
            tracing::debug!("{} is missing {}", data_dir, MASTER_FILE);
            return Ok(None);
        }

        Ok(Some(data_dir))
    }
}

impl GameInstallation for GameFilesInstallation {
    fn is_valid(&self) -> bool {
        match self.find_data_files() {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!("Error checking game installation {}: {:#}", self.root, e);
                false
            }
        }
    }

    fn data_files(&self) -> Result<String> {
        match self.find_data_files()? {
            Some(dir) => Ok(dir.into_string()),
            None => bail!("No valid game data files under '{}'", self.root),
        }
    }
}

/// Finds a direct child of `dir` named `name`, ignoring ASCII case.
///
/// # Arguments
///
/// * `dir` - Directory to list; a missing directory yields `None`
/// * `name` - Entry name to match
/// * `want_dir` - Match directories when true, regular files otherwise
fn find_entry_ignore_case(dir: &Utf8Path, name: &str, want_dir: bool) -> Result<Option<Utf8PathBuf>> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to list {}", dir)),
    };

    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir))?;
        if !entry.file_name().eq_ignore_ascii_case(name) {
            continue;
        }

        let metadata = fs::metadata(entry.path())
            .with_context(|| format!("Failed to stat {}", entry.path()))?;
        if metadata.is_dir() == want_dir {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}
