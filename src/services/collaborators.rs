//! Interfaces of the external collaborators the launch pipeline consumes.
//!
//! The pipeline runs on a blocking worker thread, so every collaborator must be
//! `Send + Sync`.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use walkdir::WalkDir;

use crate::models::{ModKind, ModList};

/// Locates and validates the game's data files
#[cfg_attr(test, mockall::automock)]
pub trait GameInstallation: Send + Sync {
    fn is_valid(&self) -> bool;

    /// Data files location exactly as it should appear in `data=`
    fn data_files(&self) -> Result<String>;
}

/// Read-only view of the user's mod collection
#[cfg_attr(test, mockall::automock)]
pub trait ModInventory: Send + Sync {
    /// Enabled filenames of `kind`, in the order the engine must load them
    fn enabled_mods_ordered(&self, kind: ModKind) -> Result<Vec<String>>;
}

/// Copies a bundled asset tree into private storage
#[cfg_attr(test, mockall::automock)]
pub trait AssetCopier: Send + Sync {
    fn copy_directory(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<()>;
}

/// Regenerates the fallback template from the game's legacy ini
#[cfg_attr(test, mockall::automock)]
pub trait IniConverter: Send + Sync {
    fn convert_ini(&self, encoding: &str) -> Result<()>;
}

impl ModInventory for ModList {
    fn enabled_mods_ordered(&self, kind: ModKind) -> Result<Vec<String>> {
        Ok(self.enabled(kind))
    }
}

/// Recursive filesystem copy of bundled assets
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryAssetCopier;

impl AssetCopier for DirectoryAssetCopier {
    fn copy_directory(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
        let mut copied = 0usize;

        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {}", src))?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .context("Asset path escaped source root")?;
            let target = dst.as_std_path().join(rel);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create {}", target.display()))?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                fs::copy(entry.path(), &target).with_context(|| {
                    format!("Failed to copy {} to {}", entry.path().display(), target.display())
                })?;
                copied += 1;
            }
        }

        tracing::info!("Copied {} asset file(s) from {} to {}", copied, src, dst);
        Ok(())
    }
}
