//! (Re)installation of the bundled static assets into private storage.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};

use super::write_atomic;
use crate::models::{LauncherPaths, USER_CFG_PLACEHOLDER};
use crate::services::collaborators::AssetCopier;

/// Wipes and recreates the private copies of the bundled resources and config.
///
/// The version stamp is deleted first and written last. An interrupted reinstall
/// therefore leaves no stamp, and the next version check triggers another
/// reinstall: installation is at-least-once.
pub struct StaticAssetInstaller<'a> {
    paths: &'a LauncherPaths,
    copier: &'a dyn AssetCopier,
    version: u32,
}

impl<'a> StaticAssetInstaller<'a> {
    pub fn new(paths: &'a LauncherPaths, copier: &'a dyn AssetCopier, version: u32) -> Self {
        Self {
            paths,
            copier,
            version,
        }
    }

    pub fn reinstall(&self) -> Result<()> {
        tracing::info!("Reinstalling static assets (version {})", self.version);

        remove_static_files(self.paths)?;

        self.copier
            .copy_directory(&self.paths.bundled_resources(), &self.paths.resources())
            .context("Failed to install bundled resources")?;
        self.copier
            .copy_directory(&self.paths.bundled_config(), &self.paths.global_config())
            .context("Failed to install bundled config")?;

        seed_user_config(self.paths)?;

        // Commit marker
        let stamp = self.paths.version_stamp();
        write_atomic(&stamp, self.version.to_string().as_bytes())
            .with_context(|| format!("Failed to write version stamp: {}", stamp))?;

        tracing::info!("Static assets installed, stamp {} written", self.version);
        Ok(())
    }
}

/// Ensure the user config directory exists and holds a user `openmw.cfg`.
///
/// An existing user file is never overwritten.
pub fn seed_user_config(paths: &LauncherPaths) -> Result<()> {
    let user_config = paths.user_config();
    fs::create_dir_all(&user_config)
        .with_context(|| format!("Failed to create user config directory: {}", user_config))?;

    let user_cfg = paths.user_openmw_cfg();
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&user_cfg)
    {
        Ok(mut file) => {
            file.write_all(USER_CFG_PLACEHOLDER.as_bytes())
                .with_context(|| format!("Failed to seed {}", user_cfg))?;
            tracing::info!("Seeded user config {}", user_cfg);
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!("User config {} already present", user_cfg);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to create {}", user_cfg));
        }
    }

    Ok(())
}

/// Remove the version stamp, installed resources and global config.
///
/// Missing paths are not an error.
pub fn remove_static_files(paths: &LauncherPaths) -> Result<()> {
    remove_file_if_exists(&paths.version_stamp())?;
    remove_dir_if_exists(&paths.global_config())?;
    remove_dir_if_exists(&paths.resources())?;
    Ok(())
}

/// Reset everything to first-run state: the next launch reinstalls and reseeds
pub fn reset_config(paths: &LauncherPaths) -> Result<()> {
    tracing::info!("Resetting launcher configuration");
    remove_dir_if_exists(&paths.user_config())?;
    remove_static_files(paths)
}

fn remove_file_if_exists(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path)),
    }
}

fn remove_dir_if_exists(path: &Utf8Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::collaborators::DirectoryAssetCopier;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, LauncherPaths) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let paths = LauncherPaths::new(root.join("files"), root.join("user"), root.join("assets"));

        fs::create_dir_all(paths.bundled_resources().join("vfs")).unwrap();
        fs::write(paths.bundled_resources().join("vfs/font.ttf"), "font").unwrap();
        fs::create_dir_all(paths.bundled_config()).unwrap();
        fs::write(paths.bundled_config().join("openmw.base.cfg"), "# base\n").unwrap();

        (temp_dir, paths)
    }

    #[test]
    fn test_reinstall_populates_and_stamps() {
        let (_temp_dir, paths) = fixture();

        StaticAssetInstaller::new(&paths, &DirectoryAssetCopier, 12)
            .reinstall()
            .unwrap();

        assert!(paths.resources().join("vfs/font.ttf").is_file());
        assert!(paths.base_template().is_file());
        assert_eq!(fs::read_to_string(paths.version_stamp()).unwrap(), "12");
        assert_eq!(
            fs::read_to_string(paths.user_openmw_cfg()).unwrap(),
            USER_CFG_PLACEHOLDER
        );
    }

    #[test]
    fn test_reinstall_wipes_stale_files() {
        let (_temp_dir, paths) = fixture();
        fs::create_dir_all(paths.global_config()).unwrap();
        fs::write(paths.global_config().join("obsolete.cfg"), "old").unwrap();

        StaticAssetInstaller::new(&paths, &DirectoryAssetCopier, 1)
            .reinstall()
            .unwrap();

        assert!(!paths.global_config().join("obsolete.cfg").exists());
    }

    #[test]
    fn test_reinstall_keeps_existing_user_cfg() {
        let (_temp_dir, paths) = fixture();
        fs::create_dir_all(paths.user_config()).unwrap();
        fs::write(paths.user_openmw_cfg(), "content=Mine.esp\n").unwrap();

        StaticAssetInstaller::new(&paths, &DirectoryAssetCopier, 1)
            .reinstall()
            .unwrap();

        assert_eq!(
            fs::read_to_string(paths.user_openmw_cfg()).unwrap(),
            "content=Mine.esp\n"
        );
    }

    #[test]
    fn test_failed_copy_leaves_no_stamp() {
        let (_temp_dir, paths) = fixture();
        fs::create_dir_all(paths.data_dir()).unwrap();
        fs::write(paths.version_stamp(), "1").unwrap();
        fs::remove_dir_all(paths.bundled_config()).unwrap();

        let result = StaticAssetInstaller::new(&paths, &DirectoryAssetCopier, 2).reinstall();

        assert!(result.is_err());
        assert!(!paths.version_stamp().exists());
    }

    #[test]
    fn test_reset_config_removes_everything() {
        let (_temp_dir, paths) = fixture();
        StaticAssetInstaller::new(&paths, &DirectoryAssetCopier, 1)
            .reinstall()
            .unwrap();

        reset_config(&paths).unwrap();

        assert!(!paths.version_stamp().exists());
        assert!(!paths.resources().exists());
        assert!(!paths.global_config().exists());
        assert!(!paths.user_config().exists());

        // Resetting twice is harmless
        reset_config(&paths).unwrap();
    }
}
