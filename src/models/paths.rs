use camino::{Utf8Path, Utf8PathBuf};

/// Placeholder written into a freshly seeded user `openmw.cfg`.
pub const USER_CFG_PLACEHOLDER: &str =
    "# This is the user openmw.cfg. Feel free to modify it as you wish.\n";

/// Every file role the launch pipeline reads or writes.
///
/// All locations derive from three roots:
/// - `data_dir`: process-private storage holding the installed static assets
/// - `user_dir`: user-owned storage holding `settings.cfg` and the user `openmw.cfg`
/// - `assets_dir`: read-only bundled assets shipped with the application
///
/// Only the background pipeline worker writes below `data_dir` and `user_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    data_dir: Utf8PathBuf,
    user_dir: Utf8PathBuf,
    assets_dir: Utf8PathBuf,
}

impl LauncherPaths {
    pub fn new(
        data_dir: impl Into<Utf8PathBuf>,
        user_dir: impl Into<Utf8PathBuf>,
        assets_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            user_dir: user_dir.into(),
            assets_dir: assets_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    pub fn user_dir(&self) -> &Utf8Path {
        &self.user_dir
    }

    pub fn assets_dir(&self) -> &Utf8Path {
        &self.assets_dir
    }

    /// Version stamp of the installed static assets (commit marker)
    pub fn version_stamp(&self) -> Utf8PathBuf {
        self.data_dir.join("stamp")
    }

    /// Installed engine resources (shaders, fonts, ...)
    pub fn resources(&self) -> Utf8PathBuf {
        self.data_dir.join("resources")
    }

    /// Installed global configuration directory
    pub fn global_config(&self) -> Utf8PathBuf {
        self.data_dir.join("config")
    }

    pub fn base_template(&self) -> Utf8PathBuf {
        self.global_config().join("openmw.base.cfg")
    }

    pub fn fallback_template(&self) -> Utf8PathBuf {
        self.global_config().join("openmw.fallback.cfg")
    }

    /// The synthesized configuration handed to the engine
    pub fn merged_config(&self) -> Utf8PathBuf {
        self.global_config().join("openmw.cfg")
    }

    /// Base64-encoded engine defaults
    pub fn defaults_blob(&self) -> Utf8PathBuf {
        self.global_config().join("defaults.bin")
    }

    /// Pristine `settings.cfg` installed alongside the global config
    pub fn global_settings(&self) -> Utf8PathBuf {
        self.global_config().join("settings.cfg")
    }

    pub fn user_config(&self) -> Utf8PathBuf {
        self.user_dir.join("config")
    }

    pub fn user_openmw_cfg(&self) -> Utf8PathBuf {
        self.user_config().join("openmw.cfg")
    }

    pub fn user_settings(&self) -> Utf8PathBuf {
        self.user_config().join("settings.cfg")
    }

    /// Bundled resource tree copied into [`Self::resources`] on reinstall
    pub fn bundled_resources(&self) -> Utf8PathBuf {
        self.assets_dir.join("resources")
    }

    /// Bundled config tree copied into [`Self::global_config`] on reinstall
    pub fn bundled_config(&self) -> Utf8PathBuf {
        self.assets_dir.join("openmw")
    }
}
