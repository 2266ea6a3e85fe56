use crate::models::LauncherPaths;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Launcher configuration from `launcher.yaml` (layered with `OMWLAUNCH__*` env vars)
///
/// Every field has a default so an absent file yields a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    pub paths: PathSettings,
    pub engine: EngineSettings,
    pub display: DisplayMetrics,

    /// Version of the bundled static assets shipped with this build
    pub asset_version: u32,

    /// Keys patched into the engine defaults blob on every launch
    pub defaults_overrides: IndexMap<String, String>,

    pub debug_mode: bool,
    pub console_log: bool,
    pub json_log: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        let mut defaults_overrides = IndexMap::new();
        defaults_overrides.insert("camera sensitivity".to_string(), "0.4".to_string());

        Self {
            paths: PathSettings::default(),
            engine: EngineSettings::default(),
            display: DisplayMetrics::default(),
            asset_version: crate::VERSION_CODE,
            defaults_overrides,
            debug_mode: false,
            console_log: true,
            json_log: false,
        }
    }
}

impl LauncherConfig {
    /// Resolve the configured roots into concrete file roles.
    ///
    /// Relative roots are interpreted against `base` (the launcher data directory).
    pub fn resolve_paths(&self, base: &Utf8Path) -> LauncherPaths {
        LauncherPaths::new(
            absolutize(base, &self.paths.data_dir),
            absolutize(base, &self.paths.user_dir),
            absolutize(base, &self.paths.assets_dir),
        )
    }
}

fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: Utf8PathBuf,
    pub user_dir: Utf8PathBuf,
    pub assets_dir: Utf8PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: Utf8PathBuf::from("files"),
            user_dir: Utf8PathBuf::from("user"),
            assets_dir: Utf8PathBuf::from("assets"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    pub executable: Utf8PathBuf,
    pub args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            executable: Utf8PathBuf::from("openmw"),
            args: Vec::new(),
        }
    }
}

/// Physical display size in pixels; zero means unknown
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
}

impl DisplayMetrics {
    /// Scaling that stretches a 1024x768 screen over the display.
    ///
    /// The longest display side is mapped onto the 1024 side; DPI is ignored.
    /// An unknown display scales by 1.0.
    pub fn default_scaling(&self) -> f32 {
        let longest = self.width.max(self.height);
        if longest == 0 {
            1.0
        } else {
            longest as f32 / 1024.0
        }
    }
}
