use crate::models::{LauncherConfig, ModList, Preferences};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Prefix of environment variables overriding `launcher.yaml`
pub const ENV_PREFIX: &str = "OMWLAUNCH";

/// Configuration manager for the launcher's own YAML files.
///
/// Manages three files in one directory:
/// - `launcher.yaml`: paths, engine command, display metrics, logging flags
/// - `preferences.yaml`: the user preference store
/// - `mods.yaml`: the ordered mod collection
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    launcher_config_path: Utf8PathBuf,
    preferences_path: Utf8PathBuf,
    mods_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding the launcher's YAML files
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            launcher_config_path: config_dir.join("launcher.yaml"),
            preferences_path: config_dir.join("preferences.yaml"),
            mods_path: config_dir.join("mods.yaml"),
            config_dir,
        })
    }

    /// Load the launcher configuration.
    ///
    /// Layers, lowest priority first: `launcher.yaml` (optional), then
    /// `OMWLAUNCH__SECTION__KEY` environment variables. Fields neither layer sets
    /// take their serde defaults.
    ///
    /// Map keys such as `camera sensitivity` are not valid config key paths, so
    /// the defaults can't be layered in as a source.
    pub fn load_launcher_config(&self) -> Result<LauncherConfig> {
        if !self.launcher_config_path.exists() {
            tracing::info!(
                "Launcher config not found at {}, using defaults",
                self.launcher_config_path
            );
        }

        let layered = config::Config::builder()
            .add_source(
                config::File::from(self.launcher_config_path.as_std_path())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| {
                format!("Failed to load launcher config: {}", self.launcher_config_path)
            })?;

        let config: LauncherConfig = layered.try_deserialize().with_context(|| {
            format!("Failed to parse launcher config: {}", self.launcher_config_path)
        })?;

        tracing::debug!("Launcher config: {:?}", config);
        Ok(config)
    }

    /// Save the launcher configuration to `launcher.yaml`
    pub fn save_launcher_config(&self, config: &LauncherConfig) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(config)
            .context("Failed to serialize launcher config to YAML")?;

        fs::write(&self.launcher_config_path, yaml_string).with_context(|| {
            format!("Failed to write launcher config: {}", self.launcher_config_path)
        })?;

        tracing::info!("Saved launcher config to {}", self.launcher_config_path);
        Ok(())
    }

    /// Load the preference store.
    ///
    /// # Returns
    /// The stored preferences, or an empty store if the file doesn't exist
    pub fn load_preferences(&self) -> Result<Preferences> {
        if !self.preferences_path.exists() {
            tracing::warn!(
                "Preferences file not found at {}, starting empty",
                self.preferences_path
            );
            return Ok(Preferences::new());
        }

        let file_contents = fs::read_to_string(&self.preferences_path)
            .with_context(|| format!("Failed to read preferences: {}", self.preferences_path))?;

        // An empty file is an empty store
        if file_contents.trim().is_empty() {
            return Ok(Preferences::new());
        }

        let prefs: Preferences = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse preferences: {}", self.preferences_path))?;

        tracing::info!(
            "Loaded {} preference(s) from {}",
            prefs.len(),
            self.preferences_path
        );
        Ok(prefs)
    }

    /// Save the preference store and mark it clean.
    pub fn save_preferences(&self, prefs: &mut Preferences) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(prefs).context("Failed to serialize preferences to YAML")?;

        fs::write(&self.preferences_path, yaml_string)
            .with_context(|| format!("Failed to write preferences: {}", self.preferences_path))?;

        prefs.mark_clean();
        tracing::info!("Saved preferences to {}", self.preferences_path);
        Ok(())
    }

    /// Load the mod collection.
    ///
    /// # Returns
    /// The stored mod list, or an empty list if the file doesn't exist
    pub fn load_mod_list(&self) -> Result<ModList> {
        if !self.mods_path.exists() {
            tracing::warn!("Mod list not found at {}, no mods enabled", self.mods_path);
            return Ok(ModList::default());
        }

        let file_contents = fs::read_to_string(&self.mods_path)
            .with_context(|| format!("Failed to read mod list: {}", self.mods_path))?;

        let mods: ModList = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse mod list: {}", self.mods_path))?;

        tracing::info!("Loaded {} mod(s) from {}", mods.mods.len(), self.mods_path);
        Ok(mods)
    }

    pub fn save_mod_list(&self, mods: &ModList) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(mods).context("Failed to serialize mod list to YAML")?;

        fs::write(&self.mods_path, yaml_string)
            .with_context(|| format!("Failed to write mod list: {}", self.mods_path))?;

        tracing::info!("Saved mod list to {}", self.mods_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
