//! Launch orchestration: sequencing the pipeline stages and handing off to the engine.
//!
//! A launch attempt runs in three phases:
//!
//! 1. **Pre-launch** (caller's task): claim the launch slot, check the game
//!    installation, warn when no plugin is enabled, resolve scaling and gamma from
//!    the preferences (resetting unparsable values).
//! 2. **Pipeline** (one blocking worker): version check, optional reinstall, legacy
//!    ini conversion, config synthesis, settings seeding and application, defaults
//!    patching and resolution lookup. Any failure aborts the remaining stages.
//! 3. **Hand-off**: the worker sends its [`LaunchContext`] over a oneshot channel
//!    exactly once, and only on success; the caller then starts the engine.
//!
//! Nothing is retried. A failed attempt leaves files as they were when the failing
//! stage stopped; the next attempt re-derives everything.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::metrics::Metrics;
use crate::models::{
    DisplayMetrics, LaunchContext, LaunchStage, LaunchTuning, LauncherConfig, LauncherPaths,
    ModKind, MouseMode, Preferences, Resolution,
};
use crate::services::collaborators::{AssetCopier, GameInstallation, IniConverter, ModInventory};
use crate::services::defaults_blob::patch_defaults;
use crate::services::engine::{EngineLauncher, build_environment, split_command_line};
use crate::services::installer::StaticAssetInstaller;
use crate::services::settings::{GLOBAL_FUNCTIONS_PREF, SettingsApplier};
use crate::services::synthesizer::ConfigSynthesizer;
use crate::services::version_gate::VersionCheck;
use crate::state::StateManager;

/// Encoding used for the merged config and ini conversion when none is chosen
pub const DEFAULT_ENCODING: &str = "win1252";

/// Failures that abort a launch attempt
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Template {path} is unreadable")]
    TemplateUnreadable {
        path: Utf8PathBuf,
        source: io::Error,
    },

    #[error("Failed to write merged config {path}")]
    ConfigWrite {
        path: Utf8PathBuf,
        source: io::Error,
    },

    #[error("Failed to write settings file {path}")]
    SettingsWrite {
        path: Utf8PathBuf,
        source: io::Error,
    },

    #[error("Defaults blob is invalid: {0}")]
    DefaultsBlob(String),

    #[error("Static asset reinstall failed")]
    Reinstall(#[source] anyhow::Error),

    #[error("Game data files are missing or invalid")]
    InstallationInvalid,

    #[error("A launch is already in progress")]
    LaunchInProgress,

    #[error("Launch pipeline worker exited without signalling")]
    WorkerLost,
}

/// External services the pipeline consumes
#[derive(Clone)]
pub struct Collaborators {
    pub installation: Arc<dyn GameInstallation>,
    pub mods: Arc<dyn ModInventory>,
    pub assets: Arc<dyn AssetCopier>,
    /// Regenerates the fallback template; the stage is skipped without one
    pub ini_converter: Option<Arc<dyn IniConverter>>,
}

/// Resolve UI scaling and gamma from the preferences.
///
/// Unparsable values are reset to `""` in `prefs` and replaced by their defaults:
/// automatic scaling from `display`, and gamma 1.0. An empty or zero scaling also
/// means automatic.
///
/// # Returns
///
/// The tuning and the preference keys that were reset
pub fn resolve_tuning(
    prefs: &mut Preferences,
    display: &DisplayMetrics,
) -> (LaunchTuning, Vec<&'static str>) {
    let mut reset = Vec::new();

    let mut scaling = match parse_float(prefs, "pref_uiScaling") {
        Ok(value) => value.unwrap_or(0.0),
        Err(raw) => {
            tracing::warn!("Invalid UI scaling '{}', using automatic scaling", raw);
            prefs.reset("pref_uiScaling");
            reset.push("pref_uiScaling");
            0.0
        }
    };
    if scaling == 0.0 {
        scaling = display.default_scaling();
    }

    let gamma = match parse_float(prefs, "pref_gamma") {
        Ok(value) => value.unwrap_or(1.0),
        Err(raw) => {
            tracing::warn!("Invalid gamma '{}', using 1.0", raw);
            prefs.reset("pref_gamma");
            reset.push("pref_gamma");
            1.0
        }
    };

    (LaunchTuning { scaling, gamma }, reset)
}

/// `Ok(None)` when unset or empty, `Err(raw)` when not a finite float
fn parse_float(prefs: &Preferences, key: &str) -> std::result::Result<Option<f32>, String> {
    let raw = prefs.get_string(key, "");
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(raw),
    }
}

/// Sequences the launch pipeline and starts the engine
pub struct LaunchOrchestrator {
    paths: LauncherPaths,
    current_version: u32,
    defaults_overrides: IndexMap<String, String>,
    display: DisplayMetrics,
    collaborators: Collaborators,
    state: StateManager,
    metrics: Arc<Metrics>,
}

impl LaunchOrchestrator {
    pub fn new(paths: LauncherPaths, config: &LauncherConfig, collaborators: Collaborators) -> Self {
        Self {
            paths,
            current_version: config.asset_version,
            defaults_overrides: config.defaults_overrides.clone(),
            display: config.display,
            collaborators,
            state: StateManager::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing state manager (and its subscribers)
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = state;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Prepare the configuration and start the engine.
    ///
    /// Fails closed: the engine is only started after every pipeline stage has
    /// succeeded. Preferences reset during tuning resolution stay reset even when
    /// the attempt fails; check [`Preferences::is_dirty`] afterwards.
    ///
    /// # Errors
    ///
    /// [`LaunchError::LaunchInProgress`] when another attempt holds the launch slot,
    /// [`LaunchError::InstallationInvalid`] when the game data files are unusable,
    /// or the error of the first failing stage.
    pub async fn prepare_and_launch(
        self: &Arc<Self>,
        prefs: &mut Preferences,
        launcher: &dyn EngineLauncher,
    ) -> Result<LaunchContext> {
        if !self.state.try_begin_launch() {
            tracing::warn!("Launch requested while another launch is in progress");
            return Err(LaunchError::LaunchInProgress.into());
        }
        self.metrics.record_launch_started();

        let result = self.attempt(prefs, launcher).await;

        match &result {
            Ok(_) => {
                self.state.finish_success();
                self.metrics.record_launch_succeeded();
                tracing::info!("Engine launched");
            }
            Err(e) => {
                let stage = self.state.read(|s| s.stage);
                tracing::error!("Launch aborted during {}: {:#}", stage, e);
                self.state.finish_failure(format!("{:#}", e));
                self.metrics.record_launch_failed();
            }
        }

        result
    }

    async fn attempt(
        self: &Arc<Self>,
        prefs: &mut Preferences,
        launcher: &dyn EngineLauncher,
    ) -> Result<LaunchContext> {
        self.preflight()?;

        let (tuning, reset) = resolve_tuning(prefs, &self.display);
        if !reset.is_empty() {
            tracing::info!("Reset invalid preference(s): {}", reset.join(", "));
        }

        let ctx = self.run_on_worker(prefs.clone(), tuning).await?;
        launcher.launch(&ctx)?;
        Ok(ctx)
    }

    /// Installation must be valid; an empty plugin selection only warns
    fn preflight(&self) -> Result<()> {
        if !self.collaborators.installation.is_valid() {
            return Err(LaunchError::InstallationInvalid.into());
        }

        let plugins = self
            .collaborators
            .mods
            .enabled_mods_ordered(ModKind::Plugin)
            .context("Failed to list enabled plugins")?;
        if plugins.is_empty() {
            tracing::warn!("No content plugins enabled, launching anyway");
        }

        Ok(())
    }

    /// Run the pipeline on a blocking worker and wait for its single signal
    pub async fn run_on_worker(
        self: &Arc<Self>,
        prefs: Preferences,
        tuning: LaunchTuning,
    ) -> Result<LaunchContext> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let this = Arc::clone(self);

        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let result = this.run_pipeline(&prefs, tuning);
            this.metrics.record_pipeline_time(started.elapsed());
            // The receiver only disappears if the caller gave up
            let _ = ready_tx.send(result);
        });

        ready_rx.await.map_err(|_| LaunchError::WorkerLost)?
    }

    /// Every pipeline stage in order, synchronously. Stops at the first failure.
    pub fn run_pipeline(&self, prefs: &Preferences, tuning: LaunchTuning) -> Result<LaunchContext> {
        let collab = &self.collaborators;

        self.state.enter_stage(LaunchStage::VersionCheck);
        if let VersionCheck::Stale(reason) =
            VersionCheck::check(&self.paths.version_stamp(), self.current_version)
        {
            self.state.record_reinstall(reason.to_string());
            self.state.enter_stage(LaunchStage::Reinstall);
            StaticAssetInstaller::new(&self.paths, collab.assets.as_ref(), self.current_version)
                .reinstall()
                .map_err(LaunchError::Reinstall)?;
            self.metrics.record_reinstall();
        }

        let encoding = prefs.get_string("pref_encoding", DEFAULT_ENCODING);

        self.state.enter_stage(LaunchStage::ConvertLegacyIni);
        match &collab.ini_converter {
            Some(converter) => converter
                .convert_ini(&encoding)
                .context("Failed to convert legacy ini")?,
            None => tracing::debug!("No ini converter configured, keeping fallback template"),
        }

        self.state.enter_stage(LaunchStage::SynthesizeConfig);
        let resources = collab
            .mods
            .enabled_mods_ordered(ModKind::Resource)
            .context("Failed to list enabled resources")?;
        let plugins = collab
            .mods
            .enabled_mods_ordered(ModKind::Plugin)
            .context("Failed to list enabled plugins")?;
        let synthesizer = ConfigSynthesizer::new(&self.paths);
        synthesizer.synthesize(&resources, &plugins)?;
        let data_files = collab
            .installation
            .data_files()
            .context("Failed to locate game data files")?;
        synthesizer.patch_engine_paths(&data_files, &encoding)?;

        let settings = SettingsApplier::new(&self.paths);
        self.state.enter_stage(LaunchStage::EnsureUserSettingsSeeded);
        settings.ensure_seeded()?;

        if prefs.get_bool(GLOBAL_FUNCTIONS_PREF, false) {
            self.state.enter_stage(LaunchStage::ApplySettings);
            let report = settings.apply(prefs, tuning.scaling)?;
            self.metrics.record_settings_lines(report.lines_written());
        } else {
            tracing::debug!("Skipping settings application ({} is off)", GLOBAL_FUNCTIONS_PREF);
        }

        self.state.enter_stage(LaunchStage::PatchDefaults);
        patch_defaults(&self.paths.defaults_blob(), &self.defaults_overrides)?;

        self.state.enter_stage(LaunchStage::ResolveScreenResolution);
        let custom = prefs.get_string("pref_customResolution", "");
        let resolution = Resolution::parse(&custom);
        if resolution.is_none() && !custom.trim().is_empty() {
            tracing::warn!("Ignoring malformed custom resolution '{}'", custom);
        }

        let ctx = LaunchContext {
            tuning,
            resolution,
            mouse_mode: MouseMode::from_preference(&prefs.get_string("pref_mouse_mode", "")),
            environment: build_environment(prefs, &tuning),
            arguments: split_command_line(&prefs.get_string("commandLine", "")),
        };

        self.state.enter_stage(LaunchStage::SignalReady);
        Ok(ctx)
    }
}
