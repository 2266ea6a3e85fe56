//! omwlaunch - prepares the OpenMW configuration and starts the engine.
//!
//! # Execution Flow
//!
//! 1. Load `launcher.yaml` from the data directory (plus `OMWLAUNCH__*` overrides)
//! 2. Initialize logging → `<data-dir>/logs/omwlaunch.<date>`
//! 3. With `--reset-config`: remove installed assets and user config, then exit
//! 4. Load preferences and the mod list
//! 5. Run the launch pipeline on a blocking worker and start the engine
//! 6. Wait for the engine to exit
//! 7. Persist preferences reset during the launch, log metrics
//!
//! # Files
//!
//! Expected in the data directory (all optional):
//! - `launcher.yaml`: paths, engine command, display metrics, logging flags
//! - `preferences.yaml`: user preferences (`game_files`, `pref_*`, `envLine`, ...)
//! - `mods.yaml`: the ordered mod collection

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use omwlaunch::logging::{LoggingOptions, setup_logging};
use omwlaunch::services::{
    Collaborators, DirectoryAssetCopier, GameFilesInstallation, ProcessEngineLauncher,
    reset_config,
};
use omwlaunch::{APP_NAME, ConfigManager, LaunchOrchestrator, VERSION};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(name = "omwlaunch", version, about = "Prepare the OpenMW configuration and launch the engine")]
struct Cli {
    /// Launcher data directory (launcher.yaml, preferences, logs, installed assets)
    #[arg(long, default_value = "omwlaunch-data")]
    data_dir: Utf8PathBuf,

    /// Remove the installed assets and the user config, then exit
    #[arg(long)]
    reset_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.data_dir)?;
    let config = config_manager.load_launcher_config()?;

    let mut log_options = LoggingOptions::new(cli.data_dir.join("logs"), APP_NAME);
    log_options.debug_mode = config.debug_mode;
    log_options.console_output = config.console_log;
    log_options.json_output = config.json_log;
    let _guard = setup_logging(&log_options)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let paths = config.resolve_paths(&cli.data_dir);

    if cli.reset_config {
        reset_config(&paths)?;
        tracing::info!("Configuration reset; assets are reinstalled on the next launch");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("omwlaunch-worker")
        .build()?;

    let mut prefs = config_manager.load_preferences()?;
    let mods = config_manager.load_mod_list()?;

    let game_files = prefs.get_string("game_files", "");
    let collaborators = Collaborators {
        installation: Arc::new(GameFilesInstallation::new(game_files)),
        mods: Arc::new(mods),
        assets: Arc::new(DirectoryAssetCopier),
        ini_converter: None,
    };
    let orchestrator = Arc::new(LaunchOrchestrator::new(paths, &config, collaborators));
    let launcher = ProcessEngineLauncher::new(config.engine.clone());

    let mut events = orchestrator.state().subscribe();
    runtime.spawn(async move {
        loop {
            match events.recv().await {
                Ok(change) => tracing::debug!("State change: {:?}", change),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("State listener missed {} event(s)", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = runtime.block_on(async {
        orchestrator.prepare_and_launch(&mut prefs, &launcher).await?;
        launcher.wait().await
    });

    if prefs.is_dirty() {
        if let Err(e) = config_manager.save_preferences(&mut prefs) {
            tracing::error!("Failed to persist reset preferences: {:#}", e);
        }
    }

    orchestrator.metrics().log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    match result {
        Ok(Some(status)) if !status.success() => {
            tracing::warn!("Engine exited unsuccessfully: {}", status);
            Ok(())
        }
        Ok(_) => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Launch failed: {:#}", e);
            Err(e)
        }
    }
}
