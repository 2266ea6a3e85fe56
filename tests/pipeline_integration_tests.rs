//! Integration tests for the launch pipeline
//!
//! These tests verify:
//! - A full launch from a fresh data directory
//! - Byte-identical output across repeated launches
//! - Version-stamp driven reinstalls
//! - Preference recovery for unparsable gamma
//! - Fail-closed behavior when a template is missing or a later stage can't write

use base64::{Engine as _, engine::general_purpose};
use camino::Utf8PathBuf;
use mockall::mock;
use omwlaunch::models::{
    LaunchContext, LaunchStage, LaunchTuning, LauncherConfig, LauncherPaths, ModEntry, ModKind,
    ModList, Preferences,
};
use omwlaunch::services::{
    Collaborators, DirectoryAssetCopier, EngineLauncher, GameFilesInstallation, LaunchError,
    LaunchOrchestrator,
};
use omwlaunch::StateChange;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Engine {}

    impl EngineLauncher for Engine {
        fn launch(&self, ctx: &LaunchContext) -> anyhow::Result<()>;
    }
}

const BASE_CFG: &str = "# OpenMW base config\ndata=\"?\"\nresources=?\nencoding=?\nno-sound=0";
const FALLBACK_CFG: &str = "fallback=LightAttenuation_UseConstant,0";
const SETTINGS_CFG: &str = "[Camera]\nviewing distance = 2048\n\n[GUI]\nscaling factor = 1.0\n\n[Video]\nvsync = false\n";
const DEFAULTS: &str = "[Input]\ncamera sensitivity = 1.0\ncamera y multiplier = 1.0\n";

struct Fixture {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
    paths: LauncherPaths,
    config: LauncherConfig,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let config = LauncherConfig::default();
        let paths = config.resolve_paths(&root);

        let bundled_config = paths.bundled_config();
        fs::create_dir_all(&bundled_config).unwrap();
        fs::write(bundled_config.join("openmw.base.cfg"), BASE_CFG).unwrap();
        fs::write(bundled_config.join("openmw.fallback.cfg"), FALLBACK_CFG).unwrap();
        fs::write(bundled_config.join("settings.cfg"), SETTINGS_CFG).unwrap();
        fs::write(
            bundled_config.join("defaults.bin"),
            general_purpose::STANDARD.encode(DEFAULTS),
        )
        .unwrap();

        fs::create_dir_all(paths.bundled_resources().join("vfs")).unwrap();
        fs::write(paths.bundled_resources().join("vfs/openmw.png"), "png").unwrap();

        fs::create_dir_all(root.join("game/Data Files")).unwrap();
        fs::write(root.join("game/Data Files/Morrowind.esm"), "TES3").unwrap();

        Self {
            _temp_dir: temp_dir,
            root,
            paths,
            config,
        }
    }

    fn mods() -> ModList {
        ModList {
            mods: vec![
                ModEntry::new("c.esp", ModKind::Plugin, 0, true),
                ModEntry::new("a.bsa", ModKind::Resource, 0, true),
                ModEntry::new("disabled.esp", ModKind::Plugin, 1, false),
                ModEntry::new("b.bsa", ModKind::Resource, 1, true),
            ],
        }
    }

    fn orchestrator(&self) -> Arc<LaunchOrchestrator> {
        let collaborators = Collaborators {
            installation: Arc::new(GameFilesInstallation::new(self.root.join("game"))),
            mods: Arc::new(Self::mods()),
            assets: Arc::new(DirectoryAssetCopier),
            ini_converter: None,
        };
        Arc::new(LaunchOrchestrator::new(
            self.paths.clone(),
            &self.config,
            collaborators,
        ))
    }

    fn read(&self, path: Utf8PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }
}

fn expect_one_launch() -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_launch().times(1).returning(|_| Ok(()));
    engine
}

#[tokio::test]
async fn test_full_launch_from_fresh_install() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let mut events = orchestrator.state().subscribe();
    let engine = expect_one_launch();

    let mut prefs = Preferences::new()
        .with("pref_global_functions", true)
        .with("pref_vsync", true)
        .with("commandLine", "--skip-menu");

    let ctx = orchestrator
        .prepare_and_launch(&mut prefs, &engine)
        .await
        .unwrap();

    // Static assets installed and stamped
    assert_eq!(
        fixture.read(fixture.paths.version_stamp()),
        fixture.config.asset_version.to_string()
    );
    assert!(fixture.paths.resources().join("vfs/openmw.png").is_file());
    assert!(fixture.paths.user_openmw_cfg().is_file());

    // Merged config: patched keys in place, mod lines last
    let merged = fixture.read(fixture.paths.merged_config());
    let lines: Vec<&str> = merged.lines().collect();
    assert_eq!(lines[0], "# OpenMW base config");
    assert_eq!(
        lines[1],
        format!("data = \"{}\"", fixture.root.join("game/Data Files"))
    );
    assert_eq!(lines[2], format!("resources = {}", fixture.paths.resources()));
    assert_eq!(lines[3], "encoding = win1252");
    assert_eq!(
        &lines[lines.len() - 3..],
        ["fallback-archive=a.bsa", "fallback-archive=b.bsa", "content=c.esp"]
    );
    assert!(!merged.contains("disabled.esp"));

    // Settings seeded then patched
    let settings = fixture.read(fixture.paths.user_settings());
    assert!(settings.contains("vsync = true\n"));
    assert!(settings.contains("scaling factor = 1.00\n"));
    assert!(settings.starts_with("[Camera]\nviewing distance = 7168.0\n"));

    // Defaults blob patched
    let defaults = general_purpose::STANDARD
        .decode(fixture.read(fixture.paths.defaults_blob()))
        .unwrap();
    assert_eq!(
        String::from_utf8(defaults).unwrap(),
        "[Input]\ncamera sensitivity = 0.4\ncamera y multiplier = 1.0\n"
    );

    assert_eq!(ctx.arguments, vec!["--skip-menu".to_string()]);
    assert_eq!(ctx.environment["OPENMW_GAMMA"], "1.00");

    let state = orchestrator.state().snapshot();
    assert_eq!(state.stage, LaunchStage::SignalReady);
    assert_eq!(state.successes, 1);

    let mut received = Vec::new();
    while let Ok(change) = events.try_recv() {
        received.push(change);
    }
    assert_eq!(received.first(), Some(&StateChange::LaunchStarted { attempt: 1 }));
    assert!(received.contains(&StateChange::ReinstallTriggered {
        reason: "version stamp missing".to_string()
    }));
    assert_eq!(received.last(), Some(&StateChange::LaunchReady));
}

#[test]
fn test_repeated_pipeline_is_byte_identical() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new()
        .with("pref_global_functions", true)
        .with("pref_subtitles", true);

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();
    let merged = fixture.read(fixture.paths.merged_config());
    let settings = fixture.read(fixture.paths.user_settings());
    let defaults = fixture.read(fixture.paths.defaults_blob());

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    assert_eq!(fixture.read(fixture.paths.merged_config()), merged);
    assert_eq!(fixture.read(fixture.paths.user_settings()), settings);
    assert_eq!(fixture.read(fixture.paths.defaults_blob()), defaults);
    assert_eq!(
        orchestrator
            .metrics()
            .reinstalls
            .load(std::sync::atomic::Ordering::Relaxed),
        1
    );
}

#[test]
fn test_missing_stamp_triggers_reinstall() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    fs::remove_file(fixture.paths.version_stamp()).unwrap();
    fs::write(fixture.paths.global_config().join("stale.cfg"), "old").unwrap();
    fs::remove_dir_all(fixture.paths.resources()).unwrap();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    assert!(!fixture.paths.global_config().join("stale.cfg").exists());
    assert!(fixture.paths.resources().join("vfs/openmw.png").is_file());
    assert_eq!(
        fixture.read(fixture.paths.version_stamp()),
        fixture.config.asset_version.to_string()
    );
}

#[test]
fn test_mismatched_stamp_triggers_reinstall() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();
    fs::write(fixture.paths.version_stamp(), "1").unwrap();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    let state = orchestrator.state().snapshot();
    assert!(state.reinstall_reason.unwrap().contains("version 1"));
    assert_eq!(
        orchestrator
            .metrics()
            .reinstalls
            .load(std::sync::atomic::Ordering::Relaxed),
        2
    );
}

#[test]
fn test_user_settings_survive_reinstall() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();
    fs::write(fixture.paths.user_settings(), "[Video]\nvsync = true\n").unwrap();
    fs::write(fixture.paths.user_openmw_cfg(), "content=Mine.esp\n").unwrap();
    fs::remove_file(fixture.paths.version_stamp()).unwrap();

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    assert_eq!(
        fixture.read(fixture.paths.user_settings()),
        "[Video]\nvsync = true\n"
    );
    assert_eq!(
        fixture.read(fixture.paths.user_openmw_cfg()),
        "content=Mine.esp\n"
    );
}

#[test]
fn test_disabled_settings_gate_keeps_seeded_copy() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new().with("pref_vsync", true);

    orchestrator
        .run_pipeline(&prefs, LaunchTuning::default())
        .unwrap();

    assert_eq!(fixture.read(fixture.paths.user_settings()), SETTINGS_CFG);
}

#[tokio::test]
async fn test_unparsable_gamma_is_reset() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let engine = expect_one_launch();
    let mut prefs = Preferences::new().with("pref_gamma", "abc");

    let ctx = orchestrator
        .prepare_and_launch(&mut prefs, &engine)
        .await
        .unwrap();

    assert_eq!(ctx.tuning.gamma, 1.0);
    assert_eq!(ctx.environment["OPENMW_GAMMA"], "1.00");
    assert_eq!(prefs.get_string("pref_gamma", "1.0"), "");
    assert!(prefs.is_dirty());
}

#[tokio::test]
async fn test_missing_template_aborts_without_launch() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let mut prefs = Preferences::new();

    orchestrator
        .prepare_and_launch(&mut prefs, &expect_one_launch())
        .await
        .unwrap();
    let previous = fixture.read(fixture.paths.merged_config());

    // Stamp is current, so the template is not reinstalled
    fs::remove_file(fixture.paths.fallback_template()).unwrap();

    let mut engine = MockEngine::new();
    engine.expect_launch().never();
    let err = orchestrator
        .prepare_and_launch(&mut prefs, &engine)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::TemplateUnreadable { .. })
    ));
    assert_eq!(fixture.read(fixture.paths.merged_config()), previous);

    let state = orchestrator.state().snapshot();
    assert_eq!(state.stage, LaunchStage::SynthesizeConfig);
    assert_eq!(state.failures, 1);
    assert!(state.last_failure.unwrap().contains("openmw.fallback.cfg"));
}

#[test]
fn test_worker_runs_under_tokio_test_runtime() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator();
    let prefs = Preferences::new().with("pref_customResolution", "1280x720");

    let ctx = tokio_test::block_on(orchestrator.run_on_worker(prefs, LaunchTuning::default()))
        .unwrap();

    let resolution = ctx.resolution.unwrap();
    assert_eq!((resolution.width, resolution.height), (1280, 720));
}

async fn launch_once(fixture: &Fixture) -> Arc<LaunchOrchestrator> {
    let orchestrator = fixture.orchestrator();
    let mut prefs = Preferences::new();
    orchestrator
        .prepare_and_launch(&mut prefs, &expect_one_launch())
        .await
        .unwrap();
    orchestrator
}

async fn launch_expecting_failure(
    orchestrator: &Arc<LaunchOrchestrator>,
    prefs: &mut Preferences,
) -> anyhow::Error {
    let mut engine = MockEngine::new();
    engine.expect_launch().never();
    orchestrator
        .prepare_and_launch(prefs, &engine)
        .await
        .unwrap_err()
}

#[tokio::test]
async fn test_config_write_failure_aborts_launch() {
    let fixture = Fixture::new();
    let orchestrator = launch_once(&fixture).await;

    // A non-empty directory in place of the merged config can't be replaced
    let merged = fixture.paths.merged_config();
    fs::remove_file(&merged).unwrap();
    fs::create_dir_all(merged.join("keep")).unwrap();

    let err = launch_expecting_failure(&orchestrator, &mut Preferences::new()).await;

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::ConfigWrite { .. })
    ));
    let state = orchestrator.state().snapshot();
    assert_eq!(state.stage, LaunchStage::SynthesizeConfig);
    assert_eq!(state.failures, 1);
    assert!(merged.join("keep").is_dir());
}

#[tokio::test]
async fn test_settings_write_failure_aborts_launch() {
    let fixture = Fixture::new();
    let orchestrator = launch_once(&fixture).await;

    // User config directory replaced by a plain file: settings.cfg can't be seeded
    fs::remove_dir_all(fixture.paths.user_config()).unwrap();
    fs::write(fixture.paths.user_config(), "").unwrap();
    let pristine = general_purpose::STANDARD.encode(DEFAULTS);
    fs::write(fixture.paths.defaults_blob(), &pristine).unwrap();

    let mut prefs = Preferences::new().with("pref_global_functions", true);
    let err = launch_expecting_failure(&orchestrator, &mut prefs).await;

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::SettingsWrite { .. })
    ));
    let state = orchestrator.state().snapshot();
    assert_eq!(state.stage, LaunchStage::EnsureUserSettingsSeeded);
    assert_eq!(state.failures, 1);

    // Later stages never ran
    assert_eq!(fixture.read(fixture.paths.defaults_blob()), pristine);
}

#[tokio::test]
async fn test_invalid_defaults_blob_aborts_launch() {
    let fixture = Fixture::new();
    let orchestrator = launch_once(&fixture).await;

    fs::write(fixture.paths.defaults_blob(), "not*base64!\n").unwrap();

    let mut prefs = Preferences::new()
        .with("pref_global_functions", true)
        .with("pref_vsync", true);
    let err = launch_expecting_failure(&orchestrator, &mut prefs).await;

    assert!(matches!(
        err.downcast_ref::<LaunchError>(),
        Some(LaunchError::DefaultsBlob(_))
    ));
    let state = orchestrator.state().snapshot();
    assert_eq!(state.stage, LaunchStage::PatchDefaults);
    assert_eq!(state.failures, 1);
    assert_eq!(state.successes, 1);

    // Earlier stages completed, the broken blob is left as found
    assert!(fixture.read(fixture.paths.user_settings()).contains("vsync = true\n"));
    assert_eq!(fixture.read(fixture.paths.defaults_blob()), "not*base64!\n");
}
