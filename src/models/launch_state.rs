use std::fmt;

/// Stage of the launch pipeline.
///
/// Stages advance linearly in declaration order; there are no back-edges.
/// `Reinstall` is skipped when the installed assets are current and
/// `ApplySettings` is skipped when bulk settings application is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LaunchStage {
    #[default]
    Idle,
    VersionCheck,
    Reinstall,
    ConvertLegacyIni,
    SynthesizeConfig,
    EnsureUserSettingsSeeded,
    ApplySettings,
    PatchDefaults,
    ResolveScreenResolution,
    SignalReady,
}

impl LaunchStage {
    pub fn label(&self) -> &'static str {
        match self {
            LaunchStage::Idle => "idle",
            LaunchStage::VersionCheck => "version check",
            LaunchStage::Reinstall => "reinstall static assets",
            LaunchStage::ConvertLegacyIni => "convert legacy ini",
            LaunchStage::SynthesizeConfig => "synthesize config",
            LaunchStage::EnsureUserSettingsSeeded => "seed user settings",
            LaunchStage::ApplySettings => "apply settings",
            LaunchStage::PatchDefaults => "patch defaults",
            LaunchStage::ResolveScreenResolution => "resolve screen resolution",
            LaunchStage::SignalReady => "ready",
        }
    }
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Launch bookkeeping shared between the pipeline worker and the launching thread.
///
/// Wrapped in `Arc<RwLock<_>>` by [`crate::state::StateManager`]; never mutate it
/// directly, go through the manager so change events are emitted.
#[derive(Clone, Debug, Default)]
pub struct LaunchState {
    /// A launch attempt is running (guards against a second concurrent attempt)
    pub is_launching: bool,
    pub stage: LaunchStage,

    /// Why the last version check demanded a reinstall, if it did
    pub reinstall_reason: Option<String>,
    /// Failure message of the most recent aborted attempt
    pub last_failure: Option<String>,

    // Counters across the process lifetime
    pub attempts: usize,
    pub successes: usize,
    pub failures: usize,
}

impl LaunchState {
    /// Whether the last attempt ended in failure
    pub fn has_failed(&self) -> bool {
        !self.is_launching && self.last_failure.is_some()
    }

    /// Reset per-attempt fields before a new attempt
    pub fn begin_attempt(&mut self) {
        self.is_launching = true;
        self.stage = LaunchStage::Idle;
        self.reinstall_reason = None;
        self.last_failure = None;
        self.attempts += 1;
    }

    pub fn finish_success(&mut self) {
        self.is_launching = false;
        self.stage = LaunchStage::SignalReady;
        self.successes += 1;
    }

    /// Record a failure. The stage stays where the pipeline stopped.
    pub fn finish_failure(&mut self, message: String) {
        self.is_launching = false;
        self.last_failure = Some(message);
        self.failures += 1;
    }
}
