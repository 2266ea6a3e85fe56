//! Engine process environment, arguments and launch.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::process::ExitStatus;
use std::sync::Mutex;
use tokio::process::{Child, Command};

use crate::models::{EngineSettings, LaunchContext, LaunchTuning, Preferences};

/// Debug levels the engine understands
const DEBUG_LEVELS: [&str; 5] = ["DEBUG", "VERBOSE", "INFO", "WARNING", "ERROR"];

/// Environment variables handed to the engine process, in the order they are set.
///
/// Malformed `envLine` tokens are logged and skipped; they never fail the launch.
pub fn build_environment(prefs: &Preferences, tuning: &LaunchTuning) -> IndexMap<String, String> {
    let mut env = IndexMap::new();
    let mut set = |key: &str, value: &str| {
        env.insert(key.to_string(), value.to_string());
    };

    set("OPENMW_GAMMA", &format!("{:.2}", tuning.gamma));

    let physics_fps = prefs.get_string("pref_physicsFPS2", "");
    if !physics_fps.is_empty() {
        set("OPENMW_PHYSICS_FPS", &physics_fps);
        set("OSG_TEXT_SHADER_TECHNIQUE", "NO_TEXT_SHADER");
    }

    if prefs.get_string("pref_graphicsLibrary_v2", "") != "gles1" {
        set("OPENMW_GLES_VERSION", "2");
        set("LIBGL_ES", "2");
        set("OSG_VERTEX_BUFFER_HINT", "VBO");
        set("LIBGL_FB", "1");
        set("LIBGL_USEVBO", "1");
        set("LIBGL_NOHIGHP", "1");
    }

    let debug_level = prefs.get_string("pref_debug_level", "");
    if DEBUG_LEVELS.contains(&debug_level.as_str()) {
        set("OPENMW_DEBUG_LEVEL", &debug_level);
    }

    if prefs.get_string("pref_mygui", "") == "preset_01" {
        set("OPENMW_MYGUI", "preset_01");
    }

    if prefs.get_string("pref_water_preset", "") == "1" {
        set("OPENMW_WATER_VERTEX", "water_vertex.glsl");
        set("OPENMW_WATER_FRAGMENT", "water_fragment.glsl");
    } else {
        set("OPENMW_WATER_VERTEX", "water_vertex2.glsl");
        set("OPENMW_WATER_FRAGMENT", "water_fragment2.glsl");
    }

    match prefs.get_string("pref_vfs_selector", "").as_str() {
        "1" => set("OPENMW_VFS_SELECTOR", "vfs"),
        "2" => set("OPENMW_VFS_SELECTOR", "vfs2"),
        _ => {}
    }

    for token in prefs.get_string("envLine", "").split(' ') {
        if token.is_empty() {
            continue;
        }
        match parse_env_token(token) {
            Some((key, value)) => set(key, value),
            None => tracing::warn!("Ignoring malformed environment entry '{}'", token),
        }
    }

    env
}

/// `KEY=VALUE` with exactly one `=`, a non-empty key and no NUL bytes
fn parse_env_token(token: &str) -> Option<(&str, &str)> {
    let mut parts = token.split('=');
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() || key.is_empty() || token.contains('\0') {
        return None;
    }
    Some((key, value))
}

/// Split a command line on whitespace; double quotes group words.
///
/// An unterminated quote runs to the end of the line.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }
    args
}

/// Starts the engine once the launch context is ready
#[cfg_attr(test, mockall::automock)]
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, ctx: &LaunchContext) -> Result<()>;
}

/// Runs the engine as a child process.
///
/// Configured arguments come first, then the context's arguments. The context's
/// environment is layered over the launcher's own environment.
pub struct ProcessEngineLauncher {
    settings: EngineSettings,
    child: Mutex<Option<Child>>,
}

impl ProcessEngineLauncher {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            child: Mutex::new(None),
        }
    }

    /// Wait for a launched engine to exit; `None` when nothing was launched
    pub async fn wait(&self) -> Result<Option<ExitStatus>> {
        let child = match self.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(mut child) = child else {
            return Ok(None);
        };

        let status = child.wait().await.context("Failed to wait for engine process")?;
        tracing::info!("Engine exited with {}", status);
        Ok(Some(status))
    }
}

impl EngineLauncher for ProcessEngineLauncher {
    fn launch(&self, ctx: &LaunchContext) -> Result<()> {
        let mut cmd = Command::new(&self.settings.executable);
        cmd.args(&self.settings.args)
            .args(&ctx.arguments)
            .envs(&ctx.environment);

        if let Some(resolution) = ctx.resolution {
            tracing::info!("Using fixed screen resolution {}", resolution);
        }
        tracing::debug!(
            "Engine command: {} {:?} {:?} (mouse mode {:?})",
            self.settings.executable,
            self.settings.args,
            ctx.arguments,
            ctx.mouse_mode
        );

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn engine '{}'", self.settings.executable))?;

        tracing::info!("Engine started (pid {:?})", child.id());
        match self.child.lock() {
            Ok(mut guard) => *guard = Some(child),
            Err(poisoned) => *poisoned.into_inner() = Some(child),
        }
        Ok(())
    }
}
