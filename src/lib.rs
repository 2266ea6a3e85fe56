// omwlaunch - launch configuration synthesis for the OpenMW engine
//
// This is the library crate containing the launch pipeline and its data structures.
// The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{LaunchContext, LauncherConfig, LauncherPaths, ModList, Preferences};
pub use services::{LaunchError, LaunchOrchestrator};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Numeric build version stamped onto installed static assets.
///
/// `major * 10000 + minor * 100 + patch`, so any release bump invalidates the
/// previously installed assets.
pub const VERSION_CODE: u32 = {
    let major = parse_version_part(env!("CARGO_PKG_VERSION_MAJOR"));
    let minor = parse_version_part(env!("CARGO_PKG_VERSION_MINOR"));
    let patch = parse_version_part(env!("CARGO_PKG_VERSION_PATCH"));
    major * 10000 + minor * 100 + patch
};

const fn parse_version_part(part: &str) -> u32 {
    let bytes = part.as_bytes();
    let mut value = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}
