use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Numeric launch parameters resolved from preferences before the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchTuning {
    /// UI scaling written to `scaling factor`
    pub scaling: f32,
    /// Gamma exported to the engine environment
    pub gamma: f32,
}

impl Default for LaunchTuning {
    fn default() -> Self {
        Self {
            scaling: 1.0,
            gamma: 1.0,
        }
    }
}

/// How pointer input is mapped while the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    Hybrid,
    Joystick,
    Touch,
}

impl MouseMode {
    /// Parse the stored preference; anything unknown is `Hybrid`
    pub fn from_preference(value: &str) -> Self {
        match value {
            "joystick" => MouseMode::Joystick,
            "touch" => MouseMode::Touch,
            _ => MouseMode::Hybrid,
        }
    }
}

/// A fixed screen resolution chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Parse `WIDTHxHEIGHT`; malformed input yields `None`
    pub fn parse(value: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\s*(\d+)\s*x\s*(\d+)\s*$").expect("Invalid resolution regex")
        });

        let caps = pattern.captures(value)?;
        let width = caps[1].parse().ok()?;
        let height = caps[2].parse().ok()?;
        Some(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the engine launch step needs, produced once by the pipeline worker.
///
/// This is handed across the ready signal to the launching thread; nothing in it
/// is shared mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchContext {
    pub tuning: LaunchTuning,
    pub resolution: Option<Resolution>,
    pub mouse_mode: MouseMode,
    pub environment: IndexMap<String, String>,
    pub arguments: Vec<String>,
}
