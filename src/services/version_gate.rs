//! Decides whether the installed static assets belong to this build.
//!
//! The check fails safe: anything other than a readable stamp holding exactly the
//! current version means "reinstall".

use camino::Utf8Path;
use std::fmt;
use std::fs;
use std::io;

/// Why the installed assets are considered stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No stamp file (first run, or an interrupted reinstall)
    Missing,
    /// The stamp exists but could not be read
    Unreadable(String),
    /// The stamp is not a decimal integer
    Unparsable(String),
    /// The stamp names another build
    Mismatch { installed: u32, current: u32 },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Missing => write!(f, "version stamp missing"),
            StaleReason::Unreadable(e) => write!(f, "version stamp unreadable: {}", e),
            StaleReason::Unparsable(raw) => write!(f, "version stamp unparsable: {:?}", raw),
            StaleReason::Mismatch { installed, current } => write!(
                f,
                "installed assets are version {}, build is version {}",
                installed, current
            ),
        }
    }
}

/// Outcome of comparing the stored stamp with the running build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    UpToDate,
    Stale(StaleReason),
}

impl VersionCheck {
    /// Classify a stamp read result against `current`
    pub fn evaluate(stored: io::Result<String>, current: u32) -> Self {
        let raw = match stored {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return VersionCheck::Stale(StaleReason::Missing);
            }
            Err(e) => return VersionCheck::Stale(StaleReason::Unreadable(e.to_string())),
        };

        match raw.trim().parse::<u32>() {
            Ok(installed) if installed == current => VersionCheck::UpToDate,
            Ok(installed) => VersionCheck::Stale(StaleReason::Mismatch { installed, current }),
            Err(_) => VersionCheck::Stale(StaleReason::Unparsable(raw.trim().to_string())),
        }
    }

    /// Read the stamp file and classify it. Never fails.
    pub fn check(stamp_path: &Utf8Path, current: u32) -> Self {
        let outcome = Self::evaluate(fs::read_to_string(stamp_path), current);
        match &outcome {
            VersionCheck::UpToDate => {
                tracing::debug!("Static assets at version {} are current", current)
            }
            VersionCheck::Stale(reason) => tracing::info!("Static assets stale: {}", reason),
        }
        outcome
    }

    pub fn needs_reinstall(&self) -> bool {
        matches!(self, VersionCheck::Stale(_))
    }
}

/// Boolean form of the gate over an already-parsed stamp
pub fn should_reinstall<E>(stored: Result<u32, E>, current: u32) -> bool {
    !matches!(stored, Ok(v) if v == current)
}
