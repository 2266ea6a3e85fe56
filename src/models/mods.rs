use serde::{Deserialize, Serialize};

/// What the engine does with a mod file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModKind {
    /// Media archive searched in fallback order (`fallback-archive=`)
    Resource,
    /// Content file whose position sets override precedence (`content=`)
    Plugin,
}

/// One entry of the user's mod collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    pub filename: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub kind: ModKind,
    #[serde(default)]
    pub order: u32,
}

fn default_enabled() -> bool {
    true
}

impl ModEntry {
    pub fn new(filename: &str, kind: ModKind, order: u32, enabled: bool) -> Self {
        Self {
            filename: filename.to_string(),
            enabled,
            kind,
            order,
        }
    }
}

/// File-backed mod collection (`mods.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModList {
    #[serde(default)]
    pub mods: Vec<ModEntry>,
}

impl ModList {
    /// Enabled filenames of one kind in collection order.
    ///
    /// Collection order is the `order` field; ties keep their position in the
    /// file. Duplicates are passed through untouched.
    pub fn enabled(&self, kind: ModKind) -> Vec<String> {
        let mut selected: Vec<&ModEntry> = self
            .mods
            .iter()
            .filter(|m| m.kind == kind && m.enabled)
            .collect();
        selected.sort_by_key(|m| m.order);
        selected.into_iter().map(|m| m.filename.clone()).collect()
    }
}
