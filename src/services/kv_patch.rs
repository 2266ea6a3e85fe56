//! Line-oriented `key = value` patching.
//!
//! A line matches `key` when its trimmed form starts with `key` followed by optional
//! whitespace and `=`. Only the first matching line is ever rewritten, and it is
//! replaced wholesale by `key = value`. When no line matches, `key = value` is
//! appended as a new final line. Every other line is kept byte-for-byte; the only
//! normalization is that the rendered file always ends with exactly one `\n`.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::collections::HashMap;
use std::fs;

use super::write_atomic;

/// What a single patch did to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The line at this zero-based index was replaced
    Replaced(usize),
    /// No line matched; a new line was appended at this index
    Appended(usize),
}

/// In-memory view of a `key = value` file.
///
/// Applying many patches to one document and saving once is observably identical
/// to patching the file key by key, because each lookup sees earlier patches
/// (including appended lines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsDocument {
    lines: Vec<String>,
    /// First line index for each key seen so far
    index: HashMap<String, usize>,
}

impl SettingsDocument {
    pub fn parse(content: &str) -> Self {
        let lines: Vec<String> = content.split_terminator('\n').map(str::to_string).collect();

        let mut index = HashMap::new();
        for (i, line) in lines.iter().enumerate() {
            if let Some(key) = line_key(line) {
                index.entry(key.to_string()).or_insert(i);
            }
        }

        Self { lines, index }
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path))?;
        Ok(Self::parse(&content))
    }

    /// Set `key` to `value`, replacing the first matching line or appending one
    pub fn set(&mut self, key: &str, value: &str) -> PatchOutcome {
        let rendered = format!("{} = {}", key, value);

        match self.index.get(key) {
            Some(&i) => {
                self.lines[i] = rendered;
                PatchOutcome::Replaced(i)
            }
            None => {
                let i = self.lines.len();
                self.lines.push(rendered);
                self.index.insert(key.to_string(), i);
                PatchOutcome::Appended(i)
            }
        }
    }

    /// Value segment of the first line for `key`, trimmed
    pub fn get(&self, key: &str) -> Option<&str> {
        let line = &self.lines[*self.index.get(key)?];
        line.split_once('=').map(|(_, v)| v.trim())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Write the document back (temp file + rename)
    pub fn save(&self, path: &Utf8Path) -> std::io::Result<()> {
        write_atomic(path, self.render().as_bytes())
    }
}

/// Key of a `key = value` line, or `None` for lines without `=`.
///
/// Splitting on the first `=` and trimming is the same rule as "trimmed line starts
/// with key, then optional whitespace, then `=`" for any key that contains no `=`.
fn line_key(line: &str) -> Option<&str> {
    line.split_once('=').map(|(k, _)| k.trim())
}

/// Patch one key in `path` with a full read-modify-write.
///
/// Consecutive calls on the same file observe each other's results. Prefer
/// [`patch_many`] when more than one key changes.
pub fn patch(path: &Utf8Path, key: &str, value: &str) -> Result<PatchOutcome> {
    let mut doc = SettingsDocument::load(path)?;
    let outcome = doc.set(key, value);
    doc.save(path)
        .with_context(|| format!("Failed to write {}", path))?;

    tracing::debug!("Patched '{}' in {} ({:?})", key, path, outcome);
    Ok(outcome)
}

/// Patch several keys in order with a single read and a single write
pub fn patch_many<K, V>(path: &Utf8Path, patches: &[(K, V)]) -> Result<Vec<PatchOutcome>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut doc = SettingsDocument::load(path)?;
    let outcomes: Vec<PatchOutcome> = patches
        .iter()
        .map(|(k, v)| doc.set(k.as_ref(), v.as_ref()))
        .collect();
    doc.save(path)
        .with_context(|| format!("Failed to write {}", path))?;

    tracing::debug!("Patched {} keys in {}", outcomes.len(), path);
    Ok(outcomes)
}
