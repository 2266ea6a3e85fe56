//! Patching of the base64-encoded engine defaults blob.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose};
use camino::Utf8Path;
use indexmap::IndexMap;
use std::fs;

use super::write_atomic;
use crate::services::LaunchError;

/// Replace lines of decoded defaults text.
///
/// A line is replaced by `key = value` for the first patch (in map order) whose
/// `key =` prefixes it; later patches are not consulted for that line. Lines are
/// split and re-joined on `\n` only, so unpatched bytes survive exactly.
pub fn patch_defaults_text(text: &str, patches: &IndexMap<String, String>) -> String {
    text.split('\n')
        .map(|line| {
            patches
                .iter()
                .find(|(key, _)| line.starts_with(&format!("{} =", key)))
                .map(|(key, value)| format!("{} = {}", key, value))
                .unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode, patch and re-encode a defaults blob.
///
/// Surrounding whitespace of the encoded blob (e.g. a trailing newline) is
/// preserved after the re-encoded payload.
pub fn patch_defaults_blob(encoded: &str, patches: &IndexMap<String, String>) -> Result<String> {
    let payload = encoded.trim();
    let trailer = &encoded[encoded.trim_end().len()..];

    let decoded = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| LaunchError::DefaultsBlob(format!("invalid base64: {}", e)))?;
    let text = String::from_utf8(decoded)
        .map_err(|e| LaunchError::DefaultsBlob(format!("decoded blob is not UTF-8: {}", e)))?;

    let patched = patch_defaults_text(&text, patches);
    let mut out = general_purpose::STANDARD.encode(patched.as_bytes());
    out.push_str(trailer);
    Ok(out)
}

/// Patch the defaults blob file at `path` in place
pub fn patch_defaults(path: &Utf8Path, patches: &IndexMap<String, String>) -> Result<()> {
    let encoded = fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults blob: {}", path))?;

    let out = patch_defaults_blob(&encoded, patches)
        .with_context(|| format!("Failed to patch defaults blob: {}", path))?;

    write_atomic(path, out.as_bytes())
        .with_context(|| format!("Failed to write defaults blob: {}", path))?;

    tracing::info!("Patched {} default(s) in {}", patches.len(), path);
    Ok(())
}
