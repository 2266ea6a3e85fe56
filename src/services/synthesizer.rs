//! Generation of the merged `openmw.cfg` handed to the engine.

use anyhow::Result;
use std::fs;

use super::write_atomic;
use crate::models::LauncherPaths;
use crate::services::LaunchError;
use crate::services::kv_patch::SettingsDocument;

/// Builds the merged config from the installed templates and the enabled mods
pub struct ConfigSynthesizer<'a> {
    paths: &'a LauncherPaths,
}

impl<'a> ConfigSynthesizer<'a> {
    pub fn new(paths: &'a LauncherPaths) -> Self {
        Self { paths }
    }

    /// Merged config text before the engine path patches.
    ///
    /// `base`, `\n`, `fallback`, `\n`, then one `fallback-archive=` line per
    /// resource and one `content=` line per plugin, both in the given order.
    pub fn render(base: &str, fallback: &str, resources: &[String], plugins: &[String]) -> String {
        let mut out = String::with_capacity(
            base.len() + fallback.len() + 2 + (resources.len() + plugins.len()) * 32,
        );
        out.push_str(base);
        out.push('\n');
        out.push_str(fallback);
        out.push('\n');

        for name in resources {
            out.push_str("fallback-archive=");
            out.push_str(name);
            out.push('\n');
        }
        for name in plugins {
            out.push_str("content=");
            out.push_str(name);
            out.push('\n');
        }

        out
    }

    /// Regenerate the merged config wholesale.
    ///
    /// Both templates are read before anything is written; an unreadable template
    /// leaves the previous merged config untouched.
    pub fn synthesize(&self, resources: &[String], plugins: &[String]) -> Result<()> {
        let base = read_template(&self.paths.base_template())?;
        let fallback = read_template(&self.paths.fallback_template())?;

        let merged = Self::render(&base, &fallback, resources, plugins);
        let path = self.paths.merged_config();
        write_atomic(&path, merged.as_bytes()).map_err(|source| LaunchError::ConfigWrite {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Wrote {} with {} resource archive(s) and {} plugin(s)",
            path,
            resources.len(),
            plugins.len()
        );
        Ok(())
    }

    /// Point the merged config at the installed resources and the game data files.
    ///
    /// `data_files` is written quoted. All three keys land in one write.
    pub fn patch_engine_paths(&self, data_files: &str, encoding: &str) -> Result<()> {
        let path = self.paths.merged_config();
        let mut doc = SettingsDocument::load(&path)?;

        let resources = self.paths.resources();
        doc.set("resources", resources.as_str());
        doc.set("data", &format!("\"{}\"", data_files));
        doc.set("encoding", encoding);

        doc.save(&path)
            .map_err(|source| LaunchError::ConfigWrite {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("Patched engine paths into {} (encoding {})", path, encoding);
        Ok(())
    }
}

fn read_template(path: &camino::Utf8Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        tracing::error!("Template {} is unreadable: {}", path, source);
        LaunchError::TemplateUnreadable {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> (TempDir, LauncherPaths) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let paths = LauncherPaths::new(root.join("files"), root.join("user"), root.join("assets"));
        fs::create_dir_all(paths.global_config()).unwrap();
        (temp_dir, paths)
    }

    #[test]
    fn test_render_orders_resources_before_plugins() {
        let out = ConfigSynthesizer::render(
            "# base",
            "fallback=Foo,Bar",
            &names(&["a.bsa", "b.bsa"]),
            &names(&["c.esp"]),
        );
        assert_eq!(
            out,
            "# base\nfallback=Foo,Bar\nfallback-archive=a.bsa\nfallback-archive=b.bsa\ncontent=c.esp\n"
        );
    }

    #[test]
    fn test_render_keeps_duplicates_and_order() {
        let out = ConfigSynthesizer::render("", "", &[], &names(&["z.esp", "a.esp", "z.esp"]));
        assert!(out.ends_with("content=z.esp\ncontent=a.esp\ncontent=z.esp\n"));
    }

    #[test]
    fn test_synthesize_writes_merged_config() {
        let (_temp_dir, paths) = fixture();
        fs::write(paths.base_template(), "data=\"unset\"\nresources=unset\n").unwrap();
        fs::write(paths.fallback_template(), "fallback=Font_Color,1").unwrap();

        let synthesizer = ConfigSynthesizer::new(&paths);
        synthesizer
            .synthesize(&names(&["Tribunal.bsa"]), &names(&["Morrowind.esm"]))
            .unwrap();

        let content = fs::read_to_string(paths.merged_config()).unwrap();
        assert_eq!(
            content,
            "data=\"unset\"\nresources=unset\n\nfallback=Font_Color,1\nfallback-archive=Tribunal.bsa\ncontent=Morrowind.esm\n"
        );
    }

    #[test]
    fn test_patch_engine_paths_replaces_in_place_and_appends_encoding() {
        let (_temp_dir, paths) = fixture();
        fs::write(paths.base_template(), "data=\"unset\"\nresources=unset").unwrap();
        fs::write(paths.fallback_template(), "").unwrap();

        let synthesizer = ConfigSynthesizer::new(&paths);
        synthesizer.synthesize(&[], &names(&["Morrowind.esm"])).unwrap();
        synthesizer
            .patch_engine_paths("/games/Morrowind/Data Files", "win1252")
            .unwrap();

        let content = fs::read_to_string(paths.merged_config()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "data = \"/games/Morrowind/Data Files\"");
        assert_eq!(lines[1], format!("resources = {}", paths.resources()));
        assert_eq!(lines.last(), Some(&"encoding = win1252"));
        assert!(content.contains("content=Morrowind.esm\n"));
    }

    #[test]
    fn test_missing_template_writes_nothing() {
        let (_temp_dir, paths) = fixture();
        fs::write(paths.base_template(), "# base").unwrap();
        fs::write(paths.merged_config(), "previous").unwrap();

        let err = ConfigSynthesizer::new(&paths)
            .synthesize(&[], &[])
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::TemplateUnreadable { .. })
        ));
        assert_eq!(fs::read_to_string(paths.merged_config()).unwrap(), "previous");
    }

    proptest! {
        #[test]
        fn prop_render_is_templates_then_tagged_lines(
            base in "[ -~\n]{0,40}",
            fallback in "[ -~\n]{0,40}",
            resources in prop::collection::vec("[a-zA-Z0-9 ._-]{1,16}", 0..6),
            plugins in prop::collection::vec("[a-zA-Z0-9 ._-]{1,16}", 0..6),
        ) {
            let out = ConfigSynthesizer::render(&base, &fallback, &resources, &plugins);

            let header = format!("{}\n{}\n", base, fallback);
            prop_assert!(out.starts_with(&header));

            let tail: Vec<String> = out[header.len()..].lines().map(str::to_string).collect();
            let expected: Vec<String> = resources
                .iter()
                .map(|r| format!("fallback-archive={}", r))
                .chain(plugins.iter().map(|p| format!("content={}", p)))
                .collect();
            prop_assert_eq!(tail, expected);
        }
    }
}
