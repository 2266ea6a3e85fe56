//! Application of launcher preferences to the user `settings.cfg`.

use anyhow::{Context, Result};
use std::fs;

use super::write_atomic;
use crate::models::{LauncherPaths, Preferences};
use crate::services::LaunchError;
use crate::services::kv_patch::{PatchOutcome, SettingsDocument};

/// Preference that enables bulk settings application
pub const GLOBAL_FUNCTIONS_PREF: &str = "pref_global_functions";

/// Settings key written from the resolved UI scaling
pub const SCALING_FACTOR_KEY: &str = "scaling factor";

/// How a preference value is rendered into the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Passed through as text, `default` when the preference is unset
    Text { default: &'static str },
    /// Rendered as `true`/`false`, unset means `false`
    Flag,
}

/// One `preference → settings key` mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingBinding {
    pub preference: &'static str,
    pub setting: &'static str,
    pub kind: ValueKind,
}

const fn text(preference: &'static str, setting: &'static str, default: &'static str) -> SettingBinding {
    SettingBinding {
        preference,
        setting,
        kind: ValueKind::Text { default },
    }
}

const fn flag(preference: &'static str, setting: &'static str) -> SettingBinding {
    SettingBinding {
        preference,
        setting,
        kind: ValueKind::Flag,
    }
}

/// Fixed catalog, applied in this order after `scaling factor`.
///
/// Text defaults are the engine's own defaults for each key.
pub const SETTINGS_CATALOG: &[SettingBinding] = &[
    text("pref_viewing_distance", "viewing distance", "7168.0"),
    text("pref_framerate_limit", "framerate limit", "300"),
    text("pref_antialiasing", "antialiasing", "0"),
    text("pref_async", "async num threads", "1"),
    text("pref_show_owned", "show owned", "0"),
    text("pref_strength_influences_hand_to_hand", "strength influences hand to hand", "0"),
    text("pref_projectiles_enchant_multiplier", "projectiles enchant multiplier", "0"),
    text("pref_rtt_size", "rtt size", "512"),
    text("pref_reflection_detail", "reflection detail", "2"),
    text("pref_lod_factor", "lod factor", "1.0"),
    text("pref_difficulty", "difficulty", "0"),
    text("pref_target_framerate", "target framerate", "60"),
    text("pref_small_feature_culling_pixel_size", "small feature culling pixel size", "2.0"),
    text("pref_max_quicksaves", "max quicksaves", "1"),
    text("pref_preload_num_threads", "preload num threads", "1"),
    text("pref_density", "density", "1.0"),
    text("pref_min_chunk_size", "min chunk size", "0.5"),
    text("pref_stomp_mode", "stomp mode", "2"),
    text("pref_stomp_intensity", "stomp intensity", "2"),
    text("pref_object_paging_min_size", "object paging min size", "0.01"),
    text("pref_lighting_method", "lighting method", "shaders compatibility"),
    text("pref_max_lights", "max lights", "8"),
    text("pref_minimum_interior_brightness", "minimum interior brightness", "0.08"),
    text("pref_preload_distance", "preload distance", "1000"),
    text("pref_object_paging_merge_factor", "object paging merge factor", "250"),
    text("pref_rendering_distance", "rendering distance", "6144.0"),
    flag("pref_vsync", "vsync"),
    flag("pref_preloading", "preload enabled"),
    flag("pref_distant", "distant terrain"),
    flag("pref_shaders", "force shaders"),
    flag("pref_pix_light", "force per pixel lighting"),
    flag("pref_clamp_lighting", "clamp lighting"),
    flag("pref_radfog", "radial fog"),
    flag("pref_gyroscope", "enable gyroscope"),
    flag("pref_stretch_menu_background", "stretch menu background"),
    flag("pref_color_topic_enable", "color topic enable"),
    flag("pref_show_projectile_damage", "show projectile damage"),
    flag("pref_show_melee_info", "show melee info"),
    flag("pref_show_enchant_chance", "show enchant chance"),
    flag("pref_best_attack", "best attack"),
    flag(
        "pref_classic_reflected_absorb_spells_behavior",
        "classic reflected absorb spells behavior",
    ),
    flag("pref_show_effect_duration", "show effect duration"),
    flag("pref_prevent_merchant_equipping", "prevent merchant equipping"),
    flag("pref_enchanted_weapons_are_magical", "enchanted weapons are magical"),
    flag("pref_followers_attack_on_sight", "followers attack on sight"),
    flag("pref_can_loot_during_death_animation", "can loot during death animation"),
    flag("pref_rebalance_soul_gem_values", "rebalance soul gem values"),
    flag("pref_use_additional_anim_sources", "use additional anim sources"),
    flag(
        "pref_barter_disposition_change_is_permanent",
        "barter disposition change is permanent",
    ),
    flag("pref_weapon_sheathing", "weapon sheathing"),
    flag("pref_shield_sheathing", "shield sheathing"),
    flag(
        "pref_only_appropriate_ammunition_bypasses_resistance",
        "only appropriate ammunition bypasses resistance",
    ),
    flag("pref_use_magic_item_animations", "use magic item animations"),
    flag("pref_normalise_race_speed", "normalise race speed"),
    flag("pref_uncapped_damage_fatigue", "uncapped damage fatigue"),
    flag("pref_turn_to_movement_direction", "turn to movement direction"),
    flag("pref_smooth_movement", "smooth movement"),
    flag("pref_NPCs_avoid_collisions", "NPCs avoid collisions"),
    flag("pref_NPCs_give_way", "NPCs give way"),
    flag("pref_swim_upward_correction", "swim upward correction"),
    flag(
        "pref_trainers_training_skills_based_on_base_skill",
        "trainers training skills based on base skill",
    ),
    flag(
        "pref_always_allow_stealing_from_knocked_out_actors",
        "always allow stealing from knocked out actors",
    ),
    flag("pref_graphic_herbalism", "graphic herbalism"),
    flag(
        "pref_allow_actors_to_follow_over_water_surface",
        "allow actors to follow over water surface",
    ),
    flag("pref_shader_water", "shader"),
    flag("pref_refraction", "refraction"),
    flag("pref_head_bobbing", "head bobbing"),
    flag("pref_view_over_shoulder", "view over shoulder"),
    flag("pref_auto_switch_shoulder", "auto switch shoulder"),
    flag("pref_preview_if_stand_still", "preview if stand still"),
    flag("pref_deferred_preview_rotation", "deferred preview rotation"),
    flag("pref_subtitles", "subtitles"),
    flag("pref_toggle_sneak", "toggle sneak"),
    flag("pref_small_feature_culling", "small feature culling"),
    // One preference drives all four PBR auto-use keys
    flag("pref_auto_use_pbr", "auto use object normal maps"),
    flag("pref_auto_use_pbr", "auto use object specular maps"),
    flag("pref_auto_use_pbr", "auto use terrain normal maps"),
    flag("pref_auto_use_pbr", "auto use terrain specular maps"),
    flag(
        "pref_apply_lighting_to_environment_maps",
        "apply lighting to environment maps",
    ),
    flag("pref_autosave", "autosave"),
    flag("pref_timeplayed", "timeplayed"),
    flag("pref_groundcover_enable", "enabled"),
    flag("pref_preload_exterior_grid", "preload exterior grid"),
    flag("pref_preload_fast_travel", "preload fast travel"),
    flag("pref_preload_doors", "preload doors"),
    flag("pref_preload_instances", "preload instances"),
    flag("pref_object_paging", "object paging"),
    flag("pref_always_run", "always run"),
];

impl SettingBinding {
    /// Value to write for this binding under `prefs`
    pub fn resolve(&self, prefs: &Preferences) -> String {
        match self.kind {
            ValueKind::Text { default } => prefs.get_string(self.preference, default),
            ValueKind::Flag => prefs.get_bool(self.preference, false).to_string(),
        }
    }
}

/// What one settings application did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsReport {
    /// False when bulk application is switched off
    pub enabled: bool,
    pub replaced: usize,
    pub appended: usize,
}

impl SettingsReport {
    pub fn lines_written(&self) -> usize {
        self.replaced + self.appended
    }
}

/// Writes the settings catalog into the user `settings.cfg`
pub struct SettingsApplier<'a> {
    paths: &'a LauncherPaths,
}

impl<'a> SettingsApplier<'a> {
    pub fn new(paths: &'a LauncherPaths) -> Self {
        Self { paths }
    }

    /// Create the user `settings.cfg` from the installed one if it is absent.
    ///
    /// Returns `true` when a file was seeded.
    pub fn ensure_seeded(&self) -> Result<bool> {
        let user_settings = self.paths.user_settings();
        if user_settings.exists() {
            tracing::debug!("User settings {} already present", user_settings);
            return Ok(false);
        }

        let global_settings = self.paths.global_settings();
        let content = fs::read(&global_settings)
            .with_context(|| format!("Failed to read installed settings: {}", global_settings))?;
        write_atomic(&user_settings, &content).map_err(|source| LaunchError::SettingsWrite {
            path: user_settings.clone(),
            source,
        })?;

        tracing::info!("Seeded {} from {}", user_settings, global_settings);
        Ok(true)
    }

    /// Apply `scaling factor` and the catalog in one read and one write.
    ///
    /// Does nothing unless [`GLOBAL_FUNCTIONS_PREF`] is set.
    pub fn apply(&self, prefs: &Preferences, scaling: f32) -> Result<SettingsReport> {
        if !prefs.get_bool(GLOBAL_FUNCTIONS_PREF, false) {
            tracing::info!("Bulk settings application disabled, leaving settings.cfg as-is");
            return Ok(SettingsReport::default());
        }

        let path = self.paths.user_settings();
        let mut doc = SettingsDocument::load(&path)?;
        let mut report = SettingsReport {
            enabled: true,
            ..SettingsReport::default()
        };

        let scaling = format!("{:.2}", scaling);
        let entries = std::iter::once((SCALING_FACTOR_KEY, scaling)).chain(
            SETTINGS_CATALOG
                .iter()
                .map(|binding| (binding.setting, binding.resolve(prefs))),
        );

        for (key, value) in entries {
            match doc.set(key, &value) {
                PatchOutcome::Replaced(_) => report.replaced += 1,
                PatchOutcome::Appended(_) => {
                    tracing::debug!("Settings key '{}' not found, appended", key);
                    report.appended += 1;
                }
            }
        }

        doc.save(&path).map_err(|source| LaunchError::SettingsWrite {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            "Applied {} setting(s) to {} ({} replaced, {} appended)",
            report.lines_written(),
            path,
            report.replaced,
            report.appended
        );
        Ok(report)
    }
}
