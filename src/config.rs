//! Engine configuration plus shared utilities for loading/saving JSON
//! config files and resolving API keys from fields or environment variables.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Engine Config ──────────────────────────────────────

/// Tunable defaults for avatar image generation and presentation.
///
/// The visual `style` lives here rather than in code so the host
/// application can restyle the character without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default visual style keywords folded into every prompt.
    #[serde(default = "default_style")]
    pub style: String,
    /// Default scene/background keywords.
    #[serde(default = "default_background")]
    pub background: String,
    /// Default lighting keywords.
    #[serde(default = "default_lighting")]
    pub lighting: String,
    /// Default quality tier ("standard", "high", "draft").
    #[serde(default = "default_quality")]
    pub quality: String,

    #[serde(default = "default_width")]
    pub image_width: u32,
    #[serde(default = "default_height")]
    pub image_height: u32,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_guidance")]
    pub guidance: f32,

    /// When true, prompt authorship is delegated to the text provider.
    #[serde(default)]
    pub meta_prompting: bool,

    /// How long `is_animating` stays set after a command, unless the
    /// command carries its own duration.
    #[serde(default = "default_animation_reset_ms")]
    pub animation_reset_ms: u64,
    /// Opacity applied by a `fade` command.
    #[serde(default = "default_faded_opacity")]
    pub faded_opacity: f32,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub enabled: bool,
    /// How many archived images `cleanup_old_images` keeps.
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,
    /// Probability that a successful generation triggers cleanup.
    #[serde(default = "default_cleanup_chance")]
    pub cleanup_chance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            style: default_style(),
            background: default_background(),
            lighting: default_lighting(),
            quality: default_quality(),
            image_width: default_width(),
            image_height: default_height(),
            steps: default_steps(),
            guidance: default_guidance(),
            meta_prompting: false,
            animation_reset_ms: default_animation_reset_ms(),
            faded_opacity: default_faded_opacity(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            keep_count: default_keep_count(),
            cleanup_chance: default_cleanup_chance(),
        }
    }
}

fn default_style() -> String {
    "detailed anime illustration, clean lineart, soft shading".to_string()
}
fn default_background() -> String {
    "cozy room interior".to_string()
}
fn default_lighting() -> String {
    "soft ambient lighting".to_string()
}
fn default_quality() -> String {
    "standard".to_string()
}
fn default_width() -> u32 {
    832
}
fn default_height() -> u32 {
    1216
}
fn default_steps() -> u32 {
    28
}
fn default_guidance() -> f32 {
    7.0
}
fn default_animation_reset_ms() -> u64 {
    500
}
fn default_faded_opacity() -> f32 {
    0.4
}
fn default_keep_count() -> usize {
    50
}
fn default_cleanup_chance() -> f64 {
    0.1
}

// ── JSON Config Utilities ──────────────────────────────

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                tracing::info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                tracing::warn!(
                    "[{}] Failed to parse config {}: {} — using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            tracing::info!(
                "[{}] No config file at {} — using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    tracing::info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

/// Resolve an API key: check the direct `api_key` field first,
/// then fall back to reading the environment variable named in `api_key_env`.
pub fn resolve_api_key(api_key: &Option<String>, api_key_env: &Option<String>) -> Option<String> {
    if let Some(ref key) = api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    if let Some(ref env_var) = api_key_env {
        if let Ok(key) = std::env::var(env_var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    None
}
