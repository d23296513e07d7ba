//! Configuration for aggcache.
//!
//! Settings come from an optional `aggcache.toml`, looked up next to the
//! graph manifest unless `--config` names another file, and from
//! environment overrides applied on top:
//!
//! ```toml
//! [live]
//! enabled = false
//! state_path = ".aggcache/live-state.bin"
//! ```
//!
//! | Variable              | Effect                                   |
//! |-----------------------|------------------------------------------|
//! | `AGGCACHE_LIVE`       | `1`/`true`/`yes` or `0`/`false`/`no`     |
//! | `AGGCACHE_LIVE_STATE` | replaces `live.state_path`               |
//!
//! A missing file yields the defaults. A relative `state_path` is resolved
//! against the directory of the graph manifest.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_LIVE_STATE_PATH, ENV_LIVE, ENV_LIVE_STATE};
use crate::core::AggError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggConfig {
    /// Live-reload settings.
    #[serde(default)]
    pub live: LiveConfig,
}

/// The `[live]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfig {
    /// Whether builds persist and reuse live state.
    #[serde(default)]
    pub enabled: bool,

    /// Where the live state is stored.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_LIVE_STATE_PATH)
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            state_path: default_state_path(),
        }
    }
}

impl AggConfig {
    /// Parse a configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load the configuration for a graph manifest.
    ///
    /// `explicit` must exist when given; otherwise `aggcache.toml` next to
    /// the manifest is used if present. Environment overrides are applied
    /// either way.
    pub fn load_for_manifest(manifest: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => {
                let candidate = manifest_dir(manifest).join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    tracing::debug!("Using config {}", candidate.display());
                    Self::load_from(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `AGGCACHE_*` overrides read through `var`.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AggError> {
        if let Some(value) = var(ENV_LIVE) {
            self.live.enabled = parse_flag(&value).ok_or_else(|| AggError::ConfigError {
                message: format!("{ENV_LIVE} must be a boolean, got '{value}'"),
            })?;
        }
        if let Some(value) = var(ENV_LIVE_STATE)
            && !value.is_empty()
        {
            self.live.state_path = PathBuf::from(value);
        }
        Ok(())
    }

    /// The live-state path, resolved against the manifest directory.
    #[must_use]
    pub fn resolve_state_path(&self, manifest: &Path) -> PathBuf {
        if self.live.state_path.is_absolute() {
            self.live.state_path.clone()
        } else {
            manifest_dir(manifest).join(&self.live.state_path)
        }
    }
}

fn manifest_dir(manifest: &Path) -> &Path {
    manifest.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
