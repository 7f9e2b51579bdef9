//! Configuration loading and parsing.
//!
//! Parses `wex.toml` (or an override path provided by the binary). Every
//! section is optional and every field has a default, so a missing file and an
//! empty file behave the same. A file that fails to parse falls back to the
//! defaults and logs a warning. Unknown fields are ignored.
//!
//! ```toml
//! [macros]
//! file = "macros.toml"
//! max_depth = 32
//! status_pane = "PaneMacro"
//!
//! [playback]
//! on_surface_switch = "abort"   # or "continue"
//!
//! [vi]
//! readonly = false
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "wex.toml";

/// What playback does when a replayed command switches the bound surface.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackSwitch {
    /// Stop the remaining repeats.
    #[default]
    Abort,
    /// Keep replaying on the new surface.
    Continue,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MacrosConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "MacrosConfig::default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "MacrosConfig::default_status_pane")]
    pub status_pane: String,
}

impl Default for MacrosConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_depth: Self::default_max_depth(),
            status_pane: Self::default_status_pane(),
        }
    }
}

impl MacrosConfig {
    const fn default_max_depth() -> usize {
        32
    }
    fn default_status_pane() -> String {
        "PaneMacro".to_string()
    }

    /// Registry location: explicit `file`, else next to the config directory.
    pub fn resolved_file(&self) -> PathBuf {
        if let Some(file) = &self.file {
            return file.clone();
        }
        match dirs::config_dir() {
            Some(dir) => dir.join("wex").join("macros.toml"),
            None => PathBuf::from("macros.toml"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub on_surface_switch: PlaybackSwitch,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ViConfig {
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub macros: MacrosConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub vi: ViConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub path: Option<PathBuf>,
}

/// Config path following platform conventions: local `wex.toml` first, then
/// the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("wex").join(CONFIG_FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                file,
                path: Some(path),
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn macros(&self) -> &MacrosConfig {
        &self.file.macros
    }

    pub fn playback_switch(&self) -> PlaybackSwitch {
        self.file.playback.on_surface_switch
    }
}
