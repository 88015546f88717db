//! `~/.metro.toml` configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = ".metro.toml";
pub const TOKEN_ENV: &str = "PRIM_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub token: Option<String>,
    pub default_station: Option<String>,
    /// Navitia base URL; defaults to the PRIM marketplace.
    pub api_url: Option<String>,
    pub locate: LocateConfig,
}

/// Defaults for `metro locate`; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub port: Option<u16>,
    #[serde(with = "humantime_serde")]
    pub cache: Option<Duration>,
    pub open_browser: Option<bool>,
}

/// Default config location: `~/.metro.toml`, or `.metro.toml` when there is no home directory.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    /// Missing file yields defaults; a present but invalid file is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("read config {}", path.display()));
            }
        };
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// API token, with `PRIM_TOKEN` taking precedence over the file.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone().filter(|t| !t.trim().is_empty()))
    }
}
