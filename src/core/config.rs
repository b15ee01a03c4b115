use crate::core::error::ClientError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// How to launch the MCP tool server subprocess.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides applied on top of the inherited environment.
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Overrides the built-in authentication-failure vocabulary used to
    /// classify server error messages. Matching is case-insensitive
    /// substring search, so entries should be lowercase fragments.
    pub auth_error_markers: Option<Vec<String>>,
}

impl Config {
    pub fn load(path: Option<&PathBuf>) -> Result<Config, ClientError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(&Self::default_config_path()?),
        }
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, ClientError> {
        if !config_path.exists() {
            return Err(ClientError::Config(format!(
                "no configuration file at {}; create one with a [server] section describing how to launch the MCP server",
                config_path.display()
            )));
        }
        let contents = fs::read_to_string(config_path).map_err(|err| {
            ClientError::Config(format!("unable to read {}: {err}", config_path.display()))
        })?;
        toml::from_str(&contents).map_err(|err| {
            ClientError::Config(format!("unable to parse {}: {err}", config_path.display()))
        })
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), ClientError> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::Config(format!("unable to create {}: {err}", parent.display()))
            })?;
        }
        let contents =
            toml::to_string_pretty(self).map_err(|err| ClientError::Config(err.to_string()))?;
        fs::write(config_path, contents).map_err(|err| {
            ClientError::Config(format!("unable to write {}: {err}", config_path.display()))
        })
    }

    pub fn default_config_path() -> Result<PathBuf, ClientError> {
        let proj_dirs = ProjectDirs::from("dev", "outlookctl", "outlookctl").ok_or_else(|| {
            ClientError::Config("unable to determine a configuration directory".to_string())
        })?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
