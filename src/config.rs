use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "AGENTCHAT_API_URL";
pub const ENV_AGENT_ID: &str = "AGENTCHAT_AGENT_ID";
pub const ENV_API_KEY: &str = "AGENTCHAT_API_KEY";
pub const ENV_AGENT_TITLE: &str = "AGENTCHAT_AGENT_TITLE";

/// Main application configuration, layered from file, environment and flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the agent service, without the `/v1` suffix
    pub api_url: Option<String>,

    /// Agent to converse with
    pub agent_id: Option<String>,

    /// Bearer credential sent with every request
    pub api_key: Option<String>,

    /// Display title used when the service returns an untitled agent
    pub agent_title: Option<String>,

    /// Overall request timeout; the transport default applies when unset
    pub request_timeout_secs: Option<u64>,

    /// agentchat home directory (config file, logs)
    #[serde(skip)]
    pub home: PathBuf,
}

/// Validated settings needed to reach the agent service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub api_url: String,
    pub agent_id: String,
    pub api_key: String,
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Default home directory, `~/.agentchat`
    pub fn default_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentchat")
    }

    /// Load from `path` (or `~/.agentchat/config.toml`) and overlay the process environment.
    ///
    /// Only the default file may be missing; an explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let home = Self::default_home();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = home.join("config.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Config::default()
                }
            }
        };
        config.home = home;
        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values from an environment lookup; non-empty values win over the file
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_API_URL) {
            self.api_url = Some(value);
        }
        if let Some(value) = get(ENV_AGENT_ID) {
            self.agent_id = Some(value);
        }
        if let Some(value) = get(ENV_API_KEY) {
            self.api_key = Some(value);
        }
        if let Some(value) = get(ENV_AGENT_TITLE) {
            self.agent_title = Some(value);
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, api_url: Option<String>, agent_id: Option<String>) {
        if api_url.is_some() {
            self.api_url = api_url;
        }
        if agent_id.is_some() {
            self.agent_id = agent_id;
        }
    }

    /// Check required settings and produce the client-facing subset
    pub fn validate(&self) -> Result<ApiSettings, ConfigError> {
        fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::Missing(name))
        }

        Ok(ApiSettings {
            api_url: required(&self.api_url, "api_url")?,
            agent_id: required(&self.agent_id, "agent_id")?,
            api_key: required(&self.api_key, "api_key")?,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Log file used while the TUI owns the terminal
    pub fn log_path(&self) -> PathBuf {
        self.home.join("agentchat.log")
    }
}
