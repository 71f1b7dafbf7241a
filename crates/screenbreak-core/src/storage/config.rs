//! TOML-based client configuration.
//!
//! Stores:
//! - Where the usage-tracking service lives and how long to wait for it
//! - How often to poll for interventions
//! - How often the dashboard refreshes its statistics
//! - Where the local Screenpipe instance lives and how often to forward from it
//!
//! Configuration is stored at `~/.config/screenbreak/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Remote usage-tracking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Intervention polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Drop poll responses that settle after a newer one was applied.
    #[serde(default)]
    pub discard_stale_responses: bool,
}

/// Dashboard statistics feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

/// Screen activity forwarding from a local Screenpipe instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    #[serde(default = "default_screenpipe_url")]
    pub screenpipe_url: String,
    #[serde(default = "default_forward_interval")]
    pub forward_interval_secs: u64,
}

/// Client configuration.
///
/// Serialized to/from TOML at `~/.config/screenbreak/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub intervention: InterventionConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub forwarder: ForwarderConfig,
}

fn default_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_request_timeout() -> u64 {
    20
}
fn default_poll_interval() -> u64 {
    15
}
fn default_refresh_interval() -> u64 {
    30
}
fn default_screenpipe_url() -> String {
    "http://localhost:3030".into()
}
fn default_forward_interval() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            discard_stale_responses: false,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            screenpipe_url: default_screenpipe_url(),
            forward_interval_secs: default_forward_interval(),
        }
    }
}

fn check_http_url(key: &str, raw: &str) -> Result<()> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())).into());
    }
    Ok(())
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("cannot replace a whole section".into()).into());
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown().into())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Update a value in memory by dot-separated key.
    ///
    /// The result is validated before it replaces `self`; on error `self` is
    /// left unchanged.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        let nonzero = |key: &str, value: u64| -> Result<()> {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                }
                .into());
            }
            Ok(())
        };
        nonzero("server.request_timeout_secs", self.server.request_timeout_secs)?;
        nonzero("intervention.poll_interval_secs", self.intervention.poll_interval_secs)?;
        nonzero("dashboard.refresh_interval_secs", self.dashboard.refresh_interval_secs)?;
        nonzero("forwarder.forward_interval_secs", self.forwarder.forward_interval_secs)?;

        check_http_url("server.base_url", &self.server.base_url)?;
        check_http_url("forwarder.screenpipe_url", &self.forwarder.screenpipe_url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.intervention.poll_interval_secs)
    }

    pub fn dashboard_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.refresh_interval_secs)
    }

    pub fn forward_interval(&self) -> Duration {
        Duration::from_secs(self.forwarder.forward_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
