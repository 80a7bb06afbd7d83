// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{EvalError, Result};

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
const DEFAULT_POLL_MS: u64 = 250;

/// What happens to the in-flight request when a newer submission arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersedePolicy {
    /// Cancel the in-flight request and dispatch the pending one once it unwinds.
    #[default]
    Cancel,
    /// Let the in-flight request finish, discard its result, then dispatch.
    Finish,
}

impl FromStr for SupersedePolicy {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" => Ok(SupersedePolicy::Cancel),
            "finish" => Ok(SupersedePolicy::Finish),
            other => Err(EvalError::Config(format!(
                "invalid supersede policy '{}', expected 'cancel' or 'finish'",
                other
            ))),
        }
    }
}

/// Where the evaluation service lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_base: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: None,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub supersede: SupersedePolicy,
}

/// Settings for the terminal watcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { poll_ms: DEFAULT_POLL_MS }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }
}

/// High-level client configuration.
///
/// Loaded from an optional TOML file, then overridden by environment
/// variables, then by command line flags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub coordinator: CoordinatorConfig,
    pub watch: WatchConfig,
}

impl AppConfig {
    /// Default config file location, e.g. `~/.config/liveeval/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("liveeval").join("config.toml"))
    }

    /// Parse configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load the file at `path` (or the default location if it exists), then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    log::debug!("Loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                None => AppConfig::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(api_base) = lookup("LIVEEVAL_API_BASE") {
            self.service.api_base = api_base.trim().to_string();
        }
        if let Some(timeout) = lookup("LIVEEVAL_TIMEOUT_MS") {
            self.service.timeout_ms = Some(parse_millis("LIVEEVAL_TIMEOUT_MS", &timeout)?);
        }
        if let Some(policy) = lookup("LIVEEVAL_SUPERSEDE") {
            self.coordinator.supersede = policy.parse()?;
        }
        if let Some(poll) = lookup("LIVEEVAL_POLL_MS") {
            self.watch.poll_ms = parse_millis("LIVEEVAL_POLL_MS", &poll)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        let base = self.service.api_base.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(EvalError::Config(format!(
                "api_base must be an http(s) URL, got '{}'",
                base
            )));
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| EvalError::Config(format!("{} must be a number of milliseconds, got '{}'", key, value)))
}
