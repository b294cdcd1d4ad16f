use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_load_1m")]
    pub cpu_load_1m: f64,
    #[serde(default = "default_cpu_load_5m")]
    pub cpu_load_5m: f64,
    #[serde(default = "default_cpu_load_15m")]
    pub cpu_load_15m: f64,
    #[serde(default = "default_warning_percent")]
    pub memory_warning_percent: f64,
    #[serde(default = "default_critical_percent")]
    pub memory_critical_percent: f64,
    #[serde(default = "default_warning_percent")]
    pub swap_warning_percent: f64,
    #[serde(default = "default_critical_percent")]
    pub swap_critical_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    pub server_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            token: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_load_1m: default_cpu_load_1m(),
            cpu_load_5m: default_cpu_load_5m(),
            cpu_load_15m: default_cpu_load_15m(),
            memory_warning_percent: default_warning_percent(),
            memory_critical_percent: default_critical_percent(),
            swap_warning_percent: default_warning_percent(),
            swap_critical_percent: default_critical_percent(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required arguments")]
    MissingArguments,
    #[error("Invalid configuration: cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid configuration: cannot parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty or comment-only file parses to null.
        let cfg: Option<Config> = serde_yaml::from_str(text)?;
        Ok(cfg.unwrap_or_default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "token_env must not be empty".to_string(),
            ));
        }
        if self.timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "timeout_secs must be >= 1".to_string(),
            ));
        }

        validate_thresholds(&self.thresholds)
    }

    pub fn resolve(
        &self,
        server: Option<String>,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<ProbeSettings, ConfigError> {
        let server_url = non_blank(server)
            .or_else(|| non_blank(self.server_url.clone()))
            .ok_or(ConfigError::MissingArguments)?;
        let token = non_blank(token)
            .or_else(|| resolve_token_from_env(&self.token_env))
            .or_else(|| non_blank(self.token.clone()))
            .ok_or(ConfigError::MissingArguments)?;
        let timeout = timeout.unwrap_or_else(|| Duration::from_secs(self.timeout_secs));
        if timeout.is_zero() {
            return Err(ConfigError::Validation(
                "timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ProbeSettings {
            server_url: server_url.trim().trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<(), ConfigError> {
    for (name, value) in [
        ("cpu_load_1m", t.cpu_load_1m),
        ("cpu_load_5m", t.cpu_load_5m),
        ("cpu_load_15m", t.cpu_load_15m),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!(
                "thresholds.{name} must be a non-negative number"
            )));
        }
    }

    validate_percent_pair(
        "memory",
        t.memory_warning_percent,
        t.memory_critical_percent,
    )?;
    validate_percent_pair("swap", t.swap_warning_percent, t.swap_critical_percent)
}

fn validate_percent_pair(prefix: &str, warning: f64, critical: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&warning) {
        return Err(ConfigError::Validation(format!(
            "thresholds.{prefix}_warning_percent must be in range 0..100"
        )));
    }
    if !(0.0..=100.0).contains(&critical) {
        return Err(ConfigError::Validation(format!(
            "thresholds.{prefix}_critical_percent must be in range 0..100"
        )));
    }
    if warning > critical {
        return Err(ConfigError::Validation(format!(
            "thresholds.{prefix}_warning_percent must not exceed {prefix}_critical_percent"
        )));
    }
    Ok(())
}

fn resolve_token_from_env(env_name: &str) -> Option<String> {
    non_blank(std::env::var(env_name).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_token_env() -> String {
    "NC_TOKEN".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_cpu_load_1m() -> f64 {
    5.0
}

const fn default_cpu_load_5m() -> f64 {
    4.0
}

const fn default_cpu_load_15m() -> f64 {
    3.0
}

const fn default_warning_percent() -> f64 {
    80.0
}

const fn default_critical_percent() -> f64 {
    90.0
}
