//! Client config load/save for `~/.kodeks/config.yaml`, plus the env lookups
//! both binaries share (config path, base URL override, API key).

use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.zapytajkodeks.pl";
pub const DEFAULT_STREAM_PATH: &str = "/v1/analysis/stream";
pub const DEFAULT_ANALYSIS_PATH: &str = "/v1/ai/analysis";

/// Bearer token for the API.
pub const API_KEY_ENV: &str = "ZAPYTAJKODEKS_API_KEY";
/// Overrides the default config file location.
pub const CONFIG_PATH_ENV: &str = "KODEKS_CONFIG";
/// Overrides `api.base_url`.
pub const BASE_URL_ENV: &str = "KODEKS_BASE_URL";

/// API section (base_url, stream_path, analysis_path).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_path: Option<String>,
}

/// Load driver defaults (count, concurrency). Positional arguments win.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LoadSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub load: LoadSection,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn stream_url(&self) -> String {
        join_url(
            self.base_url(),
            self.api.stream_path.as_deref().unwrap_or(DEFAULT_STREAM_PATH),
        )
    }

    pub fn analysis_url(&self) -> String {
        join_url(
            self.base_url(),
            self.api
                .analysis_path
                .as_deref()
                .unwrap_or(DEFAULT_ANALYSIS_PATH),
        )
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Returns the default config file path: `~/.kodeks/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".kodeks").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Resolve the config used by the binaries.
///
/// The file comes from `KODEKS_CONFIG`, else `~/.kodeks/config.yaml`. A file
/// that does not exist yields defaults; one that exists but does not parse is
/// an error. `KODEKS_BASE_URL` then replaces `api.base_url`.
pub fn resolve() -> Result<Config, ConfigError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .or_else(default_config_path);

    let mut config = match path {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "loading config");
            load(&path)?
        }
        _ => Config::default(),
    };

    if let Some(base_url) = non_empty_env(BASE_URL_ENV) {
        config.api.base_url = Some(base_url);
    }
    Ok(config)
}

/// Read the bearer credential. Empty counts as missing.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    non_empty_env(API_KEY_ENV).ok_or(ConfigError::MissingApiKey)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Config load/save error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{} is not set in environment or .env file", API_KEY_ENV)]
    MissingApiKey,
}
