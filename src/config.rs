use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::FdError;

pub const DEFAULT_CONFIG_FILE: &str = "fdrates.json";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub pacing_ms: Option<u64>,
    #[serde(default)]
    pub settle_ms: Option<u64>,
    #[serde(default)]
    pub notification_ttl_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub export_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub pacing: Duration,
    pub settle: Duration,
    pub notification_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(500),
            settle: Duration::from_secs(1),
            notification_ttl: crate::notify::DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub export_dir: Utf8PathBuf,
    pub timings: Timings,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, FdError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FdError::ConfigRead(config_path.clone()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|err| FdError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, FdError> {
        let defaults = Timings::default();
        let api_base_url = config
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if reqwest::Url::parse(&api_base_url).is_err() {
            return Err(FdError::ConfigParse(format!(
                "api_base_url is not a valid URL: {api_base_url}"
            )));
        }

        let export_dir = match config.export_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_export_dir()?,
        };

        Ok(ResolvedConfig {
            api_base_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(30)),
            export_dir,
            timings: Timings {
                pacing: config
                    .pacing_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.pacing),
                settle: config
                    .settle_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.settle),
                notification_ttl: config
                    .notification_ttl_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.notification_ttl),
            },
        })
    }
}

pub fn default_export_dir() -> Result<Utf8PathBuf, FdError> {
    if let Some(dir) = UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
    {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().map_err(|err| FdError::Filesystem(err.to_string()))?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| FdError::Filesystem("non-utf8 working directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(resolved.timings, Timings::default());
        assert_eq!(resolved.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let config = Config {
            api_base_url: Some("http://rates.internal:8080/api/".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.api_base_url, "http://rates.internal:8080/api");
    }
}
