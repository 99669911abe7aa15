use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::loader::error::ConfigLoadError;
use crate::util::{parse_bool, parse_duration};

pub const ENV_CONFIG_PATH: &str = "ESSCROLL_CONFIG_PATH";
pub const ENV_URL: &str = "ESSCROLL_URL";
pub const ENV_USERNAME: &str = "ESSCROLL_USERNAME";
pub const ENV_PASSWORD: &str = "ESSCROLL_PASSWORD";
pub const ENV_PASSWORD_FILE: &str = "ESSCROLL_PASSWORD_FILE";
pub const ENV_BATCH_SIZE: &str = "ESSCROLL_BATCH_SIZE";
pub const ENV_KEEP_ALIVE: &str = "ESSCROLL_KEEP_ALIVE";
pub const ENV_CONNECT_TIMEOUT: &str = "ESSCROLL_CONNECT_TIMEOUT";
pub const ENV_REQUEST_TIMEOUT: &str = "ESSCROLL_REQUEST_TIMEOUT";
pub const ENV_ACCEPT_INVALID_CERTS: &str = "ESSCROLL_ACCEPT_INVALID_CERTS";

/// Raw configuration as defined in a TOML or JSON file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub backend: FileBackendConfig,
    #[serde(default)]
    pub scroll: FileScrollConfig,
}

#[derive(Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileBackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_invalid_certs: Option<bool>,
}

impl std::fmt::Debug for FileBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBackendConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_file", &self.password_file)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileScrollConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_file: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub keep_alive: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub accept_invalid_certs: Option<bool>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfig")
            .field("config_path", &self.config_path)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_file", &self.password_file)
            .field("batch_size", &self.batch_size)
            .field("keep_alive", &self.keep_alive)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl EnvConfig {
    /// Read the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let duration = |name: &'static str| -> Result<Option<Duration>, ConfigLoadError> {
            var(name)
                .map(|raw| {
                    parse_duration(&raw).map_err(|err| ConfigLoadError::InvalidValue {
                        key: name,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })
                })
                .transpose()
        };

        let batch_size = var(ENV_BATCH_SIZE)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|err| ConfigLoadError::InvalidValue {
                        key: ENV_BATCH_SIZE,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })
            })
            .transpose()?;

        let accept_invalid_certs = var(ENV_ACCEPT_INVALID_CERTS)
            .map(|raw| {
                parse_bool(&raw).ok_or_else(|| ConfigLoadError::InvalidValue {
                    key: ENV_ACCEPT_INVALID_CERTS,
                    value: raw.clone(),
                    reason: "expected true/false".into(),
                })
            })
            .transpose()?;

        Ok(Self {
            config_path: var(ENV_CONFIG_PATH).map(PathBuf::from),
            url: var(ENV_URL),
            username: var(ENV_USERNAME),
            password: var(ENV_PASSWORD),
            password_file: var(ENV_PASSWORD_FILE).map(PathBuf::from),
            batch_size,
            keep_alive: duration(ENV_KEEP_ALIVE)?,
            connect_timeout: duration(ENV_CONNECT_TIMEOUT)?,
            request_timeout: duration(ENV_REQUEST_TIMEOUT)?,
            accept_invalid_certs,
        })
    }
}
