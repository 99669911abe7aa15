pub mod sources;

use std::{fmt, path::PathBuf, time::Duration};

use esscroll_core::{
    SearchRequest,
    elasticsearch::{
        DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ElasticsearchOptions,
    },
    request::{DEFAULT_BATCH_SIZE, DEFAULT_KEEP_ALIVE},
};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::util::format_duration;

pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Effective configuration after every source has been merged.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub scroll: ScrollDefaults,
    pub metadata: ConfigMetadata,
}

#[derive(Clone)]
pub struct BackendConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

impl BackendConfig {
    pub fn to_options(&self) -> ElasticsearchOptions {
        let mut options = ElasticsearchOptions::new(self.url.clone())
            .with_timeouts(self.connect_timeout, self.request_timeout);
        options.username = self.username.clone();
        options.password = self.password.clone();
        options.accept_invalid_certs = self.accept_invalid_certs;
        options
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }
}

/// Request defaults applied when a search does not override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollDefaults {
    pub batch_size: usize,
    pub keep_alive: Duration,
}

impl Default for ScrollDefaults {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

impl ScrollDefaults {
    pub fn apply(&self, request: SearchRequest) -> SearchRequest {
        request
            .with_batch_size(self.batch_size)
            .with_keep_alive(self.keep_alive)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

/// Printable view of a [`Config`]; the password never leaves the process.
#[derive(Debug, Serialize)]
pub struct RedactedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    pub env_file_loaded: bool,
    pub backend: RedactedBackend,
    pub scroll: RedactedScroll,
}

#[derive(Debug, Serialize)]
pub struct RedactedBackend {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
    pub connect_timeout: String,
    pub request_timeout: String,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Serialize)]
pub struct RedactedScroll {
    pub batch_size: usize,
    pub keep_alive: String,
}

impl Config {
    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            config_path: self
                .metadata
                .config_path
                .as_ref()
                .map(|path| path.display().to_string()),
            env_file_loaded: self.metadata.env_file_loaded,
            backend: RedactedBackend {
                url: self.backend.url.clone(),
                username: self.backend.username.clone(),
                password: self.backend.password.as_ref().map(|_| "<redacted>"),
                connect_timeout: format_duration(self.backend.connect_timeout),
                request_timeout: format_duration(self.backend.request_timeout),
                accept_invalid_certs: self.backend.accept_invalid_certs,
            },
            scroll: RedactedScroll {
                batch_size: self.scroll.batch_size,
                keep_alive: format_duration(self.scroll.keep_alive),
            },
        }
    }
}
