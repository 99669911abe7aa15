use std::time::Duration;

use esscroll_core::request::MIN_KEEP_ALIVE;
use thiserror::Error;
use url::Url;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be at least {}", format_minimum(.minimum))]
    BelowMinimum {
        field: &'static str,
        minimum: Duration,
    },
    #[error("backend URL '{url}' is not a valid http(s) URL: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("a password is configured without a username")]
    PasswordWithoutUsername,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigWarning> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let backend = &config.backend;

    ensure_positive("batch_size", config.scroll.batch_size > 0)?;
    ensure_positive("keep_alive", !config.scroll.keep_alive.is_zero())?;
    if config.scroll.keep_alive < MIN_KEEP_ALIVE {
        return Err(ConfigGuardRailError::BelowMinimum {
            field: "keep_alive",
            minimum: MIN_KEEP_ALIVE,
        });
    }
    ensure_positive("connect_timeout", !backend.connect_timeout.is_zero())?;
    ensure_positive("request_timeout", !backend.request_timeout.is_zero())?;

    let url = parse_backend_url(&backend.url)?;

    if backend.password.is_some() && backend.username.is_none() {
        return Err(ConfigGuardRailError::PasswordWithoutUsername);
    }

    if backend.has_credentials() && url.scheme() == "http" {
        warnings.push_with_hint(
            "Credentials will be sent over plain http",
            "Use an https:// URL when the cluster is not on a trusted network",
        );
    }

    if backend.accept_invalid_certs {
        warnings.push_with_hint(
            "TLS certificate verification is disabled",
            "Unset ESSCROLL_ACCEPT_INVALID_CERTS once the cluster has a trusted certificate",
        );
    }

    if config.scroll.keep_alive < backend.request_timeout {
        warnings.push_with_hint(
            format!(
                "keep_alive ({}) is shorter than request_timeout ({}); slow batches may outlive their cursor",
                humantime::format_duration(config.scroll.keep_alive),
                humantime::format_duration(backend.request_timeout),
            ),
            "Raise ESSCROLL_KEEP_ALIVE or lower ESSCROLL_REQUEST_TIMEOUT",
        );
    }

    if config.scroll.keep_alive > MAX_SENSIBLE_KEEP_ALIVE {
        warnings.push(format!(
            "keep_alive of {} holds cluster resources for a long time after a crash",
            humantime::format_duration(config.scroll.keep_alive),
        ));
    }

    Ok(warnings)
}

fn format_minimum(minimum: &Duration) -> String {
    humantime::format_duration(*minimum).to_string()
}

const MAX_SENSIBLE_KEEP_ALIVE: Duration = Duration::from_secs(60 * 60);

fn ensure_positive(
    field: &'static str,
    ok: bool,
) -> Result<(), ConfigGuardRailError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigGuardRailError::Zero { field })
    }
}

/// Bare `host:port` is accepted; the backend adds `http://` itself.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigGuardRailError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|err| {
        ConfigGuardRailError::InvalidUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        }
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigGuardRailError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    }
    if url.query().is_some() {
        return Err(ConfigGuardRailError::InvalidUrl {
            url: raw.to_string(),
            reason: "query strings are not supported".into(),
        });
    }
    Ok(url)
}
