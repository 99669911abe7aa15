pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::anyhow;
use tracing::debug;
use zeroize::Zeroizing;

use self::error::ConfigLoadError;
use crate::models::{
    BackendConfig, Config, ConfigMetadata, DEFAULT_URL, ScrollDefaults,
    sources::{EnvConfig, FileBackendConfig, FileConfig},
};
use crate::util::parse_duration;
use crate::validation::{self, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 3] =
    ["esscroll.toml", "esscroll.json", "config/esscroll.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Skip `.env` handling entirely.
    pub skip_env_file: bool,
    /// Directory the default config locations are resolved against.
    pub working_dir: Option<PathBuf>,
}

/// Values supplied on the command line; they win over every other source.
#[derive(Default, Clone)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub batch_size: Option<usize>,
    pub keep_alive: Option<Duration>,
}

impl std::fmt::Debug for ConfigOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOverrides")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

/// Merges defaults, config file, `.env`, environment and CLI overrides, in
/// that order of increasing precedence.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
    overrides: ConfigOverrides,
    env: Option<EnvConfig>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn without_env_file(mut self) -> Self {
        self.options.skip_env_file = true;
        self
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.working_dir = Some(dir.into());
        self
    }

    /// Use `env` instead of reading the process environment. No `.env` file
    /// is loaded in this mode.
    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env, env_file_loaded) = match &self.env {
            Some(env) => (env.clone(), false),
            None => {
                let loaded = self.load_env_file()?;
                (EnvConfig::gather()?, loaded)
            }
        };

        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path, env_file_loaded)?;

        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        if self.options.skip_env_file {
            return Ok(false);
        }
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        match result {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (path.clone(), true)
        } else if let Some(path) = &env.config_path {
            (path.clone(), true)
        } else {
            let base = self.options.working_dir.clone().unwrap_or_default();
            match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(|candidate| base.join(candidate))
                .find(|candidate| candidate.exists())
            {
                Some(found) => (found, false),
                None => return Ok((None, None)),
            }
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let file_config = parse_file_config(&path, &contents).map_err(|source| {
            ConfigLoadError::Parse {
                path: path.clone(),
                source,
            }
        })?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();
        let FileConfig {
            backend: file_backend,
            scroll: file_scroll,
        } = file_config.unwrap_or_default();
        let overrides = &self.overrides;
        let defaults = BackendConfig::default();

        let password = self.resolve_password(&env, &file_backend, &mut warnings)?;

        let backend = BackendConfig {
            url: overrides
                .url
                .clone()
                .or(env.url.clone())
                .or(file_backend.url.clone())
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            username: overrides
                .username
                .clone()
                .or(env.username.clone())
                .or(file_backend.username.clone()),
            password,
            connect_timeout: match env.connect_timeout {
                Some(timeout) => timeout,
                None => file_duration(
                    "backend.connect_timeout",
                    &file_backend.connect_timeout,
                )?
                .unwrap_or(defaults.connect_timeout),
            },
            request_timeout: match env.request_timeout {
                Some(timeout) => timeout,
                None => file_duration(
                    "backend.request_timeout",
                    &file_backend.request_timeout,
                )?
                .unwrap_or(defaults.request_timeout),
            },
            accept_invalid_certs: env
                .accept_invalid_certs
                .or(file_backend.accept_invalid_certs)
                .unwrap_or(false),
        };

        let scroll_defaults = ScrollDefaults::default();
        let keep_alive = match overrides.keep_alive.or(env.keep_alive) {
            Some(keep_alive) => keep_alive,
            None => file_duration("scroll.keep_alive", &file_scroll.keep_alive)?
                .unwrap_or(scroll_defaults.keep_alive),
        };
        let scroll = ScrollDefaults {
            batch_size: overrides
                .batch_size
                .or(env.batch_size)
                .or(file_scroll.batch_size)
                .unwrap_or(scroll_defaults.batch_size),
            keep_alive,
        };

        let config = Config {
            backend,
            scroll,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        warnings.extend(validation::apply_guard_rails(&config)?);
        Ok((config, warnings))
    }

    fn resolve_password(
        &self,
        env: &EnvConfig,
        file_backend: &FileBackendConfig,
        warnings: &mut ConfigWarnings,
    ) -> Result<Option<Zeroizing<String>>, ConfigLoadError> {
        if let Some(password) = &self.overrides.password {
            return Ok(Some(password.clone()));
        }
        if let Some(password) = &env.password {
            return Ok(Some(Zeroizing::new(password.clone())));
        }

        for path in [env.password_file.as_ref(), file_backend.password_file.as_ref()]
            .into_iter()
            .flatten()
        {
            if let Some(secret) = read_secret_file(path)? {
                return Ok(Some(secret));
            }
        }

        if let Some(password) = file_backend
            .password
            .as_ref()
            .filter(|value| !value.is_empty())
        {
            warnings.push_with_hint(
                "Password is stored in plain text in the config file",
                "Use backend.password_file or ESSCROLL_PASSWORD_FILE instead",
            );
            return Ok(Some(Zeroizing::new(password.clone())));
        }

        Ok(None)
    }
}

fn parse_file_config(path: &Path, contents: &str) -> anyhow::Result<FileConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(serde_json::from_str(contents)?),
        Some("toml") => Ok(toml::from_str(contents)?),
        _ => toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!("toml error: {toml_err}; json error: {json_err}")
            })
        }),
    }
}

fn file_duration(
    key: &'static str,
    raw: &Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.as_deref()
        .map(|value| {
            parse_duration(value).map_err(|err| ConfigLoadError::InvalidValue {
                key,
                value: value.to_string(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn read_secret_file(path: &Path) -> Result<Option<Zeroizing<String>>, ConfigLoadError> {
    let contents = Zeroizing::new(fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Zeroizing::new(trimmed.to_string())))
    }
}
