//! Configuration loading for esscroll.
//!
//! Sources are merged in increasing precedence: built-in defaults, a TOML or
//! JSON config file, `.env`, the `ESSCROLL_*` environment, and finally CLI
//! overrides. The merged [`Config`] passes through guard rails that reject
//! unusable values and collect soft [`ConfigWarnings`].

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoader, ConfigLoaderOptions, ConfigOverrides,
    error::ConfigLoadError,
};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    BackendConfig, Config, ConfigMetadata, RedactedConfig, ScrollDefaults,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
