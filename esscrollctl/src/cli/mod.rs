//! Command-line surface of `esscrollctl`.

pub mod config;
pub mod search;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use esscroll_config::{ConfigLoad, ConfigLoader, ConfigOverrides, ConfigWarnings};
use tracing::warn;
use zeroize::Zeroizing;

#[derive(Debug, Parser)]
#[command(
    name = "esscrollctl",
    version,
    about = "Page through every match of an Elasticsearch query using the scroll API"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Cluster base URL, e.g. https://localhost:9200
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Basic auth username
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Name of an environment variable holding the basic auth password
    #[arg(long, global = true, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Config file (TOML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Env file to load instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scrolled search and print every hit
    Search(search::SearchArgs),
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

impl Cli {
    /// Hits go to stdout, so `--quiet` also quiets the log on stderr.
    pub fn default_log_directive(&self) -> &'static str {
        match &self.command {
            Command::Search(args) if args.quiet => "warn",
            _ => "info",
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search(args) => search::run(&cli.global, args).await,
        Command::Config { action } => config::run(&cli.global, action),
    }
}

pub(crate) fn load_config(
    global: &GlobalArgs,
    mut overrides: ConfigOverrides,
) -> Result<ConfigLoad> {
    overrides.url = global.url.clone();
    overrides.username = global.username.clone();
    if let Some(var) = &global.password_env {
        let password = std::env::var(var)
            .with_context(|| format!("--password-env names {var}, which is not set"))?;
        if password.is_empty() {
            bail!("--password-env names {var}, which is empty");
        }
        overrides.password = Some(Zeroizing::new(password));
    }

    let mut loader = ConfigLoader::new().with_overrides(overrides);
    if let Some(path) = &global.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &global.env_file {
        loader = loader.with_env_file(path);
    }

    loader.load().context("failed to load configuration")
}

pub(crate) fn log_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }
}
