use std::io::Write;

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use esscroll_config::{ConfigLoad, ConfigOverrides};

use super::{GlobalArgs, load_config};

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets redacted
    Show {
        #[arg(long, value_enum, default_value_t = ShowFormat::Toml)]
        format: ShowFormat,
    },
    /// Validate the configuration and list warnings
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Toml,
    Json,
}

pub fn run(global: &GlobalArgs, action: ConfigAction) -> Result<()> {
    let load = load_config(global, ConfigOverrides::default())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match action {
        ConfigAction::Show { format } => show(&load, format, &mut out),
        ConfigAction::Check => check(&load, &mut out),
    }
}

fn show(load: &ConfigLoad, format: ShowFormat, out: &mut impl Write) -> Result<()> {
    let redacted = load.config.redacted();
    let rendered = match format {
        ShowFormat::Toml => {
            toml::to_string_pretty(&redacted).context("failed to render configuration")?
        }
        ShowFormat::Json => serde_json::to_string_pretty(&redacted)
            .context("failed to render configuration")?
            + "\n",
    };
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

fn check(load: &ConfigLoad, out: &mut impl Write) -> Result<()> {
    let source = match &load.config.metadata.config_path {
        Some(path) => path.display().to_string(),
        None => "defaults and environment".to_string(),
    };
    writeln!(out, "configuration OK ({source})")?;

    for warning in load.warnings.iter() {
        writeln!(out, "warning: {}", warning.message)?;
        if let Some(hint) = &warning.hint {
            writeln!(out, "  hint: {hint}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use esscroll_config::{
        BackendConfig, Config, ConfigMetadata, ConfigWarnings, ScrollDefaults,
    };
    use zeroize::Zeroizing;

    fn load() -> ConfigLoad {
        let mut warnings = ConfigWarnings::default();
        warnings.push_with_hint("Credentials will be sent over plain http", "use https");
        ConfigLoad {
            config: Config {
                backend: BackendConfig {
                    username: Some("elastic".into()),
                    password: Some(Zeroizing::new("hunter2".into())),
                    ..BackendConfig::default()
                },
                scroll: ScrollDefaults::default(),
                metadata: ConfigMetadata::default(),
            },
            warnings,
        }
    }

    #[test]
    fn show_redacts_password_in_both_formats() {
        for format in [ShowFormat::Toml, ShowFormat::Json] {
            let mut out = Vec::new();
            show(&load(), format, &mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(!text.contains("hunter2"), "{format:?}: {text}");
            assert!(text.contains("<redacted>"));
            assert!(text.contains("elastic"));
        }
    }

    #[test]
    fn check_lists_warnings_with_hints() {
        let mut out = Vec::new();
        check(&load(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("configuration OK (defaults and environment)"));
        assert!(text.contains("warning: Credentials will be sent over plain http\n  hint: use https\n"));
    }
}
