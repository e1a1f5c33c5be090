// src/cli/handlers/commons.rs

// Shared helpers for the command handlers.

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::OnceLock;

use crate::core::config_loader::{self, ConfigError};
use crate::core::paths;
use crate::models::{CommandSpec, Settings};
use crate::system::executor;

/// What every handler receives. Settings and the async runtime are only created when a
/// handler first asks for them, so a broken config file does not affect commands that
/// never read it.
#[derive(Debug)]
pub struct CliContext {
    settings: OnceLock<Settings>,
    runtime: OnceLock<tokio::runtime::Runtime>,
    load_settings: fn() -> Result<Settings, ConfigError>,
}

impl Default for CliContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CliContext {
    /// Reads settings from the config file on first use.
    pub fn new() -> Self {
        Self::with_loader(config_loader::load_settings)
    }

    /// Reads settings through `load_settings` on first use.
    pub fn with_loader(load_settings: fn() -> Result<Settings, ConfigError>) -> Self {
        Self {
            settings: OnceLock::new(),
            runtime: OnceLock::new(),
            load_settings,
        }
    }

    /// Uses `settings` as they are.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: OnceLock::from(settings),
            ..Self::new()
        }
    }

    /// The loaded settings.
    pub fn settings(&self) -> Result<&Settings> {
        if let Some(settings) = self.settings.get() {
            return Ok(settings);
        }
        let loaded = (self.load_settings)()?;
        Ok(self.settings.get_or_init(|| loaded))
    }

    /// The multi-thread runtime async work is driven on.
    pub fn runtime(&self) -> Result<&tokio::runtime::Runtime> {
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start the async runtime")?;
        Ok(self.runtime.get_or_init(|| runtime))
    }
}

/// The clap error behind a handler failure, e.g. `--help` or a bad flag.
pub fn usage_error(error: &anyhow::Error) -> Option<&clap::Error> {
    error.downcast_ref::<clap::Error>()
}

/// Parses a `KEY=VALUE` pair for `--env`.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Expands `~` and `$VARS` in a `--dir` value.
pub fn resolve_dir(dir: Option<&str>) -> Result<Option<PathBuf>> {
    dir.map(|d| paths::expand_path(d).map_err(|e| anyhow!(e)))
        .transpose()
}

/// Builds a spec from the positional `program args..` of a handler.
pub fn build_spec(
    command: &[String],
    dir: Option<&str>,
    env: Vec<(String, String)>,
) -> Result<CommandSpec> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| anyhow!("No command specified to run."))?;
    let mut spec = CommandSpec::new(program.as_str()).args(args).envs(env);
    spec.working_dir = resolve_dir(dir)?;
    Ok(spec)
}

/// A short human description of how a process ended.
pub fn describe_status(status: &ExitStatus) -> String {
    match (status.code(), executor::exit_signal(status)) {
        (Some(code), _) => format!("exit code {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => status.to_string(),
    }
}
