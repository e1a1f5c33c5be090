// src/models.rs

use crate::constants::{DEFAULT_HISTORY_SHELL, DEFAULT_MAX_WAIT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// --- Command Description ---

/// Why a command line could not be split into program and arguments.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// The line was blank.
    #[error("No command specified to run.")]
    Empty,
    /// A quote was opened and never closed.
    #[error("Command could not be parsed (unbalanced quotes?): {0}")]
    Unbalanced(String),
}

/// Where the child's stdout and stderr go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Piped back to us. Someone must read both pipes or the child stalls once they fill.
    #[default]
    Piped,
    /// Shared with our own stdout and stderr.
    Inherit,
    /// Discarded.
    Null,
}

/// Everything needed to start one child process.
///
/// The program and its arguments are always kept apart: the program is handed to the
/// OS as-is, and each argument reaches the child as exactly one `argv` entry.
/// Use [`CommandSpec::shell`] when shell features (pipes, builtins, globbing) are needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// The executable, looked up in `PATH` when it is not a path.
    pub program: String,
    /// Arguments, one `argv` entry each.
    pub args: Vec<String>,
    /// Where the child runs. `None` means the caller's current directory; relative
    /// paths are resolved against the current directory.
    pub working_dir: Option<PathBuf>,
    /// Variables layered over the inherited environment.
    pub env: HashMap<String, String>,
    /// Start the child with an empty environment instead of inheriting ours.
    pub clear_env: bool,
    /// Only honoured by the executor.
    pub timeout: Option<Duration>,
    /// Only honoured by the spawner; the executor and the stream relay always pipe.
    pub output: OutputMode,
}

impl CommandSpec {
    /// A spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Runs `line` through the platform shell (`sh -c` or `cmd /C`).
    pub fn shell(line: impl Into<String>) -> Self {
        if cfg!(target_os = "windows") {
            Self::new("cmd").arg("/C").arg(line)
        } else {
            Self::new("sh").arg("-c").arg(line)
        }
    }

    /// Splits a command line with POSIX shell-word rules into program and arguments.
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let parts = shlex::split(line.trim())
            .ok_or_else(|| CommandParseError::Unbalanced(line.to_string()))?;
        let mut parts = parts.into_iter();
        let program = parts.next().ok_or(CommandParseError::Empty)?;
        Ok(Self::new(program).args(parts))
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Adds several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Do not inherit our environment.
    pub fn env_clear(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Gives up on the command after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Chooses where stdout and stderr go.
    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Resolves the directory the child will run from to an absolute path.
    pub fn resolve_working_dir(&self) -> io::Result<PathBuf> {
        let current = env::current_dir()?;
        let resolved = match &self.working_dir {
            None => current,
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => current.join(dir),
        };
        Ok(dunce::simplified(&resolved).to_path_buf())
    }

    /// A shell-quoted rendering of the command, for logs and user-facing output.
    pub fn display_line(&self) -> String {
        let tokens = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(tokens).unwrap_or_else(|_| format!("{} {:?}", self.program, self.args))
    }
}

/// The buffered result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutput {
    /// Everything the child wrote to stdout.
    pub stdout: String,
    /// Everything the child wrote to stderr.
    pub stderr: String,
    /// Always `0` here; failures are reported as errors.
    pub exit_code: i32,
}

/// How hard to try when stopping a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminateOptions {
    /// Escalate to SIGKILL once `max_wait` has elapsed.
    pub force: bool,
    /// How long to wait for the exit after SIGTERM.
    pub max_wait: Duration,
}

impl Default for TerminateOptions {
    fn default() -> Self {
        Self {
            force: false,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl From<&TerminateSettings> for TerminateOptions {
    fn from(settings: &TerminateSettings) -> Self {
        Self {
            force: settings.force,
            max_wait: Duration::from_millis(settings.max_wait_ms),
        }
    }
}

// --- Configuration File (config.toml) ---

/// Root of `config.toml`. Every section is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `[terminate]`
    pub terminate: TerminateSettings,
    /// `[execute]`
    pub execute: ExecuteSettings,
    /// `[history]`
    pub history: HistorySettings,
    /// `[browser]`
    pub browser: BrowserSettings,
}

/// Defaults for `procpack kill` and for `Ctrl+C` in `procpack stream`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TerminateSettings {
    /// Milliseconds to wait after SIGTERM.
    pub max_wait_ms: u64,
    /// Escalate to SIGKILL after the wait.
    pub force: bool,
}

impl Default for TerminateSettings {
    fn default() -> Self {
        Self {
            max_wait_ms: u64::try_from(DEFAULT_MAX_WAIT.as_millis()).unwrap_or(500),
            force: false,
        }
    }
}

/// Defaults for `procpack exec`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecuteSettings {
    /// Default timeout for `procpack exec` when `--timeout` is not given.
    pub timeout_ms: Option<u64>,
}

/// Settings for `procpack history`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HistorySettings {
    /// The shell whose `history -s` builtin is used.
    pub shell: String,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            shell: DEFAULT_HISTORY_SHELL.to_string(),
        }
    }
}

/// Settings for `procpack open`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSettings {
    /// Replaces the platform opener (`xdg-open`, `open`, `start`).
    pub command: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_splits_quoted_arguments() {
        let spec = CommandSpec::parse(r#"git commit -m "first commit""#).unwrap();
        assert_eq!(spec.program, "git");
        assert_eq!(spec.args, vec!["commit", "-m", "first commit"]);
    }

    #[test]
    fn test_parse_rejects_empty_and_unbalanced_lines() {
        assert_eq!(CommandSpec::parse("   "), Err(CommandParseError::Empty));
        assert!(matches!(
            CommandSpec::parse("echo 'oops"),
            Err(CommandParseError::Unbalanced(_))
        ));
    }

    #[test]
    fn test_resolve_working_dir_defaults_to_current_dir() {
        let spec = CommandSpec::new("ls");
        let resolved = spec.resolve_working_dir().unwrap();
        assert_eq!(resolved, dunce::simplified(&env::current_dir().unwrap()));
    }

    #[test]
    fn test_resolve_working_dir_joins_relative_paths() {
        let spec = CommandSpec::new("ls").current_dir("some/nested");
        let resolved = spec.resolve_working_dir().unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with(Path::new("some").join("nested")));
    }

    #[test]
    fn test_display_line_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("echo").arg("hello world").arg("plain");
        let line = spec.display_line();
        assert_ne!(line, "echo hello world plain");
        assert_eq!(
            shlex::split(&line).unwrap(),
            vec!["echo", "hello world", "plain"]
        );
    }

    #[test]
    fn test_settings_fill_missing_sections_with_defaults() {
        let settings: Settings = toml::from_str("[history]\nshell = \"zsh\"\n").unwrap();
        assert_eq!(settings.history.shell, "zsh");
        assert_eq!(settings.terminate, TerminateSettings::default());
        assert_eq!(settings.browser.command, None);

        let options = TerminateOptions::from(&settings.terminate);
        assert_eq!(options, TerminateOptions::default());
    }

    #[test]
    fn test_settings_reject_unknown_keys() {
        let result: Result<Settings, _> = toml::from_str("[terminate]\nmax_wait = 10\n");
        assert!(result.is_err());
    }
}
