// EN: src/cli/handlers/exec.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

use super::commons::{self, CliContext};
use crate::models::CommandSpec;
use crate::system::executor::{self, ExecutionError};

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ExecArgs {
    /// Working directory for the command. Supports `~` and `$VARS`.
    #[arg(long, short)]
    dir: Option<String>,
    /// Terminate the command after this many milliseconds.
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,
    /// Extra environment variables, layered over ours.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = commons::parse_env_pair)]
    env: Vec<(String, String)>,
    /// Run the whole command line through the platform shell.
    #[arg(long)]
    shell: bool,
    /// The program to run and its arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl ExecArgs {
    fn into_spec(self, default_timeout_ms: Option<u64>) -> Result<CommandSpec> {
        let mut spec = if self.shell {
            let mut spec = CommandSpec::shell(self.command.join(" ")).envs(self.env);
            spec.working_dir = commons::resolve_dir(self.dir.as_deref())?;
            spec
        } else {
            commons::build_spec(&self.command, self.dir.as_deref(), self.env)?
        };
        if let Some(ms) = self.timeout.or(default_timeout_ms) {
            spec = spec.timeout(Duration::from_millis(ms));
        }
        Ok(spec)
    }
}

/// The main handler for the `exec` command.
pub fn handle(args: Vec<String>, context: &CliContext) -> Result<()> {
    let exec_args = ExecArgs::try_parse_from(&args)?;
    let spec = exec_args.into_spec(context.settings()?.execute.timeout_ms)?;
    log::info!("> {}", spec.display_line());

    match context.runtime()?.block_on(executor::execute(&spec)) {
        Ok(output) => {
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            Ok(())
        }
        Err(e) => {
            match &e {
                ExecutionError::NonZeroExit { stdout, stderr, .. } => {
                    print!("{}", stdout);
                    eprint!("{}", stderr);
                }
                ExecutionError::TimedOut { stdout, stderr, .. } => {
                    print!("{}", stdout);
                    eprint!("{}", stderr);
                    eprintln!("{}", "Command timed out.".yellow());
                }
                _ => {}
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ExecArgs {
        ExecArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_flags_after_program_belong_to_the_program() {
        let exec_args = parse(&["--timeout", "100", "ls", "-la", "--color"]);
        assert_eq!(exec_args.timeout, Some(100));
        assert_eq!(exec_args.command, vec!["ls", "-la", "--color"]);
    }

    #[test]
    fn test_program_is_required() {
        assert!(ExecArgs::try_parse_from(["--shell"]).is_err());
    }

    #[test]
    fn test_into_spec_applies_default_timeout_and_env() {
        let spec = parse(&["-e", "A=1", "echo", "hi"])
            .into_spec(Some(2_000))
            .unwrap();
        assert_eq!(spec.program, "echo");
        assert_eq!(spec.args, vec!["hi"]);
        assert_eq!(spec.timeout, Some(Duration::from_millis(2_000)));
        assert_eq!(spec.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_explicit_timeout_beats_the_configured_one() {
        let spec = parse(&["--timeout", "5", "echo"]).into_spec(Some(2_000)).unwrap();
        assert_eq!(spec.timeout, Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_shell_mode_joins_the_command_line() {
        let spec = parse(&["--shell", "echo", "a", "|", "wc", "-c"])
            .into_spec(None)
            .unwrap();
        assert_eq!(spec, CommandSpec::shell("echo a | wc -c"));
    }
}
