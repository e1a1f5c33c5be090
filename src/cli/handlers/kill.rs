// EN: src/cli/handlers/kill.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

use super::commons::{self, CliContext};
use crate::models::{CommandSpec, OutputMode, TerminateOptions, TerminateSettings};
use crate::system::spawner;
use crate::system::terminator::{self, TerminationOutcome};

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct KillArgs {
    /// How long to let the command run before terminating it.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    after: u64,
    /// Escalate to SIGKILL if the command ignores SIGTERM.
    #[arg(long)]
    force: bool,
    /// How long to wait for a graceful exit.
    #[arg(long, value_name = "MS")]
    max_wait: Option<u64>,
    /// The program to run and its arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl KillArgs {
    /// Flags win over the configured defaults.
    fn options(&self, settings: &TerminateSettings) -> TerminateOptions {
        let defaults = TerminateOptions::from(settings);
        TerminateOptions {
            force: self.force || defaults.force,
            max_wait: self
                .max_wait
                .map_or(defaults.max_wait, Duration::from_millis),
        }
    }

    /// The child shares our terminal, so nothing has to drain its output.
    fn spec(&self) -> Result<CommandSpec> {
        Ok(commons::build_spec(&self.command, None, Vec::new())?.output(OutputMode::Inherit))
    }
}

/// The main handler for the `kill` command.
pub fn handle(args: Vec<String>, context: &CliContext) -> Result<()> {
    let kill_args = KillArgs::try_parse_from(&args)?;
    let options = kill_args.options(&context.settings()?.terminate);
    let spec = kill_args.spec()?;

    context.runtime()?.block_on(async {
        let mut process = spawner::spawn(&spec)?;
        drop(process.take_stdin());
        println!(
            "Started '{}' (PID: {})",
            spec.display_line().cyan(),
            process.id().map_or_else(|| "?".to_string(), |pid| pid.to_string())
        );
        tokio::time::sleep(Duration::from_millis(kill_args.after)).await;

        match terminator::terminate(&mut process, options).await? {
            TerminationOutcome::Graceful(status) => println!(
                "{} ({})",
                "Stopped gracefully".green(),
                commons::describe_status(&status)
            ),
            TerminationOutcome::Forced => {
                let status = process.wait().await?;
                println!(
                    "{} ({})",
                    "Killed after ignoring SIGTERM".yellow(),
                    commons::describe_status(&status)
                );
            }
            TerminationOutcome::AlreadyExited(status) => println!(
                "{} ({})",
                "Already exited".dimmed(),
                commons::describe_status(&status)
            ),
        }
        Ok::<(), anyhow::Error>(())
    })
}
