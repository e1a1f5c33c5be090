// EN: src/bin/procpack.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use procpack::{
    cli::{
        Cli,
        handlers::{
            self,
            commons::{self, CliContext},
        },
    },
    system::{executor::ExecutionError, stream::StreamError},
};

// --- Command Definition and Registry ---

/// A command, its aliases, and its handler. All handlers share one signature.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &CliContext) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "escape",
        aliases: &[],
        handler: handlers::escape::handle,
    },
    CommandDefinition {
        name: "exec",
        aliases: &["run"],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "history",
        aliases: &[],
        handler: handlers::history::handle,
    },
    CommandDefinition {
        name: "kill",
        aliases: &[],
        handler: handlers::kill::handle,
    },
    CommandDefinition {
        name: "open",
        aliases: &["browse"],
        handler: handlers::open::handle,
    },
    CommandDefinition {
        name: "stream",
        aliases: &[],
        handler: handlers::stream::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to the handler and reports errors in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        // `--help` and bad flags print clap's own message with clap's exit code.
        if let Some(usage) = commons::usage_error(&e) {
            usage.exit();
        }
        // A failed child has already printed its own output: mirror its exit code.
        if let Some(code) = child_exit_code(&e) {
            std::process::exit(code);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn child_exit_code(error: &anyhow::Error) -> Option<i32> {
    if let Some(exec_err) = error.downcast_ref::<ExecutionError>() {
        return exec_err.exit_code();
    }
    match error.downcast_ref::<StreamError>() {
        Some(StreamError::NonZeroExit { code, .. }) => *code,
        _ => None,
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some((name, args)) = cli.args.split_first() else {
        Cli::command().print_help()?;
        return Ok(());
    };
    let command = find_command(name).ok_or_else(|| {
        anyhow!(
            "Unknown command '{}'. Run `procpack --help` to see the available commands.",
            name
        )
    })?;

    let context = CliContext::new();
    (command.handler)(args.to_vec(), &context)
}
