// EN: src/cli/handlers/history.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::CliContext;
use crate::system::history;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct HistoryArgs {
    /// The command line to append.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// The main handler for the `history` command.
pub fn handle(args: Vec<String>, context: &CliContext) -> Result<()> {
    let history_args = HistoryArgs::try_parse_from(&args)?;
    let command = history_args.command.join(" ");
    let shell = &context.settings()?.history.shell;

    context
        .runtime()?
        .block_on(history::add_to_history_with_shell(shell, &command))?;
    println!("Added to {} history: {}", shell, command.green());
    Ok(())
}
