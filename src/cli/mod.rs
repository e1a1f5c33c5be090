use clap::Parser;

pub mod handlers;

const COMMANDS_HELP: &str = "\
Commands:
  exec [--dir D] [--timeout MS] [--env K=V].. [--shell] <program> [args..]
                        Run a command and print its captured output
  stream [--dir D] [--env K=V].. <program> [args..]
                        Run a command and relay its output as it arrives
  kill [--after MS] [--force] [--max-wait MS] <program> [args..]
                        Start a command, then terminate it
  escape [--json] [--quote] <value>
                        Escape a value for use inside single quotes
  open <url>            Open a URL in the browser (alias: browse)
  history <command..>   Append a command to the shell history

Configuration is read from $PROCPACK_CONFIG or <config dir>/procpack/config.toml.
Set RUST_LOG=procpack=debug for diagnostics.";

/// procpack: spawn, execute, stream, escape and terminate child processes.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = COMMANDS_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to run followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
