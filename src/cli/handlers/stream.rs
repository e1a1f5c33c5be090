// EN: src/cli/handlers/stream.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::{self, CliContext};
use crate::models::TerminateOptions;
use crate::system::stream::{self, ProcessStream};

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct StreamArgs {
    /// Working directory for the command. Supports `~` and `$VARS`.
    #[arg(long, short)]
    dir: Option<String>,
    /// Extra environment variables, layered over ours.
    #[arg(long = "env", short = 'e', value_name = "KEY=VALUE", value_parser = commons::parse_env_pair)]
    env: Vec<(String, String)>,
    /// The program to run and its arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// The main handler for the `stream` command.
///
/// Copies the child's stdout to ours as it arrives. `Ctrl+C` terminates the child
/// using the configured terminate settings.
pub fn handle(args: Vec<String>, context: &CliContext) -> Result<()> {
    let stream_args = StreamArgs::try_parse_from(&args)?;
    let spec = commons::build_spec(
        &stream_args.command,
        stream_args.dir.as_deref(),
        stream_args.env,
    )?;
    let options = TerminateOptions::from(&context.settings()?.terminate);

    context.runtime()?.block_on(async {
        let mut child = stream::spawn_and_stream(&spec)?;
        log::debug!("Streaming '{}' (PID: {:?})", spec.display_line(), child.pid());

        tokio::select! {
            copied = relay(&mut child) => {
                copied?;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Interrupted. Stopping the command...".yellow());
                let outcome = child.terminate(options).await?;
                log::debug!("Termination outcome: {:?}", outcome);
            }
        }

        let status = child.finished().await?;
        log::debug!("'{}' finished with {}", spec.program, commons::describe_status(&status));
        Ok::<(), anyhow::Error>(())
    })
}

async fn relay(child: &mut ProcessStream) -> std::io::Result<u64> {
    let mut stdout = tokio::io::stdout();
    let copied = tokio::io::copy(child, &mut stdout).await?;
    tokio::io::AsyncWriteExt::flush(&mut stdout).await?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_dir_env_and_command() {
        let stream_args =
            StreamArgs::try_parse_from(["--dir", "/tmp", "-e", "X=1", "tail", "-f", "log"]).unwrap();
        assert_eq!(stream_args.dir.as_deref(), Some("/tmp"));
        assert_eq!(stream_args.env, vec![("X".to_string(), "1".to_string())]);
        assert_eq!(stream_args.command, vec!["tail", "-f", "log"]);
    }

    #[test]
    fn test_rejects_malformed_env() {
        assert!(StreamArgs::try_parse_from(["-e", "oops", "ls"]).is_err());
    }
}
