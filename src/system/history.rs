// EN: src/system/history.rs

use crate::constants::DEFAULT_HISTORY_SHELL;
use crate::core::escape::escape_str;
use crate::models::CommandSpec;
use crate::system::executor::{self, ExecutionError};

/// The shell line that appends `command` to the history, quoted so it survives verbatim.
pub fn history_command_line(command: &str) -> String {
    format!("history -s '{}'", escape_str(command))
}

/// Appends `command` to the history of the default shell (bash).
pub async fn add_to_history(command: &str) -> Result<(), ExecutionError> {
    add_to_history_with_shell(DEFAULT_HISTORY_SHELL, command).await
}

/// Runs `<shell> -c "history -s '<command>'"`. The shell must support `history -s`.
pub async fn add_to_history_with_shell(shell: &str, command: &str) -> Result<(), ExecutionError> {
    let spec = CommandSpec::new(shell)
        .arg("-c")
        .arg(history_command_line(command));
    log::debug!("Appending to {} history: {}", shell, command);
    executor::execute(&spec).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::spawner::{self, SpawnError};

    #[test]
    fn test_history_line_quotes_single_quotes() {
        assert_eq!(
            history_command_line("echo 'hi'"),
            "history -s 'echo '\\''hi'\\'''"
        );
    }

    #[test]
    fn test_history_line_keeps_shell_metacharacters_literal() {
        let line = history_command_line("ls $HOME && rm -rf *");
        assert_eq!(line, "history -s 'ls $HOME && rm -rf *'");

        let words = shlex::split(&line).unwrap();
        assert_eq!(words, vec!["history", "-s", "ls $HOME && rm -rf *"]);
    }

    #[tokio::test]
    async fn test_add_to_history_runs_through_bash() {
        if !spawner::is_executable_in_path(DEFAULT_HISTORY_SHELL) {
            return;
        }
        add_to_history("echo 'it''s fine'").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_shell_is_reported() {
        let result = add_to_history_with_shell("procpack-no-such-shell", "ls").await;
        assert!(matches!(
            result,
            Err(ExecutionError::Spawn(SpawnError::ProgramNotFound { .. }))
        ));
    }
}
