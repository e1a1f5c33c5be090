// EN: src/system/spawner.rs

use crate::models::{CommandSpec, OutputMode};
use crate::system::terminator::{ProcessControl, TerminationSignal};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// Why a child could not be started.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The program name was blank.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// The program contains whitespace and is not an existing path.
    #[error(
        "Program '{0}' looks like a full command line. Pass the program alone and its arguments separately."
    )]
    ArgumentsInProgram(String),
    /// Our own working directory could not be read.
    #[error("Could not determine the current working directory: {0}")]
    CurrentDir(#[source] io::Error),
    /// The working directory exists but is not a directory.
    #[error("'{}' is not a directory.", .path.display())]
    NotADirectory { path: PathBuf },
    /// The working directory does not exist.
    #[error("Cannot run process from '{}': no such directory.", .path.display())]
    NoSuchDirectory { path: PathBuf },
    /// The working directory or the program may not be accessed.
    #[error("Insufficient permissions to run '{program}' from '{}'.", .path.display())]
    Forbidden { program: String, path: PathBuf },
    /// The program was not found.
    #[error("Program '{program}' was not found.")]
    ProgramNotFound { program: String },
    /// Any other OS failure, with the raw errno.
    #[error("Command '{program}' could not be started ({syscall}, errno {errno:?}): {source}")]
    Os {
        program: String,
        syscall: &'static str,
        errno: Option<i32>,
        #[source]
        source: io::Error,
    },
}

/// Where a spawned process is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Started and not yet asked to stop.
    Running,
    /// SIGTERM has been delivered and the terminator is waiting for the exit.
    Terminating,
    /// The exit has been observed.
    Exited(ExitStatus),
    /// SIGKILL has been delivered; the exit has not been observed yet.
    Killed,
}

/// A running child process. Stdin is always piped; stdout and stderr may be.
///
/// Dropping the handle does not kill the child. The runtime reaps it in the background
/// once it exits.
#[derive(Debug)]
pub struct LiveProcess {
    child: Child,
    program: String,
    state: ProcessState,
}

impl LiveProcess {
    /// The OS process id, or `None` once the exit has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// The program this process was started from.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Whether SIGTERM was sent and the exit is still pending.
    pub fn is_terminating(&self) -> bool {
        matches!(self.state, ProcessState::Terminating)
    }

    /// Takes the write end of the child's stdin.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Takes the read end of the child's stdout. `None` unless the output is piped.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Takes the read end of the child's stderr. `None` unless the output is piped.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Checks for an exit without blocking.
    pub fn try_status(&mut self) -> io::Result<Option<ExitStatus>> {
        if let ProcessState::Exited(status) = self.state {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        if let Some(status) = status {
            self.state = ProcessState::Exited(status);
        }
        Ok(status)
    }

    /// Waits for the child to exit. Stdin is closed first if it is still held here.
    ///
    /// Cancel-safe: dropping the future leaves the process untouched.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let ProcessState::Exited(status) = self.state {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        log::debug!("Process '{}' exited with {}", self.program, status);
        self.state = ProcessState::Exited(status);
        Ok(status)
    }
}

impl ProcessControl for LiveProcess {
    fn pid(&self) -> Option<u32> {
        self.id()
    }

    fn exit_status(&self) -> Option<ExitStatus> {
        match self.state {
            ProcessState::Exited(status) => Some(status),
            _ => None,
        }
    }

    #[cfg(unix)]
    fn send(&mut self, signal: TerminationSignal) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = self.child.id().ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "process has already been reaped")
        })?;
        let raw_pid = i32::try_from(pid).map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
        let unix_signal = match signal {
            TerminationSignal::Graceful => Signal::SIGTERM,
            TerminationSignal::Forced => Signal::SIGKILL,
        };

        match kill(Pid::from_raw(raw_pid), unix_signal) {
            // Already dead but not reaped yet: the exit will be observed shortly.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn send(&mut self, _signal: TerminationSignal) -> io::Result<()> {
        // There is no catchable termination signal here; both levels end the process.
        self.child.start_kill()
    }

    fn closed(&mut self) -> impl Future<Output = io::Result<ExitStatus>> + Send {
        self.wait()
    }

    fn on_transition(&mut self, state: ProcessState) {
        if !matches!(self.state, ProcessState::Exited(_)) {
            self.state = state;
        }
    }
}

/// Starts `spec` as a child process and returns immediately.
///
/// Stdin is piped; stdout and stderr follow `spec.output`. Must be called from within a
/// tokio runtime.
///
/// # Errors
/// Spawn failures are classified: a working directory that is a file, that does not
/// exist or that cannot be entered maps to `NotADirectory`, `NoSuchDirectory` or
/// `Forbidden`; anything unrecognized is returned as `Os` with the raw errno.
pub fn spawn(spec: &CommandSpec) -> Result<LiveProcess, SpawnError> {
    spawn_with_output(spec, spec.output)
}

/// Like [`spawn`], but with `output` instead of `spec.output`.
pub(crate) fn spawn_with_output(
    spec: &CommandSpec,
    output: OutputMode,
) -> Result<LiveProcess, SpawnError> {
    if spec.program.trim().is_empty() {
        return Err(SpawnError::EmptyCommand);
    }
    if spec.program.chars().any(char::is_whitespace) && !Path::new(&spec.program).exists() {
        return Err(SpawnError::ArgumentsInProgram(spec.program.clone()));
    }

    let cwd = spec.resolve_working_dir().map_err(SpawnError::CurrentDir)?;
    log::debug!(
        "Spawning '{}' in '{}'",
        spec.display_line(),
        cwd.display()
    );

    let child = match build_command(&spec.program, &spec.args, spec, &cwd, output).spawn() {
        Ok(child) => child,
        // Built-ins like `echo` only exist inside cmd.exe.
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") && cwd.is_dir() => {
            log::debug!("Program '{}' not found. Retrying with cmd /C.", spec.program);
            let mut shell_args = vec!["/C".to_string(), spec.program.clone()];
            shell_args.extend(spec.args.iter().cloned());
            build_command("cmd", &shell_args, spec, &cwd, output)
                .spawn()
                .map_err(|e| classify_spawn_error(e, &spec.program, &cwd))?
        }
        Err(e) => return Err(classify_spawn_error(e, &spec.program, &cwd)),
    };

    log::debug!("Spawned '{}' (PID: {:?})", spec.program, child.id());
    Ok(LiveProcess {
        child,
        program: spec.program.clone(),
        state: ProcessState::Running,
    })
}

/// Whether `executable_name` exists in one of the `PATH` directories.
pub fn is_executable_in_path(executable_name: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|path_var| {
        std::env::split_paths(&path_var).any(|dir| dir.join(executable_name).is_file())
    })
}

fn build_command(
    program: &str,
    args: &[String],
    spec: &CommandSpec,
    cwd: &Path,
    output: OutputMode,
) -> Command {
    let stdio = || match output {
        OutputMode::Piped => Stdio::piped(),
        OutputMode::Inherit => Stdio::inherit(),
        OutputMode::Null => Stdio::null(),
    };
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(stdio())
        .stderr(stdio());
    if spec.clear_env {
        command.env_clear();
    }
    command.envs(&spec.env);
    command
}

fn classify_spawn_error(error: io::Error, program: &str, cwd: &Path) -> SpawnError {
    log::trace!("Spawn of '{}' failed: {:?}", program, error);
    match error.kind() {
        ErrorKind::NotADirectory => SpawnError::NotADirectory {
            path: cwd.to_path_buf(),
        },
        // ENOENT is reported both for a missing cwd and a missing program.
        ErrorKind::NotFound if !cwd.exists() => SpawnError::NoSuchDirectory {
            path: cwd.to_path_buf(),
        },
        ErrorKind::NotFound => SpawnError::ProgramNotFound {
            program: program.to_string(),
        },
        ErrorKind::PermissionDenied => SpawnError::Forbidden {
            program: program.to_string(),
            path: cwd.to_path_buf(),
        },
        _ => SpawnError::Os {
            program: program.to_string(),
            syscall: "spawn",
            errno: error.raw_os_error(),
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_spawn_returns_live_handle_with_piped_output() {
        let spec = CommandSpec::new("echo").arg("hi");
        let mut process = spawn(&spec).unwrap();
        assert!(process.id().is_some());
        assert_eq!(process.state(), ProcessState::Running);

        let mut stdout = process.take_stdout().unwrap();
        let mut output = String::new();
        stdout.read_to_string(&mut output).await.unwrap();

        let status = process.wait().await.unwrap();
        assert!(status.success());
        assert_eq!(output.trim_end(), "hi");
        assert_eq!(process.state(), ProcessState::Exited(status));
        assert_eq!(process.try_status().unwrap(), Some(status));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_does_not_wait_for_exit() {
        let start = Instant::now();
        let mut process = spawn(&CommandSpec::new("sleep").arg("5")).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(process.try_status().unwrap(), None);
        assert!(!process.is_terminating());

        process.send(TerminationSignal::Forced).unwrap();
        let status = process.wait().await.unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let result = spawn(&CommandSpec::new("  "));
        assert!(matches!(result, Err(SpawnError::EmptyCommand)));
    }

    #[test]
    fn test_command_line_as_program_is_rejected() {
        let result = spawn(&CommandSpec::new("git commit"));
        assert!(matches!(result, Err(SpawnError::ArgumentsInProgram(p)) if p == "git commit"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let result = spawn(&CommandSpec::new("echo").current_dir(&missing));
        assert!(matches!(result, Err(SpawnError::NoSuchDirectory { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_as_directory_is_classified() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = spawn(&CommandSpec::new("echo").current_dir(file.path()));
        assert!(matches!(result, Err(SpawnError::NotADirectory { .. })));
    }

    #[tokio::test]
    async fn test_missing_program_is_classified() {
        let result = spawn(&CommandSpec::new("procpack-no-such-program-xyz"));
        assert!(matches!(
            result,
            Err(SpawnError::ProgramNotFound { program }) if program == "procpack-no-such-program-xyz"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unpiped_output_never_blocks_the_child() {
        // --- Setup ---
        let chatty = CommandSpec::shell("head -c 200000 /dev/zero; head -c 200000 /dev/zero >&2");
        let quiet = CommandSpec::shell("echo to-terminal");

        for (spec, mode) in [(chatty, OutputMode::Null), (quiet, OutputMode::Inherit)] {
            // --- Execute ---
            let mut process = spawn(&spec.output(mode)).unwrap();
            let status = tokio::time::timeout(Duration::from_secs(5), process.wait())
                .await
                .unwrap()
                .unwrap();

            // --- Assert ---
            assert!(status.success(), "{:?}", mode);
            assert!(process.take_stdout().is_none());
            assert!(process.take_stderr().is_none());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_environment_is_layered_or_cleared() {
        // --- Setup ---
        let layered = CommandSpec::new("/usr/bin/env").env("PROCPACK_TEST_VAR", "layered");
        let cleared = layered.clone().env_clear();

        // --- Execute ---
        let mut outputs = Vec::new();
        for spec in [layered, cleared] {
            let mut process = spawn(&spec).unwrap();
            let mut stdout = process.take_stdout().unwrap();
            let mut text = String::new();
            stdout.read_to_string(&mut text).await.unwrap();
            process.wait().await.unwrap();
            outputs.push(text);
        }

        // --- Assert ---
        // The test harness always runs with a non-empty environment.
        assert!(outputs[0].lines().any(|l| l == "PROCPACK_TEST_VAR=layered"));
        assert!(outputs[0].lines().count() > 1);
        assert_eq!(outputs[1], "PROCPACK_TEST_VAR=layered\n");
    }
}
