// EN: src/system/executor.rs

use crate::constants::{OUTPUT_DRAIN_WINDOW, TIMEOUT_GRACE};
use crate::models::{CommandSpec, ExecutionOutput, OutputMode, TerminateOptions};
use crate::system::spawner::{self, SpawnError};
use crate::system::terminator;
use scopeguard::ScopeGuard;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Why a command did not run to a successful completion.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The working directory exists but is not a directory.
    #[error("'{}' is not a directory.", .path.display())]
    NotADirectory { path: PathBuf },
    /// The working directory does not exist.
    #[error("Cannot run process from '{}': no such directory.", .path.display())]
    NoSuchDirectory { path: PathBuf },
    /// The working directory or the program may not be accessed.
    #[error(
        "Insufficient permissions to run '{program}' from '{}' (you might need to use chown/chmod).",
        .path.display()
    )]
    Forbidden { program: String, path: PathBuf },
    /// Any other spawn failure.
    #[error(transparent)]
    Spawn(SpawnError),
    /// The child exited unsuccessfully. Carries everything it wrote.
    #[error("Command '{program}' {}.", describe_exit(.code, .signal))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        signal: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The timeout elapsed and the child was terminated. Carries the output so far.
    #[error("Command '{program}' did not finish within {timeout:?} and was terminated.")]
    TimedOut {
        program: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
    /// The child succeeded but its output is not UTF-8.
    #[error("Command '{program}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        program: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// Waiting for the child or reading its output failed.
    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecutionError {
    /// The child's exit code, when the failure is a non-zero exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<SpawnError> for ExecutionError {
    fn from(error: SpawnError) -> Self {
        match error {
            SpawnError::NotADirectory { path } => Self::NotADirectory { path },
            SpawnError::NoSuchDirectory { path } => Self::NoSuchDirectory { path },
            SpawnError::Forbidden { program, path } => Self::Forbidden { program, path },
            other => Self::Spawn(other),
        }
    }
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (code, signal) {
        (Some(code), _) => format!("exited with a non-zero error code ({})", code),
        (None, Some(signal)) => format!("was killed by signal {}", signal),
        (None, None) => "terminated abnormally".to_string(),
    }
}

#[cfg(unix)]
pub(crate) fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub(crate) fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Runs a command to completion and returns its buffered output.
///
/// Stdin is closed immediately; stdout and stderr are drained on background tasks so a
/// chatty child can never block on a full pipe. Only suitable for bounded output.
///
/// If `spec.timeout` elapses, the child is terminated (SIGTERM, then SIGKILL after
/// [`TIMEOUT_GRACE`]) and [`ExecutionError::TimedOut`] is returned with whatever output
/// was captured until then.
pub async fn execute(spec: &CommandSpec) -> Result<ExecutionOutput, ExecutionError> {
    let mut process = spawner::spawn_with_output(spec, OutputMode::Piped)?;
    let program = spec.program.clone();
    drop(process.take_stdin());

    // Readers are aborted on every early return below.
    let readers = scopeguard::guard(
        (
            Capture::start(process.take_stdout()),
            Capture::start(process.take_stderr()),
        ),
        |(stdout, stderr)| {
            stdout.abort();
            stderr.abort();
        },
    );

    let status = match spec.timeout {
        None => process.wait().await,
        Some(limit) => match tokio::time::timeout(limit, process.wait()).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Command '{}' exceeded its {:?} timeout. Terminating it.",
                    program,
                    limit
                );
                let options = TerminateOptions {
                    force: true,
                    max_wait: TIMEOUT_GRACE,
                };
                if let Err(e) = terminator::terminate(&mut process, options).await {
                    log::warn!("Failed to terminate timed-out command '{}': {}", program, e);
                }

                let (stdout, stderr) = ScopeGuard::into_inner(readers);
                let stdout = stdout.finish_within(OUTPUT_DRAIN_WINDOW).await;
                let stderr = stderr.finish_within(OUTPUT_DRAIN_WINDOW).await;
                return Err(ExecutionError::TimedOut {
                    program,
                    timeout: limit,
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                });
            }
        },
    }
    .map_err(|source| ExecutionError::Io {
        program: program.clone(),
        source,
    })?;

    let (stdout, stderr) = ScopeGuard::into_inner(readers);
    let io_error = |source| ExecutionError::Io {
        program: program.clone(),
        source,
    };
    let stdout = stdout.finish().await.map_err(io_error)?;
    let stderr = stderr.finish().await.map_err(io_error)?;

    if !status.success() {
        log::debug!("Command '{}' failed with {}", program, status);
        return Err(ExecutionError::NonZeroExit {
            code: status.code(),
            signal: exit_signal(&status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            program,
        });
    }

    let to_text = |bytes: Vec<u8>| {
        String::from_utf8(bytes).map_err(|source| ExecutionError::InvalidUtf8Output {
            program: program.clone(),
            source,
        })
    };
    Ok(ExecutionOutput {
        stdout: to_text(stdout)?,
        stderr: to_text(stderr)?,
        exit_code: status.code().unwrap_or_default(),
    })
}

/// Runs a full command line through the platform shell, like typing it in a terminal.
pub async fn execute_line(
    command_line: &str,
    dir: Option<&Path>,
) -> Result<ExecutionOutput, ExecutionError> {
    let mut spec = CommandSpec::shell(command_line.trim());
    spec.working_dir = dir.map(Path::to_path_buf);
    execute(&spec).await
}

/// Output collected on a background task. The buffer stays readable even if the task
/// has to be abandoned.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<io::Result<()>>,
}

impl Capture {
    fn start<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return Ok(());
            };
            let mut chunk = [0u8; 8192];
            loop {
                let read = stream.read(&mut chunk).await?;
                if read == 0 {
                    return Ok(());
                }
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(chunk.get(..read).unwrap_or_default());
            }
        });
        Self { buffer, task }
    }

    /// Waits for the stream to close.
    async fn finish(self) -> io::Result<Vec<u8>> {
        let Self { buffer, task } = self;
        task.await.map_err(io::Error::other)??;
        Ok(take_buffer(&buffer))
    }

    /// Waits at most `window` for the stream to close, then returns what arrived.
    async fn finish_within(self, window: Duration) -> Vec<u8> {
        let Self { buffer, mut task } = self;
        if tokio::time::timeout(window, &mut task).await.is_err() {
            log::debug!("Output stream still open after {:?}; abandoning it.", window);
            task.abort();
        }
        take_buffer(&buffer)
    }

    fn abort(&self) {
        self.task.abort();
    }
}

fn take_buffer(buffer: &Mutex<Vec<u8>>) -> Vec<u8> {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
}
