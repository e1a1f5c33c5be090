// EN: src/system/stream.rs

//! Live relay of a child's stdout.
//!
//! [`spawn_and_stream`] hands back a [`ProcessStream`] as soon as the child exists. A
//! supervisor task owns the process from then on: it waits for the exit, serves
//! termination requests from the stream handle, and reports the exit through a oneshot
//! channel that the consumer reads with [`ProcessStream::finished`].

use crate::models::{CommandSpec, OutputMode, TerminateOptions};
use crate::system::executor::exit_signal;
use crate::system::spawner::{self, LiveProcess, SpawnError};
use crate::system::terminator::{self, TerminateError, TerminationOutcome};
use std::io;
use std::pin::Pin;
use std::process::ExitStatus;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::{mpsc, oneshot, watch};

const CONTROL_QUEUE_CAPACITY: usize = 4;

/// Errors reported by a [`ProcessStream`].
#[derive(Error, Debug)]
pub enum StreamError {
    /// The child exited with a non-zero code or was killed by a signal.
    #[error("Command '{program}' exited unsuccessfully (code {code:?}, signal {signal:?}).")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// Waiting for the child failed.
    #[error("Error while waiting for '{program}' to exit: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
    /// A termination request failed.
    #[error(transparent)]
    Terminate(#[from] TerminateError),
    /// `finished` was already called on this stream.
    #[error("The exit of this process has already been observed.")]
    AlreadyObserved,
    #[error("The process supervisor stopped before reporting an exit.")]
    SupervisorGone,
}

type ExitReport = Result<ExitStatus, StreamError>;

enum Control {
    Terminate {
        options: TerminateOptions,
        reply: oneshot::Sender<Result<TerminationOutcome, TerminateError>>,
    },
}

/// The consumer side of a relayed process. Reading from it yields the child's stdout.
///
/// Dropping the stream does not kill the child; the supervisor keeps reaping it.
#[derive(Debug)]
pub struct ProcessStream {
    pid: Option<u32>,
    program: String,
    stdout: Option<ChildStdout>,
    exit: Option<oneshot::Receiver<ExitReport>>,
    status: watch::Receiver<Option<ExitStatus>>,
    control: mpsc::Sender<Control>,
}

/// Starts `spec` and returns without waiting for it. Requires a tokio runtime.
///
/// Stdin is closed, stderr is forwarded to our own stderr, and stdout is exposed through
/// the returned stream. Spawn failures are returned synchronously; everything after
/// that is reported by [`ProcessStream::finished`].
pub fn spawn_and_stream(spec: &CommandSpec) -> Result<ProcessStream, SpawnError> {
    let mut process = spawner::spawn_with_output(spec, OutputMode::Piped)?;
    drop(process.take_stdin());
    if let Some(stderr) = process.take_stderr() {
        tokio::spawn(forward_stderr(stderr, spec.program.clone()));
    }

    let (exit_tx, exit_rx) = oneshot::channel();
    let (status_tx, status_rx) = watch::channel(None);
    let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);

    let stream = ProcessStream {
        pid: process.id(),
        program: spec.program.clone(),
        stdout: process.take_stdout(),
        exit: Some(exit_rx),
        status: status_rx,
        control: control_tx,
    };
    tokio::spawn(supervise(process, control_rx, status_tx, exit_tx));
    Ok(stream)
}

impl ProcessStream {
    /// The child's pid, if it was still known at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The program that was spawned.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Waits for the child to exit.
    ///
    /// A non-zero exit is reported as [`StreamError::NonZeroExit`]. The exit can be
    /// observed once; later calls return [`StreamError::AlreadyObserved`].
    pub async fn finished(&mut self) -> Result<ExitStatus, StreamError> {
        let exit = self.exit.take().ok_or(StreamError::AlreadyObserved)?;
        exit.await.map_err(|_| StreamError::SupervisorGone)?
    }

    /// Asks the supervisor to terminate the child. See [`terminator::terminate`].
    pub async fn terminate(
        &self,
        options: TerminateOptions,
    ) -> Result<TerminationOutcome, StreamError> {
        if let Some(status) = *self.status.borrow() {
            return Ok(TerminationOutcome::AlreadyExited(status));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = Control::Terminate {
            options,
            reply: reply_tx,
        };
        let reply = match self.control.send(request).await {
            Ok(()) => reply_rx.await.ok(),
            Err(_) => None,
        };

        match reply {
            Some(outcome) => Ok(outcome?),
            // The supervisor only stops after publishing the exit status.
            None => (*self.status.borrow())
                .map(TerminationOutcome::AlreadyExited)
                .ok_or(StreamError::SupervisorGone),
        }
    }
}

impl AsyncRead for ProcessStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.stdout.as_mut() {
            Some(stdout) => Pin::new(stdout).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

async fn supervise(
    mut process: LiveProcess,
    mut requests: mpsc::Receiver<Control>,
    status: watch::Sender<Option<ExitStatus>>,
    exit: oneshot::Sender<ExitReport>,
) {
    let program = process.program().to_string();
    let result = loop {
        tokio::select! {
            result = process.wait() => break result,
            Some(request) = requests.recv() => match request {
                Control::Terminate { options, reply } => {
                    let outcome = terminator::terminate(&mut process, options).await;
                    if reply.send(outcome).is_err() {
                        log::debug!("Termination requester for '{}' went away", program);
                    }
                }
            },
        }
    };

    let report = match result {
        Ok(exit_status) => {
            status.send_replace(Some(exit_status));
            if exit_status.success() {
                Ok(exit_status)
            } else {
                Err(StreamError::NonZeroExit {
                    program: program.clone(),
                    code: exit_status.code(),
                    signal: exit_signal(&exit_status),
                })
            }
        }
        Err(source) => Err(StreamError::Io {
            program: program.clone(),
            source,
        }),
    };
    drop(requests);

    if exit.send(report).is_err() {
        log::debug!("Nobody is listening for the exit of '{}'", program);
    }
}

async fn forward_stderr(mut stderr: ChildStderr, program: String) {
    let mut sink = tokio::io::stderr();
    if let Err(e) = tokio::io::copy(&mut stderr, &mut sink).await {
        log::debug!("Stopped forwarding stderr of '{}': {}", program, e);
    }
}
