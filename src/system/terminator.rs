// EN: src/system/terminator.rs

//! Process termination with graceful/forced semantics.
//!
//! A termination request is a race between the child closing on its own after SIGTERM
//! and a single `max_wait` timer. Both sides live in one `tokio::select!`, so whichever
//! finishes first decides the outcome and the other is dropped on the spot: the timer
//! can never fire after a close, and a close caused by our own SIGKILL is never observed
//! by the call that sent it.
//!
//! For posterity, the signals involved:
//! - SIGTERM (like `kill`): can be caught, allows a graceful shutdown.
//! - SIGKILL (like `kill -9`): cannot be caught or ignored.

use crate::models::TerminateOptions;
use crate::system::spawner::ProcessState;
use std::future::Future;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// The two escalation levels of a termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM.
    Graceful,
    /// SIGKILL.
    Forced,
}

/// The minimal capability set the terminator needs from a process handle.
pub trait ProcessControl {
    /// `None` once the process has been reaped.
    fn pid(&self) -> Option<u32>;

    /// The exit status, if the exit has already been observed.
    fn exit_status(&self) -> Option<ExitStatus>;

    fn send(&mut self, signal: TerminationSignal) -> io::Result<()>;

    /// Resolves when the process closes. Must be cancel-safe.
    fn closed(&mut self) -> impl Future<Output = io::Result<ExitStatus>> + Send;

    /// Called on every state change the terminator drives.
    fn on_transition(&mut self, _state: ProcessState) {}
}

/// How a successful termination came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The process closed on its own after SIGTERM.
    Graceful(ExitStatus),
    /// SIGKILL was delivered. The exit itself is left for the owner to observe.
    Forced,
    /// Nothing to do: the exit had already been observed.
    AlreadyExited(ExitStatus),
}

/// Why a termination request failed.
#[derive(Error, Debug)]
pub enum TerminateError {
    /// The handle has no pid to signal.
    #[error("The specified value is not a valid child process handle.")]
    InvalidHandle,
    /// The process outlived `max_wait` and `force` was not set.
    #[error(
        "Process {pid} could not be killed gracefully within {waited:?}. It can be killed by retrying with `force` enabled."
    )]
    CouldNotKill { pid: u32, waited: Duration },
    /// The signal could not be sent.
    #[error("Failed to deliver {signal:?} termination to process {pid}: {source}")]
    Signal {
        pid: u32,
        signal: TerminationSignal,
        #[source]
        source: io::Error,
    },
    /// Waiting for the exit failed.
    #[error("Error while waiting for process {pid} to close: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Asks `process` to stop, escalating to SIGKILL after `options.max_wait` when
/// `options.force` is set.
///
/// # Errors
/// - [`TerminateError::InvalidHandle`] if the handle has neither a pid nor a known exit
///   status. No signal is sent in that case.
/// - [`TerminateError::CouldNotKill`] if the process is still running after `max_wait`
///   and `force` is off. The process is left running.
pub async fn terminate<P: ProcessControl>(
    process: &mut P,
    options: TerminateOptions,
) -> Result<TerminationOutcome, TerminateError> {
    if let Some(status) = process.exit_status() {
        log::debug!("Process already exited with {}; nothing to terminate.", status);
        return Ok(TerminationOutcome::AlreadyExited(status));
    }
    let pid = process.pid().ok_or(TerminateError::InvalidHandle)?;

    process
        .send(TerminationSignal::Graceful)
        .map_err(|source| TerminateError::Signal {
            pid,
            signal: TerminationSignal::Graceful,
            source,
        })?;
    process.on_transition(ProcessState::Terminating);
    log::debug!(
        "Sent SIGTERM to process {} (waiting up to {:?}, force: {})",
        pid,
        options.max_wait,
        options.force
    );

    let closed = tokio::select! {
        result = process.closed() => Some(result),
        _ = tokio::time::sleep(options.max_wait) => None,
    };

    match closed {
        Some(Ok(status)) => {
            log::debug!("Process {} closed gracefully with {}", pid, status);
            Ok(TerminationOutcome::Graceful(status))
        }
        Some(Err(source)) => Err(TerminateError::Wait { pid, source }),
        None if options.force => {
            process
                .send(TerminationSignal::Forced)
                .map_err(|source| TerminateError::Signal {
                    pid,
                    signal: TerminationSignal::Forced,
                    source,
                })?;
            process.on_transition(ProcessState::Killed);
            log::debug!("Process {} ignored SIGTERM; sent SIGKILL", pid);
            Ok(TerminationOutcome::Forced)
        }
        None => {
            process.on_transition(ProcessState::Running);
            log::warn!(
                "Process {} is still running {:?} after SIGTERM",
                pid,
                options.max_wait
            );
            Err(TerminateError::CouldNotKill {
                pid,
                waited: options.max_wait,
            })
        }
    }
}
