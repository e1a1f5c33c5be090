//! # System Interaction Layer
//!
//! Everything that talks to the operating system about child processes.
//!
//! ## Modules
//!
//! - **`spawner`**: Starts a child with piped streams and classifies spawn failures
//!   (missing or non-directory working dir, permissions, missing program).
//! - **`executor`**: Runs a command to completion and buffers its output, with an
//!   optional timeout.
//! - **`stream`**: Starts a command and relays its stdout live while a supervisor task
//!   watches the exit.
//! - **`terminator`**: SIGTERM, a bounded wait, and an optional SIGKILL escalation.
//! - **`browser`**: Opens a URL with the platform opener.
//! - **`history`**: Appends a command line to the shell history.

pub mod browser;
pub mod executor;
pub mod history;
pub mod spawner;
pub mod stream;
pub mod terminator;
