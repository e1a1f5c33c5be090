//! procpack: spawn, execute, stream, escape and terminate child processes.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
