// src/core/mod.rs

pub mod config_loader;
pub mod escape;
pub mod paths;
