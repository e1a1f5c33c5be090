// EN: src/cli/handlers/mod.rs

// One module per CLI command. Each exposes `handle(args, context)`.

pub mod commons;
pub mod escape;
pub mod exec;
pub mod history;
pub mod kill;
pub mod open;
pub mod stream;
