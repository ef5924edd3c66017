//! Text front end over the ledger engine.

pub mod commands;
pub mod core;
pub mod output;
mod shell;

pub use shell::run_cli;
