//! Command-line interface for the mcuf converter
//!
//! The `mcuf` binary lives in `main.rs`; argument parsing and the commands
//! are exposed here so they can be tested without spawning a process.

pub mod cli;
pub mod commands;
