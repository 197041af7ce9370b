//! Library side of the `limn` binary: argument parsing, vault wiring and
//! the command implementations.

pub mod cli;
pub mod commands;
pub mod context;
pub mod progress;
