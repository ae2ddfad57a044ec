//! Command-line interface.
//!
//! Parsing ([`Cli`]), command execution ([`execute`]) and output
//! rendering. The binary in `main.rs` is the sole place that prints and
//! exits; everything here returns strings and [`crate::Result`].

mod commands;
pub mod output;
mod parser;

pub use commands::execute;
pub use parser::{CacheCommands, Cli, Commands, SourceCommands};
