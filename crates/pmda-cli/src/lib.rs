//! PMDA CLI library.
//!
//! This library provides the pieces behind the `pmda` binary: argument
//! parsing, configuration loading, candidate discovery, run commands, and
//! summary formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
