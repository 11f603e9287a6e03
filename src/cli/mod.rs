//! CLI module for dynschema
//!
//! Provides command-line interface for:
//! - init: Write a config and create the data directory
//! - serve: Answer JSON requests line by line from stdin
//! - exec: One-shot request execution

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{exec, init, init_logging, run, run_command, serve, serve_lines};
pub use errors::{CliError, CliResult};
pub use io::{read_request, read_requests, write_response};
