//! CLI argument definitions using clap
//!
//! Commands:
//! - dynschema init --config <path>
//! - dynschema serve --config <path>
//! - dynschema exec --config <path> [request]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dynschema - runtime-defined schemas, validated records, typed queries
#[derive(Parser, Debug)]
#[command(name = "dynschema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file and create its data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./dynschema.json")]
        config: PathBuf,

        /// Data directory recorded in the new config
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Serve JSON requests from stdin, one per line, until EOF
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./dynschema.json")]
        config: PathBuf,
    },

    /// Execute a single request and exit
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./dynschema.json")]
        config: PathBuf,

        /// Request JSON; read from stdin when omitted
        request: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dynschema", "serve"]);
        match cli.command {
            Command::Serve { config } => assert_eq!(config, PathBuf::from("./dynschema.json")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exec_inline_request() {
        let cli = Cli::parse_from([
            "dynschema",
            "exec",
            "--config",
            "/tmp/c.json",
            r#"{"op":"list_schemas"}"#,
        ]);
        match cli.command {
            Command::Exec { config, request } => {
                assert_eq!(config, PathBuf::from("/tmp/c.json"));
                assert_eq!(request.as_deref(), Some(r#"{"op":"list_schemas"}"#));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
