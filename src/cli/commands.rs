//! CLI command implementations
//!
//! `init` writes a config and creates its data directory. `serve` and `exec`
//! load the config, open the registry and record log, then hand request lines
//! to the API handler.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::ApiHandler;
use crate::config::Config;
use crate::service::{DynamicDataService, ServiceError};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, stdout_response, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config, data_dir } => init(&config, &data_dir),
        Command::Serve { config } => serve(&config),
        Command::Exec { config, request } => exec(&config, request),
    }
}

/// Installs the stderr subscriber; `RUST_LOG` wins over the config filter.
/// A second call is a no-op.
pub fn init_logging(config: &Config) {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .try_init();
}

/// Write a default config pointing at `data_dir` and create the directory.
/// Refuses to overwrite an existing config.
pub fn init(config_path: &Path, data_dir: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::AlreadyInitialized(config_path.display().to_string()));
    }

    let config = Config {
        data_dir: Some(data_dir.to_string_lossy().into_owned()),
        ..Config::default()
    };
    config.validate()?;

    fs::create_dir_all(data_dir)?;
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(config_path, json)?;

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    writeln!(lock, "{{\"initialized\":true}}")?;
    Ok(())
}

/// Serve requests from stdin until EOF
pub fn serve(config_path: &Path) -> CliResult<()> {
    let handler = boot(config_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let served = serve_lines(&handler, stdin.lock(), &mut stdout.lock())?;
    info!(requests = served, "input closed, shutting down");
    Ok(())
}

/// Answers every request line on `output`; returns how many were handled.
pub fn serve_lines(
    handler: &ApiHandler,
    input: impl BufRead,
    output: &mut impl Write,
) -> CliResult<usize> {
    let mut served = 0;
    for line in read_requests(input) {
        let response = handler.handle_json(&line?);
        write_response(output, &response)?;
        served += 1;
    }
    Ok(served)
}

/// Execute a single request and exit
pub fn exec(config_path: &Path, request: Option<String>) -> CliResult<()> {
    let handler = boot(config_path)?;
    let line = match request {
        Some(line) => line,
        None => {
            let stdin = io::stdin();
            let mut lock = stdin.lock();
            read_request(&mut lock)?
        }
    };
    stdout_response(&handler.handle_json(&line))
}

/// Loads the config (defaults when the file is missing) and opens the service
fn boot(config_path: &Path) -> CliResult<ApiHandler> {
    let config = Config::load_or_default(config_path)?;
    init_logging(&config);

    let service = DynamicDataService::open(&config)?;
    let schemas = service.registry().len().map_err(ServiceError::from)?;
    info!(
        config = %config_path.display(),
        data_dir = config.data_dir.as_deref().unwrap_or("<memory>"),
        schemas,
        "dynschema ready"
    );
    Ok(ApiHandler::new(service))
}
