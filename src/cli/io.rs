//! Line-oriented JSON I/O
//!
//! - Input: one JSON request per line on stdin
//! - Output: one JSON response per line on stdout
//! - Logs go to stderr and never interleave with responses

use std::io::{self, BufRead, Write};

use super::errors::{CliError, CliResult};
use crate::api::Response;

/// Read one request line
pub fn read_request(input: &mut impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(line)
}

/// Non-blank request lines until EOF
pub fn read_requests(input: impl BufRead) -> impl Iterator<Item = CliResult<String>> {
    input.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Write a response as a single flushed line
pub fn write_response(output: &mut impl Write, response: &Response) -> CliResult<()> {
    writeln!(output, "{}", response.to_json())?;
    output.flush()?;
    Ok(())
}

pub fn stdout_response(response: &Response) -> CliResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_response(&mut lock, response)
}
