//! CLI module for aerodoc
//!
//! Provides the command-line interface:
//! - serve: answer newline-delimited JSON requests on stdin/stdout
//! - check: validate configuration and snapshot without serving

mod args;
mod commands;
mod errors;
mod io;
mod requests;

pub use args::{Cli, Command};
pub use commands::{check, open, run, run_command, serve, serve_stream, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use requests::{Request, RequestFailure, RequestHandler};
