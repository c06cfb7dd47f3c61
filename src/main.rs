//! aerodoc CLI entry point
//!
//! Parses arguments, dispatches to the CLI module and exits non-zero on
//! failure. Configuration, snapshot loading and the reaper are all started
//! by the command itself.

use aerodoc::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
