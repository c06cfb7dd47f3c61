//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodoc serve --config <path>
//! - aerodoc check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerodoc - an embeddable document store and query engine
#[derive(Parser, Debug)]
#[command(name = "aerodoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer newline-delimited JSON requests from stdin until EOF
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodoc.json")]
        config: PathBuf,
    },

    /// Validate the configuration and the snapshot it points to
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodoc.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_config() {
        let cli = Cli::try_parse_from(["aerodoc", "serve", "--config", "/etc/aerodoc.json"]).unwrap();
        match cli.command {
            Command::Serve { config } => assert_eq!(config, PathBuf::from("/etc/aerodoc.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults_to_working_directory() {
        let cli = Cli::try_parse_from(["aerodoc", "check"]).unwrap();
        match cli.command {
            Command::Check { config } => assert_eq!(config, PathBuf::from("./aerodoc.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["aerodoc", "explain"]).is_err());
    }
}
