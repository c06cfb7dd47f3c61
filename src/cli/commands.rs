//! CLI command implementations
//!
//! `serve` boot sequence:
//! 1. Load and validate configuration
//! 2. Apply the log level
//! 3. Load the snapshot, if one is configured and present
//! 4. Start the TTL reaper
//! 5. Answer requests from stdin until EOF
//! 6. Stop the reaper, save the snapshot, exit

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, log_event_with_fields, Event, Logger, Severity};
use crate::snapshot::{self, SnapshotSummary};
use crate::store::{Database, DatabaseConfig};
use crate::ttl::Reaper;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{request_lines, write_line};
use super::requests::RequestHandler;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum log severity, or "off"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Snapshot loaded at start and written at exit
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            snapshot_path: None,
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.min_severity()?;
        self.database
            .validate()
            .map_err(|e| CliError::config_error(e.message().to_string()))?;
        if let Some(path) = &self.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(CliError::config_error("snapshot_path must not be empty"));
            }
        }
        Ok(())
    }

    /// Parsed log level; `None` turns logging off
    pub fn min_severity(&self) -> CliResult<Option<Severity>> {
        if self.log_level.eq_ignore_ascii_case("off") {
            return Ok(None);
        }
        Severity::parse(&self.log_level).map(Some).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error, fatal or off.",
                self.log_level
            ))
        })
    }
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Check { config } => check(&config).map(|_| ()),
    }
}

/// Opens a database from `config`, loading its snapshot when the file exists
pub fn open(config: &Config) -> CliResult<Database> {
    let db = Database::new(config.database.clone())
        .map_err(|e| CliError::config_error(e.message().to_string()))?;

    if let Some(path) = &config.snapshot_path {
        if path.exists() {
            db.load_snapshot(path)
                .map_err(|e| CliError::snapshot_error(&e))?;
        }
    }
    Ok(db)
}

/// Run the request loop on stdin/stdout
pub fn serve(config_path: &Path) -> CliResult<()> {
    log_event(Event::BootStart);
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.min_severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );

    let db = Arc::new(open(&config)?);
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;
    let reaper = {
        let _guard = rt.enter();
        Reaper::spawn(Arc::clone(&db))
    };
    log_event(Event::BootComplete);

    let handler = RequestHandler::new(Arc::clone(&db), config.snapshot_path.clone());
    let served = serve_stream(&handler, io::stdin().lock(), io::stdout().lock());

    log_event(Event::ShutdownStart);
    rt.block_on(reaper.stop());
    if let Some(path) = &config.snapshot_path {
        db.save_snapshot(path)
            .map_err(|e| CliError::snapshot_error(&e))?;
    }
    log_event(Event::ShutdownComplete);

    served.map(|_| ())
}

/// Answers every request line of `input` on `output`. Returns the number
/// of requests handled.
pub fn serve_stream<R: BufRead, W: Write>(
    handler: &RequestHandler,
    input: R,
    mut output: W,
) -> CliResult<usize> {
    log_event(Event::Serving);
    let mut handled = 0;
    for line in request_lines(input) {
        let response = handler.handle_line(&line?);
        write_line(&mut output, &response)?;
        handled += 1;
    }
    Ok(handled)
}

/// Validate the configuration and the snapshot it names
pub fn check(config_path: &Path) -> CliResult<Option<SnapshotSummary>> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.min_severity()?);

    let summary = match &config.snapshot_path {
        Some(path) if path.exists() => {
            Some(snapshot::inspect(path).map_err(|e| CliError::snapshot_error(&e))?)
        }
        _ => None,
    };

    let mut stdout = io::stdout().lock();
    match &summary {
        Some(s) => writeln!(
            stdout,
            "config ok; snapshot ok: {} collections, {} indexes, {} documents",
            s.collections, s.indexes, s.documents
        )?,
        None => writeln!(stdout, "config ok; no snapshot")?,
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, config: Value) -> PathBuf {
        let path = dir.path().join("aerodoc.json");
        fs::write(&path, config.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({}));

        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database.reaper_interval_secs, 60);
        assert!(!config.database.include_deleted);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let dir = TempDir::new().unwrap();

        let path = write_config(&dir, json!({"log_level": "loud"}));
        assert_eq!(Config::load(&path).unwrap_err().code(), CliErrorCode::ConfigError);

        let path = write_config(&dir, json!({"database": {"reaper_interval_secs": 0}}));
        assert_eq!(Config::load(&path).unwrap_err().code(), CliErrorCode::ConfigError);

        let missing = dir.path().join("missing.json");
        assert_eq!(Config::load(&missing).unwrap_err().code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_log_level_off() {
        let config = Config {
            log_level: "OFF".into(),
            ..Config::default()
        };
        assert_eq!(config.min_severity().unwrap(), None);
    }

    #[test]
    fn test_serve_stream_answers_each_line() {
        let db = Arc::new(Database::new(DatabaseConfig::default()).unwrap());
        let handler = RequestHandler::new(db, None);
        let input = concat!(
            "{\"op\":\"create_collection\",\"collection\":\"notes\"}\n",
            "\n",
            "{\"op\":\"insert\",\"collection\":\"notes\",\"document\":{\"_id\":1}}\n",
            "{\"op\":\"insert\",\"collection\":\"notes\",\"document\":{\"_id\":1}}\n",
        );
        let mut out = Vec::new();

        let handled = serve_stream(&handler, input.as_bytes(), &mut out).unwrap();
        assert_eq!(handled, 3);

        let responses: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses[1]["status"], "ok");
        assert_eq!(responses[2]["code"], "AERO_DUPLICATE_KEY");
    }

    #[test]
    fn test_open_and_check_with_snapshot() {
        let dir = TempDir::new().unwrap();
        let snapshot_path = dir.path().join("data.snap");
        let path = write_config(
            &dir,
            json!({"log_level": "off", "snapshot_path": snapshot_path}),
        );
        let config = Config::load(&path).unwrap();

        // no file yet: empty database, nothing to inspect
        let db = open(&config).unwrap();
        assert!(db.list_collections().is_empty());
        assert_eq!(check(&path).unwrap(), None);

        db.create_collection("notes").unwrap();
        db.insert("notes", crate::value::Document::new().with("_id", 1))
            .unwrap();
        db.save_snapshot(&snapshot_path).unwrap();

        let reopened = open(&config).unwrap();
        assert_eq!(reopened.count("notes", &crate::query::Filter::All).unwrap(), 1);
        let summary = check(&path).unwrap().unwrap();
        assert_eq!((summary.collections, summary.documents), (1, 1));
    }

    #[test]
    fn test_open_rejects_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        let snapshot_path = dir.path().join("data.snap");
        fs::write(&snapshot_path, b"garbage").unwrap();
        let config = Config {
            snapshot_path: Some(snapshot_path),
            ..Config::default()
        };
        assert_eq!(open(&config).unwrap_err().code(), CliErrorCode::SnapshotError);
    }
}
