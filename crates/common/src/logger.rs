//! Tracing subscriber setup for the server and the one-shot CLI commands
//!
//! `RUST_LOG` always wins over the configured level. Without it, chatty
//! dependencies (llama.cpp's native loader output, actix worker start-up)
//! are held at `warn` so thought analysis stays readable.

use crate::error::SentimentSpaceError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log file written inside the configured log directory
pub const LOG_FILE_NAME: &str = "sentiment-space.log";

/// Targets capped at `warn` unless `RUST_LOG` says otherwise
const QUIET_TARGETS: [&str; 2] = ["llama_cpp_2", "actix_server"];

/// Console plus append-only file logging for the HTTP server
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), SentimentSpaceError> {
    let (log_file, log_file_path) = open_log_file(log_dir)?;
    let level = parse_log_level(log_level);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(level));

    // thread ids only in the file, where requests interleave
    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SentimentSpaceError::config(format!("Failed to install logger: {}", e)))?;

    warn_unknown_level(log_level, level);
    tracing::info!(
        "Logging initialized: level={}, log_file={}",
        level.unwrap_or(Level::INFO),
        log_file_path.display()
    );

    Ok(())
}

/// Console-only logging for the one-shot CLI commands
///
/// Writes to stderr so stdout stays clean for JSON output
pub fn setup_console_logging(log_level: &str) -> Result<(), SentimentSpaceError> {
    let level = parse_log_level(log_level);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_env_filter(env_filter(level))
        .try_init()
        .map_err(|e| SentimentSpaceError::config(format!("Failed to install logger: {}", e)))?;

    warn_unknown_level(log_level, level);
    Ok(())
}

/// Level named by a `LOG_LEVEL` value; `None` when unrecognized
pub fn parse_log_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Filter directives used when `RUST_LOG` is unset
fn default_directives(level: Option<Level>) -> String {
    let level = level.unwrap_or(Level::INFO).as_str().to_lowercase();
    let mut directives = vec![level];
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)));
    directives.join(",")
}

fn env_filter(level: Option<Level>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn warn_unknown_level(requested: &str, parsed: Option<Level>) {
    if parsed.is_none() {
        tracing::warn!("Unknown log level '{}', using info", requested);
    }
}

/// Open (creating as needed) the log file inside `log_dir` for appending
fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), SentimentSpaceError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        SentimentSpaceError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            SentimentSpaceError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_log_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_log_level(" Info "), Some(Level::INFO));
        assert_eq!(parse_log_level("WARNING"), Some(Level::WARN));
        assert_eq!(parse_log_level("error"), Some(Level::ERROR));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn test_default_directives_quiet_dependencies() {
        assert_eq!(
            default_directives(Some(Level::DEBUG)),
            "debug,llama_cpp_2=warn,actix_server=warn"
        );
        assert!(default_directives(None).starts_with("info,"));
    }

    #[test]
    fn test_open_log_file_creates_directory_and_appends() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("nested").join("log");

        let (mut file, path) = open_log_file(&log_dir).unwrap();
        assert_eq!(path, log_dir.join(LOG_FILE_NAME));
        writeln!(file, "first").unwrap();

        let (mut file, _) = open_log_file(&log_dir).unwrap();
        writeln!(file, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_reports_unusable_directory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("log");
        std::fs::write(&blocker, "").unwrap();
        assert!(open_log_file(&blocker).is_err());
    }
}
