//! Plugin log for the trnpy Type
//!
//! The kernel's own list file only receives the messages a Type reports to
//! it. Everything else (paths tried, interpreter setup, Python tracebacks)
//! goes to a separate log file, tagged with the unit the kernel was calling
//! at the time. Warnings and errors are echoed to stderr unless disabled.

use colored::Colorize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "trnpy.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Verbosity needed before the message is echoed to stderr
    fn console_threshold(self) -> u8 {
        match self {
            Level::Warn | Level::Error => 0,
            Level::Info => 1,
            Level::Debug => 2,
        }
    }
}

/// Where a logged line came from
#[derive(Debug, Clone, Copy)]
enum Source {
    Plugin,
    Python,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Plugin => f.write_str("TYPE169"),
            Source::Python => f.write_str("PYTHON"),
        }
    }
}

struct LoggerState {
    log_file: Option<PathBuf>,
    verbosity: u8,
    no_stderr: bool,
    current_unit: Option<i32>,
}

static STATE: Mutex<LoggerState> = Mutex::new(LoggerState {
    log_file: None,
    verbosity: 0,
    no_stderr: false,
    current_unit: None,
});

fn with_state<R>(f: impl FnOnce(&mut LoggerState) -> R) -> Option<R> {
    STATE.lock().ok().map(|mut state| f(&mut state))
}

pub fn get_verbosity() -> u8 {
    with_state(|s| s.verbosity).unwrap_or(0)
}

/// Unit the kernel is calling, stamped on every line until changed
pub fn set_current_unit(unit: Option<i32>) {
    with_state(|s| s.current_unit = unit);
}

/// Start a fresh log file
///
/// `no_stderr` silences the stderr echo; TRNSYS Studio swallows stderr, so
/// Studio runs rely on the log file alone. `log_file` defaults to `<config dir>/trnpy/trnpy.log`. An existing file
/// is replaced so the log only covers the current simulation.
pub fn init_with_verbosity(
    verbosity: u8,
    log_file: Option<&Path>,
    no_stderr: bool,
) -> Result<(), String> {
    let log_file = match log_file {
        Some(path) => path.to_path_buf(),
        None => default_log_dir()?.join(LOG_FILE_NAME),
    };

    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory {}: {}", parent.display(), e))?;
    }
    fs::write(&log_file, b"")
        .map_err(|e| format!("Failed to create log file {}: {}", log_file.display(), e))?;

    with_state(|s| {
        s.verbosity = verbosity;
        s.no_stderr = no_stderr;
        s.log_file = Some(log_file);
    })
    .ok_or_else(|| "Logger state poisoned".to_string())
}

fn default_log_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config");

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir().ok_or("Could not determine config directory")?;

    Ok(base.join("trnpy"))
}

/// Path of the active log file, once initialized
pub fn get_log_path() -> Option<PathBuf> {
    with_state(|s| s.log_file.clone()).flatten()
}

fn emit(level: Level, source: Source, message: &str) {
    let Some((log_file, verbosity, no_stderr, unit)) =
        with_state(|s| (s.log_file.clone(), s.verbosity, s.no_stderr, s.current_unit))
    else {
        return;
    };

    if let Some(path) = log_file {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = match unit {
                Some(unit) => writeln!(
                    file,
                    "[{}] [{}] [unit {}] {} {}",
                    timestamp,
                    source,
                    unit,
                    level.as_str(),
                    message
                ),
                None => writeln!(file, "[{}] [{}] {} {}", timestamp, source, level.as_str(), message),
            };
        }
    }

    if no_stderr || verbosity < level.console_threshold() {
        return;
    }
    let tag = match (source, level) {
        (Source::Python, _) => "python:".magenta().bold(),
        (_, Level::Error) => "error:".red().bold(),
        (_, Level::Warn) => "warning:".yellow().bold(),
        (_, Level::Info) => "trnpy:".green().bold(),
        (_, Level::Debug) => "debug:".blue().bold(),
    };
    eprintln!("{} {}", tag, message);
}

pub fn debug(message: &str) {
    emit(Level::Debug, Source::Plugin, message);
}

pub fn info(message: &str) {
    emit(Level::Info, Source::Plugin, message);
}

pub fn warn(message: &str) {
    emit(Level::Warn, Source::Plugin, message);
}

pub fn error(message: &str) {
    emit(Level::Error, Source::Plugin, message);
}

/// Output from the embedded interpreter, such as a traceback
pub fn python(message: &str) {
    emit(Level::Error, Source::Python, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_console_thresholds() {
        assert_eq!(Level::Error.console_threshold(), 0);
        assert_eq!(Level::Warn.console_threshold(), 0);
        assert!(Level::Debug.console_threshold() > Level::Info.console_threshold());
    }

    // Logger state is process-wide; one test keeps the file assertions ordered.
    #[test]
    fn test_log_file_receives_tagged_lines() {
        let Ok(dir) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        let log_path = dir.path().join("logs").join("trnpy.log");
        assert!(init_with_verbosity(0, Some(&log_path), true).is_ok());
        assert_eq!(get_log_path(), Some(log_path.clone()));

        set_current_unit(Some(12));
        info("loaded script");
        set_current_unit(None);
        python("Traceback (most recent call last):");
        info("after the unit");

        let content = fs::read_to_string(&log_path).unwrap_or_default();
        assert!(content.contains("[TYPE169] [unit 12] INFO loaded script"));
        assert!(content.contains("[PYTHON] ERROR Traceback"));
        assert!(content.contains("[TYPE169] INFO after the unit"));

        // A second init starts the file over.
        assert!(init_with_verbosity(1, Some(&log_path), true).is_ok());
        assert_eq!(fs::read_to_string(&log_path).unwrap_or_default(), "");
        assert_eq!(get_verbosity(), 1);
    }
}
