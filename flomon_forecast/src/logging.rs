/// Structured logging for the forecast pipeline
///
/// Tags every message with the pipeline stage that produced it and, where it
/// applies, the station it concerns. Console output stays compact; the
/// optional log file always gets the full timestamped line.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Stations,
    Forecast,
    Enhance,
    Output,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Download => write!(f, "DL"),
            Stage::Stations => write!(f, "STN"),
            Stage::Forecast => write!(f, "FCST"),
            Stage::Enhance => write!(f, "ENH"),
            Stage::Output => write!(f, "OUT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    fn log(&self, level: LogLevel, stage: Stage, station: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let log_entry = format_entry(&timestamp, level, stage, station, message);
        let line = if self.console_timestamps {
            log_entry.clone()
        } else {
            console_line(level, stage, station, message)
        };

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", line),
            LogLevel::Info | LogLevel::Debug => println!("{}", line),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

/// Full log line as written to the log file.
fn format_entry(
    timestamp: &str,
    level: LogLevel,
    stage: Stage,
    station: Option<&str>,
    message: &str,
) -> String {
    let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, stage, station_part, message)
}

/// Short console line used when timestamps are off.
fn console_line(level: LogLevel, stage: Stage, station: Option<&str>, message: &str) -> String {
    let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
    match level {
        LogLevel::Error => format!("   ✗ {}{}: {}", stage, station_part, message),
        LogLevel::Warning => format!("   ⚠️  {}{}: {}", stage, station_part, message),
        LogLevel::Info => format!("   {}", message),
        LogLevel::Debug => format!("   [DEBUG]{} {}", station_part, message),
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger. Messages logged before this are dropped.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let logger = Logger {
        min_level,
        log_file: log_file.map(String::from),
        console_timestamps,
    };
    if let Ok(mut guard) = LOGGER.lock() {
        *guard = Some(logger);
    }
}

fn log(level: LogLevel, stage: Stage, station: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, stage, station, message);
        }
    }
}

/// Log a general informational message
pub fn info(stage: Stage, station: Option<&str>, message: &str) {
    log(LogLevel::Info, stage, station, message);
}

/// Log a warning message
pub fn warn(stage: Stage, station: Option<&str>, message: &str) {
    log(LogLevel::Warning, stage, station, message);
}

/// Log an error message
pub fn error(stage: Stage, station: Option<&str>, message: &str) {
    log(LogLevel::Error, stage, station, message);
}

/// Log a debug message
pub fn debug(stage: Stage, station: Option<&str>, message: &str) {
    log(LogLevel::Debug, stage, station, message);
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log how many stations were scored versus left as `Unknown`.
pub fn log_enhance_summary(total: usize, scored: usize, no_data: usize, failed: usize) {
    let message = format!(
        "Enhanced {}/{} stations with forecast data ({} without data, {} lookup failures)",
        scored, total, no_data, failed
    );

    if failed == 0 && no_data == 0 {
        info(Stage::Enhance, None, &message);
    } else if scored == 0 && total > 0 {
        error(Stage::Enhance, None, &message);
    } else {
        warn(Stage::Enhance, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_entry_includes_stage_and_station() {
        let entry = format_entry(
            "2025-09-30 06:00:00 UTC",
            LogLevel::Warning,
            Stage::Enhance,
            Some("DRESDEN"),
            "outside grid",
        );
        assert_eq!(entry, "2025-09-30 06:00:00 UTC WARN ENH [DRESDEN]: outside grid");
    }

    #[test]
    fn test_console_line_without_timestamps() {
        assert_eq!(console_line(LogLevel::Info, Stage::Forecast, None, "loaded"), "   loaded");
        assert_eq!(
            console_line(LogLevel::Warning, Stage::Enhance, Some("KETZIN"), "outside grid"),
            "   ⚠️  ENH [KETZIN]: outside grid"
        );
        assert_eq!(
            console_line(LogLevel::Debug, Stage::Enhance, Some("KETZIN"), "values [1.0]"),
            "   [DEBUG] [KETZIN] values [1.0]"
        );
    }

    #[test]
    fn test_timestamped_logger_writes_full_entries_to_file() {
        let path = std::env::temp_dir().join(format!("flomon_forecast_log_{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let logger = Logger {
            min_level: LogLevel::Info,
            log_file: Some(path.to_string_lossy().into_owned()),
            console_timestamps: true,
        };

        logger.log(LogLevel::Debug, Stage::Output, None, "below threshold");
        logger.log(LogLevel::Info, Stage::Output, None, "written");

        let contents = std::fs::read_to_string(&path).expect("log file should exist");
        assert_eq!(contents.lines().count(), 1, "debug line is filtered out");
        assert!(contents.trim_end().ends_with("INFO OUT: written"), "got: {}", contents);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_entry_without_station() {
        let entry = format_entry("t", LogLevel::Info, Stage::Forecast, None, "loaded");
        assert_eq!(entry, "t INFO FCST: loaded");
    }
}
