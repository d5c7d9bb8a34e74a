/// Structured logging for the occupancy forecasting service
///
/// Provides context-rich logging with pipeline component and location
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging for scheduled runs.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::ForecastError;

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

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Loader,
    Forecast,
    Database,
    Snapshot,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Loader => write!(f, "LOAD"),
            Component::Forecast => write!(f, "FCST"),
            Component::Database => write!(f, "DB"),
            Component::Snapshot => write!(f, "SNAP"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - e.g. a location simply has no history yet
    Expected,
    /// Unexpected failure - bad data or a configuration gap
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
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
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: &Component, location: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let location_part = location.map(|l| format!(" [{}]", l)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, location_part, message
        );

        // Console output. Every level goes to stderr; stdout carries the forecast.
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            eprintln!("{}", Self::console_line(level, component, &location_part, message));
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn console_line(level: LogLevel, component: &Component, location_part: &str, message: &str) -> String {
        match level {
            LogLevel::Error => format!("   ✗ {}{}: {}", component, location_part, message),
            LogLevel::Warning => format!("   ⚠ {}{}: {}", component, location_part, message),
            LogLevel::Info => format!("   {}", message),
            LogLevel::Debug => format!("   [DEBUG] {}{}: {}", component, location_part, message),
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, component: Component, location: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &component, location, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, location: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, location, message);
}

/// Log a warning message
pub fn warn(component: Component, location: Option<&str>, message: &str) {
    emit(LogLevel::Warning, component, location, message);
}

/// Log an error message
pub fn error(component: Component, location: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, location, message);
}

/// Log a debug message
pub fn debug(component: Component, location: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, location, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a forecasting failure by its error kind
pub fn classify_failure(err: &ForecastError) -> FailureType {
    match err {
        // A new floor with no sensor history yet is routine
        ForecastError::EmptyHistory { location: Some(_), .. } => FailureType::Expected,
        ForecastError::EmptyHistory { location: None, .. } => FailureType::Unknown,
        ForecastError::DataIntegrity { .. }
        | ForecastError::UnknownLocation(_)
        | ForecastError::Config { .. } => FailureType::Unexpected,
        ForecastError::Database(msg) | ForecastError::Snapshot(msg) | ForecastError::Io(msg) => {
            if msg.contains("timeout") || msg.contains("connection") {
                FailureType::Unknown
            } else {
                FailureType::Unexpected
            }
        }
    }
}

fn location_of(err: &ForecastError) -> Option<&str> {
    match err {
        ForecastError::UnknownLocation(name) => Some(name),
        ForecastError::EmptyHistory { location, .. } => location.as_deref(),
        _ => None,
    }
}

/// Log a pipeline failure with automatic classification
pub fn log_failure(component: Component, operation: &str, err: &ForecastError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    let location = location_of(err);

    match failure_type {
        FailureType::Expected => debug(component, location, &message),
        FailureType::Unexpected => error(component, location, &message),
        FailureType::Unknown => warn(component, location, &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one history load
pub fn log_load_summary(window: &str, rows: usize, locations: usize) {
    let message = format!(
        "Loaded {} records across {} locations for window {}",
        rows, locations, window
    );

    if rows == 0 {
        warn(Component::Loader, None, &message);
    } else {
        info(Component::Loader, None, &message);
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
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        let missing = ForecastError::UnknownLocation("Lerner 9".to_string());
        assert_eq!(classify_failure(&missing), FailureType::Unexpected);

        let empty = ForecastError::EmptyHistory {
            location: Some("Lerner 1".to_string()),
            window: "same-weekday".to_string(),
        };
        assert_eq!(classify_failure(&empty), FailureType::Expected);

        let db = ForecastError::Database("connection refused".to_string());
        assert_eq!(classify_failure(&db), FailureType::Unknown);
    }

    #[test]
    fn test_console_line_tags_warnings_with_location() {
        let line = Logger::console_line(LogLevel::Warning, &Component::Forecast, " [Lerner 4]", "no history");
        assert_eq!(line, "   ⚠ FCST [Lerner 4]: no history");
        assert_eq!(Logger::console_line(LogLevel::Info, &Component::Loader, "", "loaded"), "   loaded");
    }

    #[test]
    fn test_failure_location_is_extracted() {
        let missing = ForecastError::UnknownLocation("Lerner 9".to_string());
        assert_eq!(location_of(&missing), Some("Lerner 9"));
        assert_eq!(location_of(&ForecastError::Database("x".to_string())), None);
    }
}
