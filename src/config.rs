/// TOML run configuration.
///
/// Every section is optional and falls back to the defaults below, so an
/// empty file (or no file at all) forecasts today's date from the database
/// named by `DATABASE_URL` using the built-in capacity table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::capacity::CapacityTable;
use crate::forecast::SelectionGranularity;
use crate::logging::LogLevel;
use crate::model::ForecastError;
use crate::window::WindowStrategy;

/// Top-level configuration parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where historical rows come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Environment variable holding the PostgreSQL connection string.
    pub url_env: String,
    /// Read rows from this CSV export instead of the database.
    pub snapshot: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "DATABASE_URL".to_string(),
            snapshot: None,
        }
    }
}

/// Whether to forecast from one window or reconcile three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Single,
    #[default]
    Multi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Day to forecast. Defaults to the local date at startup.
    pub reference_date: Option<NaiveDate>,
    pub strategy: Strategy,
    /// Window label used by the single strategy (see `WindowStrategy`).
    pub window: String,
    /// Windows reconciled by the multi strategy, in tie-break order.
    pub windows: [String; 3],
    pub selection: SelectionGranularity,
    /// When set, each of these locations must have history.
    pub expected_locations: Option<Vec<String>>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            reference_date: None,
            strategy: Strategy::Multi,
            window: WindowStrategy::SameWeekday.label().to_string(),
            windows: [
                WindowStrategy::SameWeekday.label().to_string(),
                WindowStrategy::WithWeekAhead.label().to_string(),
                WindowStrategy::WithWeekBefore.label().to_string(),
            ],
            selection: SelectionGranularity::Location,
            expected_locations: None,
        }
    }
}

impl ForecastConfig {
    pub fn single_window(&self) -> Result<WindowStrategy, ForecastError> {
        parse_window("forecast.window", &self.window)
    }

    pub fn multi_windows(&self) -> Result<[WindowStrategy; 3], ForecastError> {
        Ok([
            parse_window("forecast.windows[0]", &self.windows[0])?,
            parse_window("forecast.windows[1]", &self.windows[1])?,
            parse_window("forecast.windows[2]", &self.windows[2])?,
        ])
    }
}

fn parse_window(field: &str, label: &str) -> Result<WindowStrategy, ForecastError> {
    label.parse().map_err(|message| ForecastError::Config {
        field: field.to_string(),
        message,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapacityConfig {
    /// Start from the built-in campus table before applying `locations`.
    pub use_builtin: bool,
    /// Additional or overriding capacities, keyed by exact location name.
    pub locations: BTreeMap<String, u32>,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            locations: BTreeMap::new(),
        }
    }
}

impl CapacityConfig {
    pub fn build_table(&self) -> Result<CapacityTable, ForecastError> {
        let mut table = if self.use_builtin {
            CapacityTable::builtin()
        } else {
            CapacityTable::empty()
        };
        for (name, capacity) in &self.locations {
            table.insert(name.clone(), *capacity)?;
        }
        if table.is_empty() {
            return Err(ForecastError::Config {
                field: "capacity".to_string(),
                message: "no capacities configured".to_string(),
            });
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, ForecastError> {
        self.level.parse().map_err(|message| ForecastError::Config {
            field: "logging.level".to_string(),
            message,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Write here instead of stdout.
    pub path: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ForecastError> {
        let config: Config = toml::from_str(text).map_err(|e| ForecastError::Config {
            field: "<file>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ForecastError> {
        let text = fs::read_to_string(path).map_err(|e| ForecastError::Config {
            field: "<file>".to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every value that `Deserialize` alone cannot.
    pub fn validate(&self) -> Result<(), ForecastError> {
        self.forecast.single_window()?;
        self.forecast.multi_windows()?;
        self.logging.min_level()?;
        self.capacity.build_table()?;
        if self.database.url_env.trim().is_empty() && self.database.snapshot.is_none() {
            return Err(ForecastError::Config {
                field: "database.url_env".to_string(),
                message: "must name an environment variable".to_string(),
            });
        }
        Ok(())
    }
}
