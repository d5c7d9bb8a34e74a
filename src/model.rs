/// Core data types for the occupancy forecasting service.
///
/// This module defines the shared domain model imported by all other modules:
/// the canonical time-of-day bucket, raw and validated occupancy records,
/// the record set produced by the loader, and the error type every stage
/// reports through.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Time points
// ---------------------------------------------------------------------------

/// A time-of-day bucket used to align historical observations.
///
/// Always rendered as a two-digit hour and two-digit minute (`"09:05"`),
/// so two observations taken at the same wall-clock minute land in the
/// same bucket no matter how their source labelled them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    hour: u8,
    minute: u8,
}

impl TimePoint {
    /// Builds a time point, returning `None` if either component is out of range.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Derives the bucket from a timestamp's hour and minute. Seconds are dropped.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimePoint {
    type Err = String;

    /// Accepts `H:M` labels with or without zero padding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("time label '{}' is missing ':'", s))?;

        let parse_part = |part: &str, what: &str| -> Result<u8, String> {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("time label '{}' has an invalid {}", s, what));
            }
            part.parse::<u8>()
                .map_err(|_| format!("time label '{}' has an invalid {}", s, what))
        };

        let hour = parse_part(h, "hour")?;
        let minute = parse_part(m, "minute")?;
        TimePoint::new(hour, minute)
            .ok_or_else(|| format!("time label '{}' is outside 00:00-23:59", s))
    }
}

impl Serialize for TimePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One row exactly as a row source hands it over, before validation.
///
/// Every field a database join could leave `NULL` is optional; the loader
/// decides which of them are fatal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    pub client_count: Option<i64>,
    pub dump_time: String, // e.g. "2024-10-14 09:15:00" or RFC 3339
    pub group_id: Option<i32>,
    pub group_name: Option<String>,
    pub parent_id: Option<i32>,
    pub building_name: Option<String>,
}

/// A single validated headcount observation for one monitored location.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub client_count: u32,
    pub dump_time: NaiveDateTime,
    pub group_id: Option<i32>,
    pub group_name: String,
    /// Containing building; carried through loading but not used in forecasts.
    pub parent_id: Option<i32>,
    pub building_name: Option<String>,
    pub time_point: TimePoint,
}

/// Immutable set of records loaded for one history window.
///
/// Produced by `loader::load`. Records keep their source order; nothing
/// about them is unique (many locations share a timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    window: String,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(window: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            window: window.into(),
            records,
        }
    }

    /// Label of the history window these records were selected by.
    pub fn window(&self) -> &str {
        &self.window
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn client_counts(&self) -> Vec<u32> {
        self.records.iter().map(|r| r.client_count).collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.group_name.as_str()).collect()
    }

    pub fn building_names(&self) -> Vec<Option<&str>> {
        self.records.iter().map(|r| r.building_name.as_deref()).collect()
    }

    pub fn parent_ids(&self) -> Vec<Option<i32>> {
        self.records.iter().map(|r| r.parent_id).collect()
    }

    pub fn time_points(&self) -> Vec<TimePoint> {
        self.records.iter().map(|r| r.time_point).collect()
    }

    /// Distinct location names, sorted.
    pub fn locations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.iter().map(|r| r.group_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// All records observed at `location`.
    pub fn for_location<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.group_name == location)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while loading history or building a forecast.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// A source row could not be turned into a `Record`. Aborts the load.
    DataIntegrity {
        row: usize,
        timestamp: Option<String>,
        reason: String,
    },
    /// A location seen in the history has no entry in the capacity table.
    UnknownLocation(String),
    /// No historical records exist for a location (or for any location when
    /// `location` is `None`) in the requested window.
    EmptyHistory {
        location: Option<String>,
        window: String,
    },
    /// The database query failed.
    Database(String),
    /// A snapshot file could not be read.
    Snapshot(String),
    /// Reading input or writing output failed.
    Io(String),
    /// A configuration value is missing or invalid.
    Config { field: String, message: String },
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::DataIntegrity { row, timestamp, reason } => match timestamp {
                Some(ts) => write!(f, "Data integrity error at row {} ({}): {}", row, ts, reason),
                None => write!(f, "Data integrity error at row {}: {}", row, reason),
            },
            ForecastError::UnknownLocation(name) => write!(f, "Unknown location: {}", name),
            ForecastError::EmptyHistory { location: Some(name), window } => {
                write!(f, "Empty history for location {} in window {}", name, window)
            }
            ForecastError::EmptyHistory { location: None, window } => {
                write!(f, "Empty history: no records in window {}", window)
            }
            ForecastError::Database(msg) => write!(f, "Database error: {}", msg),
            ForecastError::Snapshot(msg) => write!(f, "Snapshot error: {}", msg),
            ForecastError::Io(msg) => write!(f, "I/O error: {}", msg),
            ForecastError::Config { field, message } => {
                write!(f, "Config error: {}: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ForecastError {}

impl From<postgres::Error> for ForecastError {
    fn from(err: postgres::Error) -> Self {
        ForecastError::Database(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Snapshot(err.to_string())
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::Io(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
