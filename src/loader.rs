/// History loader.
///
/// Turns the raw rows of a `RowSource` into an immutable `RecordSet`,
/// deriving each record's canonical time-of-day bucket. A single bad row
/// aborts the whole load: a forecast over partially loaded history is
/// worse than no forecast.

use chrono::{DateTime, NaiveDateTime};

use crate::ingest::RowSource;
use crate::logging::{self, Component};
use crate::model::{ForecastError, RawRow, Record, RecordSet, TimePoint};
use crate::window::HistoryWindow;

/// Naive timestamp layouts accepted from row sources, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a `dump_time` string.
///
/// RFC 3339 timestamps keep the wall-clock time of their own offset, since
/// buckets are defined in the monitored building's local day.
pub fn parse_dump_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Validates one raw row. `index` is the row's position in the fetch result.
pub fn validate_row(index: usize, row: RawRow) -> Result<Record, ForecastError> {
    let integrity = |reason: &str| ForecastError::DataIntegrity {
        row: index,
        timestamp: Some(row.dump_time.clone()).filter(|t| !t.is_empty()),
        reason: reason.to_string(),
    };

    let dump_time = parse_dump_time(&row.dump_time).ok_or_else(|| integrity("unparseable dump_time"))?;

    let group_name = match row.group_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(integrity("missing group_name")),
    };

    let client_count = match row.client_count {
        Some(count) => u32::try_from(count)
            .map_err(|_| integrity(&format!("client_count {} is out of range", count)))?,
        None => return Err(integrity("missing client_count")),
    };

    Ok(Record {
        client_count,
        time_point: TimePoint::from_datetime(&dump_time),
        dump_time,
        group_id: row.group_id,
        group_name,
        parent_id: row.parent_id,
        building_name: row.building_name,
    })
}

/// Loads every row the source selects for `window` into a `RecordSet`.
pub fn load<S: RowSource + ?Sized>(
    source: &mut S,
    window: &HistoryWindow,
) -> Result<RecordSet, ForecastError> {
    let raw = source.fetch(window).inspect_err(|e| {
        logging::log_failure(Component::Loader, "fetch", e);
    })?;

    let mut records = Vec::with_capacity(raw.len());
    for (index, row) in raw.into_iter().enumerate() {
        match validate_row(index, row) {
            Ok(record) => records.push(record),
            Err(e) => {
                logging::log_failure(Component::Loader, "load", &e);
                return Err(e);
            }
        }
    }

    let set = RecordSet::new(window.label(), records);
    logging::log_load_summary(window.label(), set.len(), set.locations().len());
    Ok(set)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
