/// CSV snapshot row source.
///
/// Reads an export of the density join (one row per observation) so a
/// forecast can be produced without a live database, e.g. when replaying
/// historical data during development.
///
/// Expected header:
/// `client_count,dump_time,group_id,group_name,parent_id,building_name`
///
/// Empty cells map to missing values; the loader decides which are fatal.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::ingest::{MemorySource, RowSource};
use crate::logging::{self, Component};
use crate::model::{ForecastError, RawRow};
use crate::window::HistoryWindow;

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    client_count: Option<i64>,
    #[serde(default)]
    dump_time: String,
    group_id: Option<i32>,
    group_name: Option<String>,
    parent_id: Option<i32>,
    building_name: Option<String>,
}

impl From<SnapshotRow> for RawRow {
    fn from(row: SnapshotRow) -> Self {
        RawRow {
            client_count: row.client_count,
            dump_time: row.dump_time,
            group_id: row.group_id,
            group_name: row.group_name.filter(|s| !s.is_empty()),
            parent_id: row.parent_id,
            building_name: row.building_name.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotSource {
    inner: MemorySource,
}

impl SnapshotSource {
    /// Parses a snapshot from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ForecastError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for result in rdr.deserialize::<SnapshotRow>() {
            rows.push(RawRow::from(result?));
        }
        Ok(Self {
            inner: MemorySource::new(rows),
        })
    }

    /// Opens and parses a snapshot file.
    pub fn open(path: &Path) -> Result<Self, ForecastError> {
        let file = std::fs::File::open(path).map_err(|e| {
            ForecastError::Snapshot(format!("cannot open {}: {}", path.display(), e))
        })?;
        let source = Self::from_reader(std::io::BufReader::new(file))?;
        logging::info(
            Component::Snapshot,
            None,
            &format!("Read {} rows from {}", source.len(), path.display()),
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl RowSource for SnapshotSource {
    fn fetch(&mut self, window: &HistoryWindow) -> Result<Vec<RawRow>, ForecastError> {
        self.inner.fetch(window)
    }
}
