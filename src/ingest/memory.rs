/// In-memory row source.
///
/// Holds rows that are already materialised (a snapshot file, a fixture)
/// and applies the history window locally, using the same timestamp rules
/// as the loader.

use crate::ingest::RowSource;
use crate::loader::parse_dump_time;
use crate::model::{ForecastError, RawRow};
use crate::window::HistoryWindow;

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<RawRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for MemorySource {
    fn fetch(&mut self, window: &HistoryWindow) -> Result<Vec<RawRow>, ForecastError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| match parse_dump_time(&row.dump_time) {
                Some(dt) => window.matches(&dt),
                // Unparseable rows pass through so the loader can reject them
                None => true,
            })
            .cloned()
            .collect())
    }
}
