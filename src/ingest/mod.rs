/// Row sources for historical occupancy data.
///
/// The forecaster never opens connections itself; callers construct one of
/// these sources around a resource they own and lend it to `loader::load`.
///
/// Submodules:
/// - `database`: PostgreSQL density tables, filtered server-side.
/// - `memory`: rows already in memory, filtered locally.
/// - `snapshot`: CSV exports of the density tables, for offline runs.

pub mod database;
pub mod memory;
pub mod snapshot;

use crate::model::{ForecastError, RawRow};
use crate::window::HistoryWindow;

pub use database::PostgresSource;
pub use memory::MemorySource;
pub use snapshot::SnapshotSource;

/// Anything that can hand over the raw rows selected by a history window.
pub trait RowSource {
    fn fetch(&mut self, window: &HistoryWindow) -> Result<Vec<RawRow>, ForecastError>;
}
