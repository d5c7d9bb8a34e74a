/// Same-day occupancy forecasting from historical sensor headcounts.
///
/// Loads past observations for the same weekday (optionally widened by a
/// week either side), averages them per location and time of day, and
/// normalises by location capacity.

pub mod capacity;
pub mod cli;
pub mod config;
pub mod forecast;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod model;
pub mod runner;
pub mod window;

pub use capacity::CapacityTable;
pub use forecast::{Forecaster, MultiForecast, PredictionMatrix};
pub use model::{ForecastError, RawRow, Record, RecordSet, TimePoint};
pub use window::{HistoryWindow, WindowStrategy};
