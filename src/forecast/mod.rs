/// Same-day occupancy forecasting.
///
/// Averages historical client counts per location and time bucket, divides
/// by each location's capacity, and assembles the result into a
/// `PredictionMatrix`. `predict_multi` additionally reconciles three
/// history windows, keeping the least dispersed one per location (or per
/// bucket).
///
/// Submodules:
/// - `stats`: per-bucket mean and spread.
/// - `matrix`: the time × location output table.
/// - `reconcile`: lowest-dispersion source selection.

pub mod matrix;
pub mod reconcile;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::capacity::CapacityTable;
use crate::logging::{self, Component};
use crate::model::{ForecastError, RecordSet};

pub use matrix::{MatrixRow, PredictionMatrix};
pub use reconcile::{HistorySource, SelectionGranularity, SourceDecision};
pub use stats::BucketStats;

/// A reconciled forecast plus the per-location reasoning behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiForecast {
    pub matrix: PredictionMatrix,
    pub decisions: BTreeMap<String, SourceDecision>,
}

/// Builds prediction matrices from loaded history.
///
/// Holds no state between calls; the same inputs always produce the same
/// matrix.
#[derive(Debug, Clone)]
pub struct Forecaster {
    capacities: CapacityTable,
    expected_locations: Option<Vec<String>>,
    granularity: SelectionGranularity,
}

impl Forecaster {
    pub fn new(capacities: CapacityTable) -> Self {
        Self {
            capacities,
            expected_locations: None,
            granularity: SelectionGranularity::default(),
        }
    }

    /// Forecast exactly these locations. Any of them without history raises
    /// `EmptyHistory` instead of being left out of the matrix.
    pub fn with_expected_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = locations.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        self.expected_locations = Some(names);
        self
    }

    pub fn with_granularity(mut self, granularity: SelectionGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn capacities(&self) -> &CapacityTable {
        &self.capacities
    }

    pub fn granularity(&self) -> SelectionGranularity {
        self.granularity
    }

    /// Locations to forecast, with every capacity verified up front so a
    /// missing entry never yields a partial matrix.
    fn target_locations(&self, sets: &[&RecordSet]) -> Result<Vec<String>, ForecastError> {
        let locations = match &self.expected_locations {
            Some(expected) => expected.clone(),
            None => {
                let mut all: Vec<String> = sets.iter().flat_map(|s| s.locations()).collect();
                all.sort();
                all.dedup();
                all
            }
        };

        if locations.is_empty() {
            let window = window_label(sets);
            return Err(ForecastError::EmptyHistory { location: None, window });
        }

        for location in &locations {
            self.capacities.require(location)?;
        }

        Ok(locations)
    }

    /// Capacity-table locations with no records in any of `sets`. They
    /// cannot be forecast and are left out of the matrix, so callers should
    /// report them.
    pub fn locations_without_history(&self, sets: &[&RecordSet]) -> Vec<String> {
        let present: BTreeSet<String> = sets.iter().flat_map(|s| s.locations()).collect();
        self.capacities
            .names()
            .into_iter()
            .filter(|name| !present.contains(*name))
            .map(String::from)
            .collect()
    }

    fn warn_missing_history(&self, sets: &[&RecordSet]) {
        // With expected locations configured, a gap is already an error.
        if self.expected_locations.is_some() {
            return;
        }
        let window = window_label(sets);
        for name in self.locations_without_history(sets) {
            logging::warn(
                Component::Forecast,
                Some(&name),
                &format!("No history in window {}; left out of the forecast", window),
            );
        }
    }

    /// Single-source forecast: mean count per bucket over `history`,
    /// normalised by capacity.
    pub fn predict(&self, history: &RecordSet) -> Result<PredictionMatrix, ForecastError> {
        let result = self.predict_inner(history);
        if let Err(e) = &result {
            logging::log_failure(Component::Forecast, "predict", e);
        }
        result
    }

    fn predict_inner(&self, history: &RecordSet) -> Result<PredictionMatrix, ForecastError> {
        let locations = self.target_locations(&[history])?;
        self.warn_missing_history(&[history]);

        let mut columns = BTreeMap::new();
        for location in locations {
            let series = stats::bucket_series(history.for_location(&location));
            if series.is_empty() {
                return Err(ForecastError::EmptyHistory {
                    location: Some(location),
                    window: history.window().to_string(),
                });
            }
            let fractions = self
                .capacities
                .to_fraction(&stats::mean_series(&series), &location)?;
            columns.insert(location, fractions);
        }

        let matrix = PredictionMatrix::from_columns(columns);
        logging::info(
            Component::Forecast,
            None,
            &format!(
                "Predicted {} buckets for {} locations from window {}",
                matrix.rows().len(),
                matrix.locations().len(),
                history.window()
            ),
        );
        Ok(matrix)
    }

    /// Multi-source forecast: for each location, forecast from whichever of
    /// the three histories has the lowest dispersion.
    pub fn predict_multi(
        &self,
        primary: &RecordSet,
        alt_a: &RecordSet,
        alt_b: &RecordSet,
    ) -> Result<MultiForecast, ForecastError> {
        let result = self.predict_multi_inner(primary, alt_a, alt_b);
        if let Err(e) = &result {
            logging::log_failure(Component::Forecast, "predict_multi", e);
        }
        result
    }

    fn predict_multi_inner(
        &self,
        primary: &RecordSet,
        alt_a: &RecordSet,
        alt_b: &RecordSet,
    ) -> Result<MultiForecast, ForecastError> {
        let sets = [primary, alt_a, alt_b];
        let locations = self.target_locations(&sets)?;
        self.warn_missing_history(&sets);

        let mut columns = BTreeMap::new();
        let mut decisions = BTreeMap::new();

        for location in locations {
            let series = sets.map(|s| stats::bucket_series(s.for_location(&location)));
            let reconciled = reconcile::reconcile_location(
                &location,
                [&series[0], &series[1], &series[2]],
                self.granularity,
            );

            let Some((means, decision)) = reconciled else {
                let window = window_label(&sets);
                return Err(ForecastError::EmptyHistory {
                    location: Some(location),
                    window,
                });
            };

            logging::debug(
                Component::Forecast,
                Some(&location),
                &format!(
                    "dispersions {:?}, chosen {}",
                    decision.dispersions,
                    decision
                        .chosen
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "per-bucket".to_string())
                ),
            );

            let fractions = self.capacities.to_fraction(&means, &location)?;
            columns.insert(location.clone(), fractions);
            decisions.insert(location, decision);
        }

        let matrix = PredictionMatrix::from_columns(columns);
        logging::info(
            Component::Forecast,
            None,
            &format!(
                "Predicted {} buckets for {} locations from windows {}",
                matrix.rows().len(),
                matrix.locations().len(),
                window_label(&sets)
            ),
        );
        Ok(MultiForecast { matrix, decisions })
    }
}

fn window_label(sets: &[&RecordSet]) -> String {
    sets.iter().map(|s| s.window()).collect::<Vec<_>>().join("+")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Record, TimePoint};
    use chrono::NaiveDate;

    fn record(location: &str, label: &str, count: u32) -> Record {
        let tp: TimePoint = label.parse().unwrap();
        let dump_time = NaiveDate::from_ymd_opt(2023, 10, 18)
            .unwrap()
            .and_hms_opt(tp.hour() as u32, tp.minute() as u32, 0)
            .unwrap();
        Record {
            client_count: count,
            dump_time,
            group_id: None,
            group_name: location.to_string(),
            parent_id: None,
            building_name: None,
            time_point: tp,
        }
    }

    fn set(window: &str, records: Vec<Record>) -> RecordSet {
        RecordSet::new(window, records)
    }

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_lerner_scenario_mean_over_capacity() {
        let history = set(
            "same-weekday",
            vec![
                record("Lerner 1", "09:00", 10),
                record("Lerner 1", "09:00", 20),
                record("Lerner 1", "09:00", 30),
            ],
        );
        let matrix = Forecaster::new(CapacityTable::builtin()).predict(&history).unwrap();
        let value = matrix.get(tp("09:00"), "Lerner 1").unwrap();
        assert!((value - 20.0 / 168.0).abs() < 1e-12);
        assert!((value - 0.119).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_location_fails_without_partial_matrix() {
        let history = set(
            "same-weekday",
            vec![
                record("Lerner 1", "09:00", 10),
                record("Annex B", "09:00", 5),
            ],
        );
        let result = Forecaster::new(CapacityTable::builtin()).predict(&history);
        assert_eq!(result, Err(ForecastError::UnknownLocation("Annex B".to_string())));
    }

    #[test]
    fn test_expected_location_without_history_is_reported() {
        let history = set("same-weekday", vec![record("Lerner 1", "09:00", 10)]);
        let forecaster =
            Forecaster::new(CapacityTable::builtin()).with_expected_locations(["Lerner 1", "Lerner 2"]);
        assert_eq!(
            forecaster.predict(&history),
            Err(ForecastError::EmptyHistory {
                location: Some("Lerner 2".to_string()),
                window: "same-weekday".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_history_is_an_error_not_an_empty_matrix() {
        let result = Forecaster::new(CapacityTable::builtin()).predict(&set("same-weekday", vec![]));
        assert!(matches!(result, Err(ForecastError::EmptyHistory { location: None, .. })));
    }

    #[test]
    fn test_unpadded_labels_share_one_bucket() {
        let history = set(
            "same-weekday",
            vec![record("Lerner 1", "9:5", 10), record("Lerner 1", "09:05", 30)],
        );
        let matrix = Forecaster::new(CapacityTable::builtin()).predict(&history).unwrap();
        assert_eq!(matrix.rows().len(), 1);
        assert_eq!(matrix.get(tp("09:05"), "Lerner 1"), Some(20.0 / 168.0));
    }

    #[test]
    fn test_predict_multi_uses_each_source_and_records_decisions() {
        let capacities = CapacityTable::from_entries([("Hall", 100), ("Lab", 50)]).unwrap();
        let primary = set(
            "same-weekday",
            vec![
                record("Hall", "09:00", 0),
                record("Hall", "09:00", 100),
                record("Lab", "09:00", 10),
                record("Lab", "09:00", 12),
            ],
        );
        let alt_a = set(
            "week-ahead",
            vec![
                record("Hall", "09:00", 40),
                record("Hall", "09:00", 44),
                record("Lab", "09:00", 0),
                record("Lab", "09:00", 50),
            ],
        );
        let alt_b = set("week-before", vec![record("Hall", "09:00", 90)]);

        let forecast = Forecaster::new(capacities)
            .predict_multi(&primary, &alt_a, &alt_b)
            .unwrap();

        assert_eq!(forecast.decisions["Hall"].chosen, Some(HistorySource::AltA));
        assert_eq!(forecast.decisions["Lab"].chosen, Some(HistorySource::Primary));
        assert_eq!(forecast.matrix.get(tp("09:00"), "Hall"), Some(0.42));
        assert_eq!(forecast.matrix.get(tp("09:00"), "Lab"), Some(11.0 / 50.0));
        assert_eq!(forecast.decisions["Lab"].dispersions[2], None);
    }

    #[test]
    fn test_locations_without_history_are_listed() {
        let capacities = CapacityTable::from_entries([("Hall", 100), ("Lab", 50), ("Annex", 20)]).unwrap();
        let primary = set("same-weekday", vec![record("Hall", "09:00", 10)]);
        let alt_a = set("week-ahead", vec![record("Lab", "09:00", 10)]);
        let forecaster = Forecaster::new(capacities);

        assert_eq!(forecaster.locations_without_history(&[&primary]), vec!["Annex", "Lab"]);
        assert_eq!(forecaster.locations_without_history(&[&primary, &alt_a]), vec!["Annex"]);

        // The gap is reported, not turned into an empty column.
        let matrix = forecaster.predict(&primary).unwrap();
        assert_eq!(matrix.locations(), &["Hall"]);
    }

    #[test]
    fn test_predict_multi_logs_summary_and_gaps() {
        let log_path = std::env::temp_dir().join(format!("density_forecast_fcst_{}.log", std::process::id()));
        let _ = std::fs::remove_file(&log_path);
        logging::init_logger(logging::LogLevel::Info, log_path.to_str(), true);

        let capacities = CapacityTable::from_entries([("Hall", 100), ("Annex", 20)]).unwrap();
        let primary = set("same-weekday", vec![record("Hall", "09:00", 10), record("Hall", "09:15", 12)]);
        let alt_a = set("week-ahead", vec![]);
        let alt_b = set("week-before", vec![]);
        Forecaster::new(capacities)
            .predict_multi(&primary, &alt_a, &alt_b)
            .unwrap();

        let log = std::fs::read_to_string(&log_path).unwrap();
        let _ = std::fs::remove_file(&log_path);
        assert!(log.contains(
            "INFO FCST: Predicted 2 buckets for 1 locations from windows same-weekday+week-ahead+week-before"
        ));
        assert!(log.contains("WARN FCST [Annex]: No history in window same-weekday+week-ahead+week-before"));
    }
}
