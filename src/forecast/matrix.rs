/// Prediction matrix: time bucket rows × location columns.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;

use crate::model::TimePoint;

/// One row of the matrix: a time bucket and one cell per location.
///
/// `None` means the location has no history at this bucket. It is never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub time: TimePoint,
    pub values: Vec<Option<f64>>,
}

/// Predicted occupancy fractions for today, rows sorted ascending by time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionMatrix {
    locations: Vec<String>,
    rows: Vec<MatrixRow>,
}

impl PredictionMatrix {
    /// Assembles per-location fraction series into one matrix. Rows are the
    /// union of every series' buckets; columns follow location name order.
    pub fn from_columns(columns: BTreeMap<String, BTreeMap<TimePoint, f64>>) -> Self {
        let times: BTreeSet<TimePoint> = columns
            .values()
            .flat_map(|series| series.keys().copied())
            .collect();

        let rows = times
            .into_iter()
            .map(|time| MatrixRow {
                time,
                values: columns
                    .values()
                    .map(|series| series.get(&time).copied())
                    .collect(),
            })
            .collect();

        Self {
            locations: columns.into_keys().collect(),
            rows,
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn time_points(&self) -> Vec<TimePoint> {
        self.rows.iter().map(|r| r.time).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, location: &str) -> Option<usize> {
        self.locations.iter().position(|l| l == location)
    }

    /// The fraction for one cell, or `None` when the location is unknown to
    /// the matrix or has no history at that bucket.
    pub fn get(&self, time: TimePoint, location: &str) -> Option<f64> {
        let col = self.column_index(location)?;
        let row = self.rows.binary_search_by(|r| r.time.cmp(&time)).ok()?;
        self.rows[row].values[col]
    }

    /// Every bucket for one location, absent cells included.
    pub fn column(&self, location: &str) -> Option<Vec<(TimePoint, Option<f64>)>> {
        let col = self.column_index(location)?;
        Some(self.rows.iter().map(|r| (r.time, r.values[col])).collect())
    }

    /// All locations at one bucket, keyed by name. Absent cells are omitted.
    pub fn row(&self, time: TimePoint) -> Option<BTreeMap<&str, f64>> {
        let row = self.rows.binary_search_by(|r| r.time.cmp(&time)).ok()?;
        Some(
            self.locations
                .iter()
                .zip(&self.rows[row].values)
                .filter_map(|(loc, v)| v.map(|v| (loc.as_str(), v)))
                .collect(),
        )
    }

    /// Writes the matrix as CSV: a `time` column then one column per
    /// location. Absent cells are left empty.
    pub fn write_csv(&self, writer: impl Write) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);

        let mut header = vec!["time".to_string()];
        header.extend(self.locations.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.time.to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| format!("{:.6}", v)).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Renders a fixed-width text table with percentages, for terminals.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let width = self
            .locations
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(6);

        let _ = write!(out, "{:<5}", "time");
        for loc in &self.locations {
            let _ = write!(out, "  {:>width$}", loc, width = width);
        }
        out.push('\n');

        for row in &self.rows {
            let _ = write!(out, "{:<5}", row.time.to_string());
            for value in &row.values {
                let cell = match value {
                    Some(v) => format!("{:.1}%", v * 100.0),
                    None => "-".to_string(),
                };
                let _ = write!(out, "  {:>width$}", cell, width = width);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn sample() -> PredictionMatrix {
        let mut columns = BTreeMap::new();
        columns.insert(
            "Lerner 2".to_string(),
            BTreeMap::from([(tp("10:00"), 0.5), (tp("9:00"), 0.25)]),
        );
        columns.insert(
            "Butler Library 2".to_string(),
            BTreeMap::from([(tp("09:00"), 0.1)]),
        );
        PredictionMatrix::from_columns(columns)
    }

    #[test]
    fn test_rows_are_union_of_buckets_sorted_by_time() {
        let m = sample();
        let labels: Vec<String> = m.time_points().iter().map(|t| t.to_string()).collect();
        assert_eq!(labels, vec!["09:00", "10:00"]);
        assert_eq!(m.locations(), &["Butler Library 2", "Lerner 2"]);
    }

    #[test]
    fn test_missing_bucket_stays_absent() {
        let m = sample();
        assert_eq!(m.get(tp("10:00"), "Butler Library 2"), None);
        assert_eq!(m.get(tp("10:00"), "Lerner 2"), Some(0.5));
        assert_eq!(
            m.column("Butler Library 2"),
            Some(vec![(tp("09:00"), Some(0.1)), (tp("10:00"), None)])
        );
        assert_eq!(m.row(tp("10:00")).unwrap().len(), 1);
        assert!(m.column("Nowhere").is_none());
    }

    #[test]
    fn test_csv_leaves_absent_cells_blank() {
        let mut out = Vec::new();
        sample().write_csv(&mut out).expect("csv export should succeed");
        let csv = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "time,Butler Library 2,Lerner 2");
        assert_eq!(lines[1], "09:00,0.100000,0.250000");
        assert_eq!(lines[2], "10:00,,0.500000");
    }

    #[test]
    fn test_json_shape_uses_labels_and_nulls() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["rows"][1]["time"], "10:00");
        assert!(json["rows"][1]["values"][0].is_null());
    }

    #[test]
    fn test_render_table_marks_absent_cells() {
        let table = sample().render_table();
        assert!(table.contains("50.0%"));
        assert!(table.lines().nth(2).unwrap().contains('-'));
    }

    #[test]
    fn test_render_table_sizes_columns_by_characters() {
        let mut columns = BTreeMap::new();
        columns.insert("Café Österreich".to_string(), BTreeMap::from([(tp("09:00"), 0.5)]));
        let table = PredictionMatrix::from_columns(columns).render_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "time   Café Österreich");
        assert_eq!(lines[0].chars().count(), lines[1].chars().count());
    }
}
