/// Per-bucket summary statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Record, TimePoint};

/// Count statistics for one location at one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub samples: usize,
    pub mean: f64,
    /// Sample standard deviation; 0.0 when only one sample exists.
    pub std_dev: f64,
}

impl BucketStats {
    /// Summarises a non-empty slice of counts. Returns `None` for an empty slice.
    pub fn from_counts(counts: &[f64]) -> Option<Self> {
        if counts.is_empty() {
            return None;
        }
        let n = counts.len() as f64;
        let mean = counts.iter().sum::<f64>() / n;
        let std_dev = if counts.len() < 2 {
            0.0
        } else {
            let ss: f64 = counts.iter().map(|c| (c - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        };
        Some(Self {
            samples: counts.len(),
            mean,
            std_dev,
        })
    }

    /// Whether the bucket has enough samples for its spread to mean anything.
    pub fn has_dispersion(&self) -> bool {
        self.samples >= 2
    }
}

/// Groups records by time bucket and summarises each bucket's counts.
pub fn bucket_series<'a, I>(records: I) -> BTreeMap<TimePoint, BucketStats>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut grouped: BTreeMap<TimePoint, Vec<f64>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.time_point)
            .or_default()
            .push(f64::from(record.client_count));
    }

    grouped
        .into_iter()
        .filter_map(|(tp, counts)| BucketStats::from_counts(&counts).map(|s| (tp, s)))
        .collect()
}

/// Mean count per bucket.
pub fn mean_series(series: &BTreeMap<TimePoint, BucketStats>) -> BTreeMap<TimePoint, f64> {
    series.iter().map(|(tp, s)| (*tp, s.mean)).collect()
}

/// Mean of the per-bucket standard deviations, over buckets with at least
/// two samples. `None` when no bucket qualifies.
pub fn dispersion(series: &BTreeMap<TimePoint, BucketStats>) -> Option<f64> {
    let spreads: Vec<f64> = series
        .values()
        .filter(|s| s.has_dispersion())
        .map(|s| s.std_dev)
        .collect();
    if spreads.is_empty() {
        None
    } else {
        Some(spreads.iter().sum::<f64>() / spreads.len() as f64)
    }
}
