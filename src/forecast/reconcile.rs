/// Multi-source reconciliation.
///
/// Given the same location's history under three window strategies, pick
/// the source whose per-bucket estimates are most consistent (lowest
/// dispersion) and forecast from it. Choices and dispersions are kept so
/// callers can audit why a source won.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::forecast::stats::{dispersion, BucketStats};
use crate::model::TimePoint;

/// Which of the three inputs to `predict_multi` a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Primary,
    AltA,
    AltB,
}

impl HistorySource {
    /// Tie-break order: earlier wins.
    pub const ALL: [HistorySource; 3] = [HistorySource::Primary, HistorySource::AltA, HistorySource::AltB];

    pub fn index(&self) -> usize {
        match self {
            HistorySource::Primary => 0,
            HistorySource::AltA => 1,
            HistorySource::AltB => 2,
        }
    }
}

impl fmt::Display for HistorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistorySource::Primary => write!(f, "primary"),
            HistorySource::AltA => write!(f, "alt_a"),
            HistorySource::AltB => write!(f, "alt_b"),
        }
    }
}

/// Whether reconciliation picks one source per location or per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionGranularity {
    #[default]
    Location,
    Bucket,
}

/// The reconciliation outcome for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDecision {
    pub location: String,
    /// Dispersion per source, indexed by `HistorySource::index`. `None` when
    /// the source has no bucket with two or more samples.
    pub dispersions: [Option<f64>; 3],
    /// Record count per source.
    pub samples: [usize; 3],
    /// Source used for the whole location. `None` under bucket granularity.
    pub chosen: Option<HistorySource>,
    /// Source used at every bucket of the forecast.
    pub bucket_choices: BTreeMap<TimePoint, HistorySource>,
}

/// Picks the lowest measurable spread, ties to the earlier source. Falls
/// back to the first source with any data when none has a measurable spread.
fn select(spreads: [Option<f64>; 3], present: [bool; 3]) -> Option<HistorySource> {
    let mut best: Option<(HistorySource, f64)> = None;
    for source in HistorySource::ALL {
        if let Some(spread) = spreads[source.index()] {
            if best.is_none_or(|(_, b)| spread < b) {
                best = Some((source, spread));
            }
        }
    }

    best.map(|(s, _)| s).or_else(|| {
        HistorySource::ALL
            .into_iter()
            .find(|s| present[s.index()])
    })
}

/// Reconciles one location's three bucket series into a single mean-count
/// series plus the decision record that produced it.
///
/// Returns `None` when all three series are empty.
pub fn reconcile_location(
    location: &str,
    series: [&BTreeMap<TimePoint, BucketStats>; 3],
    granularity: SelectionGranularity,
) -> Option<(BTreeMap<TimePoint, f64>, SourceDecision)> {
    let dispersions = series.map(dispersion);
    let samples = series.map(|s| s.values().map(|b| b.samples).sum::<usize>());
    let present = series.map(|s| !s.is_empty());

    let mut means = BTreeMap::new();
    let mut bucket_choices = BTreeMap::new();

    let chosen = match granularity {
        SelectionGranularity::Location => {
            let source = select(dispersions, present)?;
            for (tp, stats) in series[source.index()] {
                means.insert(*tp, stats.mean);
                bucket_choices.insert(*tp, source);
            }
            Some(source)
        }
        SelectionGranularity::Bucket => {
            let buckets: BTreeSet<TimePoint> =
                series.iter().flat_map(|s| s.keys().copied()).collect();
            if buckets.is_empty() {
                return None;
            }
            for tp in buckets {
                let at = series.map(|s| s.get(&tp));
                let spreads = at.map(|b| b.filter(|b| b.has_dispersion()).map(|b| b.std_dev));
                let here = at.map(|b| b.is_some());
                if let Some(source) = select(spreads, here) {
                    if let Some(stats) = at[source.index()] {
                        means.insert(tp, stats.mean);
                        bucket_choices.insert(tp, source);
                    }
                }
            }
            None
        }
    };

    Some((
        means,
        SourceDecision {
            location: location.to_string(),
            dispersions,
            samples,
            chosen,
            bucket_choices,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn series(buckets: &[(&str, &[f64])]) -> BTreeMap<TimePoint, BucketStats> {
        buckets
            .iter()
            .map(|(t, counts)| (tp(t), BucketStats::from_counts(counts).unwrap()))
            .collect()
    }

    #[test]
    fn test_location_granularity_picks_lowest_dispersion() {
        let noisy = series(&[("09:00", &[0.0, 100.0])]);
        let tight = series(&[("09:00", &[48.0, 52.0])]);
        let medium = series(&[("09:00", &[30.0, 70.0])]);

        let (means, decision) =
            reconcile_location("Lerner 1", [&noisy, &tight, &medium], SelectionGranularity::Location)
                .unwrap();

        assert_eq!(decision.chosen, Some(HistorySource::AltA));
        assert_eq!(means[&tp("09:00")], 50.0);
        assert!(decision.dispersions[1].unwrap() < decision.dispersions[2].unwrap());
        assert!(decision.dispersions[2].unwrap() < decision.dispersions[0].unwrap());
        assert_eq!(decision.samples, [2, 2, 2]);
    }

    #[test]
    fn test_ties_go_to_earlier_source() {
        let a = series(&[("09:00", &[10.0, 20.0])]);
        let b = series(&[("09:00", &[110.0, 120.0])]);
        let (_, decision) =
            reconcile_location("Lerner 1", [&b, &a, &a], SelectionGranularity::Location).unwrap();
        assert_eq!(decision.chosen, Some(HistorySource::Primary));
    }

    #[test]
    fn test_source_without_measurable_spread_is_only_a_fallback() {
        // A single sample has zero spread but says nothing about reliability.
        let single = series(&[("09:00", &[10.0])]);
        let spread = series(&[("09:00", &[10.0, 30.0])]);
        let empty = BTreeMap::new();

        let (_, decision) =
            reconcile_location("Lerner 1", [&single, &spread, &empty], SelectionGranularity::Location)
                .unwrap();
        assert_eq!(decision.chosen, Some(HistorySource::AltA));
        assert_eq!(decision.dispersions, [None, Some(200.0_f64.sqrt()), None]);

        let (means, decision) =
            reconcile_location("Lerner 1", [&empty, &single, &empty], SelectionGranularity::Location)
                .unwrap();
        assert_eq!(decision.chosen, Some(HistorySource::AltA));
        assert_eq!(means[&tp("09:00")], 10.0);
    }

    #[test]
    fn test_all_empty_sources_yield_nothing() {
        let empty = BTreeMap::new();
        assert!(reconcile_location("X", [&empty, &empty, &empty], SelectionGranularity::Location).is_none());
        assert!(reconcile_location("X", [&empty, &empty, &empty], SelectionGranularity::Bucket).is_none());
    }

    #[test]
    fn test_bucket_granularity_chooses_independently_per_bucket() {
        let primary = series(&[("09:00", &[10.0, 12.0]), ("10:00", &[0.0, 100.0])]);
        let alt_a = series(&[("09:00", &[0.0, 40.0]), ("10:00", &[60.0, 62.0])]);
        let alt_b = series(&[("11:00", &[5.0])]);

        let (means, decision) =
            reconcile_location("Lerner 1", [&primary, &alt_a, &alt_b], SelectionGranularity::Bucket)
                .unwrap();

        assert_eq!(decision.chosen, None);
        assert_eq!(decision.bucket_choices[&tp("09:00")], HistorySource::Primary);
        assert_eq!(decision.bucket_choices[&tp("10:00")], HistorySource::AltA);
        assert_eq!(decision.bucket_choices[&tp("11:00")], HistorySource::AltB);
        assert_eq!(means[&tp("09:00")], 11.0);
        assert_eq!(means[&tp("10:00")], 61.0);
        assert_eq!(means[&tp("11:00")], 5.0);
    }
}
