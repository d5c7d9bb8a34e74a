/// History window strategies.
///
/// A forecast for a given day is built from past observations that fall on
/// the "same" day in earlier years. Each strategy below picks which past
/// days count: the same ISO week and weekday, optionally widened to the
/// same weekday one week before and/or after.
///
/// # Reference date injection
/// Every window is anchored on an explicit `NaiveDate` rather than reading
/// the clock, so window membership is deterministic in tests.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Which past days are considered history for the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowStrategy {
    /// Same ISO week and weekday in every year of history.
    SameWeekday,
    /// Same weekday, this week or the following week.
    WithWeekAhead,
    /// Same weekday, this week or the preceding week.
    WithWeekBefore,
    /// Same weekday, this week or either neighbouring week.
    WithBothNeighbours,
}

impl WindowStrategy {
    pub const ALL: [WindowStrategy; 4] = [
        WindowStrategy::SameWeekday,
        WindowStrategy::WithWeekAhead,
        WindowStrategy::WithWeekBefore,
        WindowStrategy::WithBothNeighbours,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WindowStrategy::SameWeekday => "same-weekday",
            WindowStrategy::WithWeekAhead => "week-ahead",
            WindowStrategy::WithWeekBefore => "week-before",
            WindowStrategy::WithBothNeighbours => "both-neighbours",
        }
    }

    /// Day offsets (in weeks) from the reference date that this strategy covers.
    fn week_offsets(&self) -> &'static [i64] {
        match self {
            WindowStrategy::SameWeekday => &[0],
            WindowStrategy::WithWeekAhead => &[0, 1],
            WindowStrategy::WithWeekBefore => &[0, -1],
            WindowStrategy::WithBothNeighbours => &[0, 1, -1],
        }
    }
}

impl fmt::Display for WindowStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for WindowStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowStrategy::ALL
            .iter()
            .copied()
            .find(|w| w.label() == s)
            .ok_or_else(|| format!("unknown history window '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// One (ISO week, ISO weekday) pair a record must match to be in a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdaySlot {
    pub iso_week: u32,
    /// Monday = 1 ... Sunday = 7, matching PostgreSQL `ISODOW`.
    pub iso_weekday: u32,
}

/// A strategy resolved against a concrete reference date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryWindow {
    pub strategy: WindowStrategy,
    pub reference_date: NaiveDate,
    slots: Vec<WeekdaySlot>,
}

impl HistoryWindow {
    pub fn new(strategy: WindowStrategy, reference_date: NaiveDate) -> Self {
        // Shift by whole weeks and re-read the ISO week so that week 1 and
        // week 52/53 neighbours wrap across the year boundary.
        let slots = strategy
            .week_offsets()
            .iter()
            .map(|weeks| {
                let day = reference_date + Duration::weeks(*weeks);
                WeekdaySlot {
                    iso_week: day.iso_week().week(),
                    iso_weekday: day.weekday().number_from_monday(),
                }
            })
            .collect();

        Self {
            strategy,
            reference_date,
            slots,
        }
    }

    pub fn label(&self) -> &'static str {
        self.strategy.label()
    }

    pub fn slots(&self) -> &[WeekdaySlot] {
        &self.slots
    }

    /// Whether a historical timestamp falls inside this window.
    pub fn matches(&self, dt: &NaiveDateTime) -> bool {
        let week = dt.iso_week().week();
        let weekday = dt.weekday().number_from_monday();
        self.slots
            .iter()
            .any(|s| s.iso_week == week && s.iso_weekday == weekday)
    }

    /// Renders the window as a parameterised PostgreSQL `WHERE` clause over
    /// `d.dump_time`, returning the clause and its parameters in order.
    pub fn sql_filter(&self) -> (String, Vec<i32>) {
        let mut clauses = Vec::with_capacity(self.slots.len());
        let mut params = Vec::with_capacity(self.slots.len() * 2);

        for (i, slot) in self.slots.iter().enumerate() {
            clauses.push(format!(
                "(extract(WEEK FROM d.dump_time)::int = ${} AND extract(ISODOW FROM d.dump_time)::int = ${})",
                i * 2 + 1,
                i * 2 + 2
            ));
            params.push(slot.iso_week as i32);
            params.push(slot.iso_weekday as i32);
        }

        (format!(" WHERE {}", clauses.join(" OR ")), params)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday 2024-10-16, ISO week 42.
    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 16).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_weekday_matches_same_iso_week_in_prior_year() {
        let window = HistoryWindow::new(WindowStrategy::SameWeekday, reference());
        assert_eq!(
            window.slots(),
            &[WeekdaySlot { iso_week: 42, iso_weekday: 3 }]
        );
        // Wednesday of ISO week 42 in 2023 is 2023-10-18.
        assert!(window.matches(&noon(2023, 10, 18)));
        // Thursday the same week is a different weekday.
        assert!(!window.matches(&noon(2023, 10, 19)));
        // Wednesday a week later is outside the exact window.
        assert!(!window.matches(&noon(2023, 10, 25)));
    }

    #[test]
    fn test_week_ahead_and_week_before_widen_the_window() {
        let ahead = HistoryWindow::new(WindowStrategy::WithWeekAhead, reference());
        let before = HistoryWindow::new(WindowStrategy::WithWeekBefore, reference());
        let both = HistoryWindow::new(WindowStrategy::WithBothNeighbours, reference());

        let next_week = noon(2023, 10, 25);
        let prev_week = noon(2023, 10, 11);

        assert!(ahead.matches(&next_week) && !ahead.matches(&prev_week));
        assert!(before.matches(&prev_week) && !before.matches(&next_week));
        assert!(both.matches(&prev_week) && both.matches(&next_week));
        assert!(both.matches(&noon(2023, 10, 18)));
    }

    #[test]
    fn test_neighbour_weeks_wrap_across_year_boundary() {
        // Monday 2024-12-30 is ISO week 1 of 2025; the week before is week 52.
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let window = HistoryWindow::new(WindowStrategy::WithWeekBefore, date);
        let weeks: Vec<u32> = window.slots().iter().map(|s| s.iso_week).collect();
        assert_eq!(weeks, vec![1, 52]);
    }

    #[test]
    fn test_sql_filter_numbers_parameters_per_slot() {
        let window = HistoryWindow::new(WindowStrategy::WithBothNeighbours, reference());
        let (clause, params) = window.sql_filter();
        assert!(clause.starts_with(" WHERE "));
        assert!(clause.contains("$1") && clause.contains("$6"));
        assert_eq!(clause.matches(" OR ").count(), 2);
        assert_eq!(params, vec![42, 3, 43, 3, 41, 3]);
    }

    #[test]
    fn test_strategy_labels_round_trip() {
        for strategy in WindowStrategy::ALL {
            assert_eq!(strategy.label().parse::<WindowStrategy>(), Ok(strategy));
        }
        assert!("fortnight".parse::<WindowStrategy>().is_err());
    }
}
