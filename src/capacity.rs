/// Location capacity registry.
///
/// Maps each monitored location name (as it appears in `group_name`) to the
/// maximum expected simultaneous occupancy. Forecast counts are divided by
/// these numbers to produce occupancy fractions.
///
/// The table is data, not a global: `CapacityTable::builtin()` provides the
/// campus defaults, and configuration or tests may extend or replace it.

use std::collections::BTreeMap;

use crate::model::ForecastError;

// ---------------------------------------------------------------------------
// Built-in registry
// ---------------------------------------------------------------------------

/// Capacity metadata for a single monitored location.
pub struct LocationCapacity {
    /// Exact `group_name` used by the sensor database.
    pub name: &'static str,
    /// Maximum expected simultaneous occupancy.
    pub capacity: u32,
}

/// Default capacities for the campus locations covered by the density feed.
pub static DEFAULT_CAPACITIES: &[LocationCapacity] = &[
    LocationCapacity { name: "Architectural and Fine Arts Library 1", capacity: 27 },
    LocationCapacity { name: "Architectural and Fine Arts Library 2", capacity: 362 },
    LocationCapacity { name: "Architectural and Fine Arts Library 3", capacity: 220 },
    LocationCapacity { name: "Butler Library 2", capacity: 729 },
    LocationCapacity { name: "Butler Library 3", capacity: 438 },
    LocationCapacity { name: "Butler Library 4", capacity: 414 },
    LocationCapacity { name: "Butler Library 301", capacity: 292 },
    LocationCapacity { name: "Butler Library 5", capacity: 236 },
    LocationCapacity { name: "Butler Library 6", capacity: 255 },
    LocationCapacity { name: "Butler Library stk", capacity: 245 },
    LocationCapacity { name: "JJ's Place", capacity: 185 },
    LocationCapacity { name: "John Jay Dining Hall", capacity: 319 },
    LocationCapacity { name: "Lehman Library 2", capacity: 213 },
    LocationCapacity { name: "Lehman Library 3", capacity: 700 },
    LocationCapacity { name: "Lerner 1", capacity: 168 },
    LocationCapacity { name: "Lerner 2", capacity: 362 },
    LocationCapacity { name: "Lerner 3", capacity: 357 },
    LocationCapacity { name: "Lerner 4", capacity: 354 },
    LocationCapacity { name: "Lerner 5", capacity: 373 },
    LocationCapacity { name: "Roone Arledge Auditorium", capacity: 923 },
    LocationCapacity { name: "Science and Engineering Library", capacity: 234 },
    LocationCapacity { name: "Starr East Asian Library", capacity: 257 },
    LocationCapacity { name: "Uris/Watson Library", capacity: 1046 },
];

// ---------------------------------------------------------------------------
// Capacity table
// ---------------------------------------------------------------------------

/// Injectable location → capacity mapping used at forecast time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapacityTable {
    entries: BTreeMap<String, u32>,
}

impl CapacityTable {
    /// An empty table. Every lookup fails until entries are added.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in campus registry.
    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_CAPACITIES
                .iter()
                .map(|l| (l.name.to_string(), l.capacity))
                .collect(),
        }
    }

    /// Builds a table from explicit entries. Zero capacities are rejected
    /// because they would turn every fraction into infinity.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ForecastError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut table = Self::empty();
        for (name, capacity) in entries {
            table.insert(name, capacity)?;
        }
        Ok(table)
    }

    /// Adds or replaces one location's capacity.
    pub fn insert(&mut self, name: impl Into<String>, capacity: u32) -> Result<(), ForecastError> {
        let name = name.into();
        if capacity == 0 {
            return Err(ForecastError::Config {
                field: format!("capacity.locations.\"{}\"", name),
                message: "capacity must be positive".to_string(),
            });
        }
        self.entries.insert(name, capacity);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Looks up a capacity, failing loudly for unregistered locations.
    pub fn require(&self, name: &str) -> Result<u32, ForecastError> {
        self.get(name)
            .ok_or_else(|| ForecastError::UnknownLocation(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered location names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Divides every value in `counts` by the location's capacity.
    ///
    /// Values are not clamped: a historical mean above capacity yields a
    /// fraction above 1.0.
    pub fn to_fraction<K: Clone + Ord>(
        &self,
        counts: &BTreeMap<K, f64>,
        name: &str,
    ) -> Result<BTreeMap<K, f64>, ForecastError> {
        let capacity = f64::from(self.require(name)?);
        Ok(counts
            .iter()
            .map(|(k, v)| (k.clone(), v / capacity))
            .collect())
    }
}

/// Free-function form of [`CapacityTable::to_fraction`].
pub fn to_fraction<K: Clone + Ord>(
    counts: &BTreeMap<K, f64>,
    name: &str,
    capacities: &CapacityTable,
) -> Result<BTreeMap<K, f64>, ForecastError> {
    capacities.to_fraction(counts, name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
