//! Per-position weight tables shared by the archetype and overall scorers.
//!
//! One row of the weight sheet is one [`WeightEntry`]: the attribute weights
//! for a (position, archetype) pair plus the band used to scale an overall.

use serde::Serialize;
use tracing::debug;

pub const TOTAL_COLUMN: &str = "Total";
pub const DESIRED_HIGH_COLUMN: &str = "DesiredHigh";
pub const DESIRED_LOW_COLUMN: &str = "DesiredLow";

/// Band used when the sheet has no DesiredHigh / DesiredLow column.
pub const DEFAULT_DESIRED_HIGH: f64 = 99.0;
pub const DEFAULT_DESIRED_LOW: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry {
    /// Archetype (or rating) name of the row.
    pub key: String,
    /// Short attribute key → weight, in column order. Empty cells are dropped.
    pub weights: Vec<(String, f64)>,
    pub desired_low: f64,
    pub desired_high: f64,
    pub total: Option<f64>,
}

impl WeightEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            weights: Vec::new(),
            desired_low: DEFAULT_DESIRED_LOW,
            desired_high: DEFAULT_DESIRED_HIGH,
            total: None,
        }
    }

    /// Build a row from `(column, cell)` pairs, `None` marking an empty cell.
    ///
    /// The Total and band columns are split off. A band column that exists
    /// but is empty reads as NaN, which later makes the overall undefined.
    pub fn from_cells<I, S>(key: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<f64>)>,
        S: Into<String>,
    {
        let mut entry = Self::new(key);
        for (column, cell) in cells {
            let column = column.into();
            match column.as_str() {
                TOTAL_COLUMN => entry.total = cell.filter(|v| !v.is_nan()),
                DESIRED_HIGH_COLUMN => entry.desired_high = cell.unwrap_or(f64::NAN),
                DESIRED_LOW_COLUMN => entry.desired_low = cell.unwrap_or(f64::NAN),
                _ => match cell {
                    Some(weight) if !weight.is_nan() => entry.weights.push((column, weight)),
                    _ => {}
                },
            }
        }
        entry
    }

    pub fn with_weight(mut self, short: impl Into<String>, weight: f64) -> Self {
        self.weights.push((short.into(), weight));
        self
    }

    pub fn with_band(mut self, low: f64, high: f64) -> Self {
        self.desired_low = low;
        self.desired_high = high;
        self
    }

    /// Sum of every weight, mapped to a readable name or not.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }
}

/// Weight rows grouped by position, both levels in sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightTable {
    positions: Vec<(String, Vec<WeightEntry>)>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. A row repeating an existing (position, key) pair replaces it.
    pub fn insert(&mut self, position: impl Into<String>, entry: WeightEntry) {
        let position = position.into();
        let index = match self.positions.iter().position(|(p, _)| *p == position) {
            Some(index) => index,
            None => {
                self.positions.push((position, Vec::new()));
                self.positions.len() - 1
            }
        };

        let (name, entries) = &mut self.positions[index];
        match entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => {
                debug!("Weight row {}/{} repeated, keeping the later one", name, entry.key);
                *existing = entry;
            }
            None => entries.push(entry),
        }
    }

    pub fn with_entry(mut self, position: impl Into<String>, entry: WeightEntry) -> Self {
        self.insert(position, entry);
        self
    }

    /// Rows of a position; `None` when the position has none.
    pub fn position(&self, position: &str) -> Option<&[WeightEntry]> {
        self.positions
            .iter()
            .find(|(p, entries)| p == position && !entries.is_empty())
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn entry(&self, position: &str, key: &str) -> Option<&WeightEntry> {
        self.position(position)?.iter().find(|e| e.key == key)
    }

    pub fn positions(&self) -> impl Iterator<Item = &str> {
        self.positions.iter().map(|(p, _)| p.as_str())
    }

    /// Number of rows across all positions.
    pub fn len(&self) -> usize {
        self.positions.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
