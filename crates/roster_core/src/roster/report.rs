use crate::attributes::{AttrValue, PlayerRecord};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: AttrValue,
    pub new: AttrValue,
}

impl FieldChange {
    /// Change of `field` on `record` to `new`, reading the current value.
    pub fn on(record: &PlayerRecord, field: &str, new: impl Into<AttrValue>) -> Self {
        Self {
            field: field.to_string(),
            old: record.get(field).cloned().unwrap_or(AttrValue::Missing),
            new: new.into(),
        }
    }
}

/// Every field change proposed for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordChange {
    /// Index of the record in the batch.
    pub index: usize,
    pub fields: Vec<FieldChange>,
}

/// Outcome of one batch operation. Nothing is written until [`BatchReport::apply`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub operation: String,
    pub processed: usize,
    pub changed: usize,
    pub changes: Vec<RecordChange>,
}

impl BatchReport {
    pub fn new(operation: impl Into<String>, processed: usize, changes: Vec<RecordChange>) -> Self {
        Self { operation: operation.into(), processed, changed: changes.len(), changes }
    }

    /// Write every change onto `records`. Returns the number of records touched.
    pub fn apply(&self, records: &mut [PlayerRecord]) -> usize {
        let mut touched = 0;
        for change in &self.changes {
            let Some(record) = records.get_mut(change.index) else {
                continue;
            };
            for field in &change.fields {
                record.set(field.field.clone(), field.new.clone());
            }
            touched += 1;
        }
        touched
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Report of the invalid-archetype fix: the batch plus why flagged records
/// could not be fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FixReport {
    /// Records whose archetype does not belong to their position group.
    pub flagged: usize,
    pub batch: BatchReport,
    /// Position groups for which no archetype could be calculated.
    pub calculation_failed: Vec<String>,
    /// Calculated archetypes missing from the master list.
    pub id_not_found: Vec<String>,
}

impl FixReport {
    pub fn failed(&self) -> usize {
        self.flagged.saturating_sub(self.batch.changed)
    }
}
