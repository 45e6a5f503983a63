//! Whole-roster operations: archetype regeneration and conversion, overall
//! and rating recalculation, and archetype diagnosis.
//!
//! Every operation only reads the records and returns the proposed changes;
//! [`BatchReport::apply`] writes them back.

pub mod diagnosis;
pub mod report;

pub use diagnosis::{archetype_prefix, player_label, ArchetypeDiagnosis};
pub use report::{BatchReport, FieldChange, FixReport, RecordChange};

use crate::attributes::{AttrValue, AttributeNameMap, PlayerRecord, ARCHETYPE_ID_KEY, ARCHETYPE_KEY, OVERALL_KEY};
use crate::config::EngineConfig;
use crate::formula::calculator::{CompiledFormulaSet, RatingCalculator};
use crate::formula::eval::EvaluatorOptions;
use crate::scoring::{ArchetypeScorer, OverallScorer, WeightTable};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Batches larger than this run on the rayon pool.
const PARALLEL_THRESHOLD: usize = 64;

/// Archetype value that marks a player as not yet classified.
const UNKNOWN_ARCHETYPE: &str = "Unknown";

/// The scorers and calculator behind every roster operation.
pub struct RosterEngine {
    config: Arc<EngineConfig>,
    archetypes: ArchetypeScorer,
    overalls: OverallScorer,
    ratings: RatingCalculator,
}

impl RosterEngine {
    pub fn new(
        config: Arc<EngineConfig>,
        names: Arc<AttributeNameMap>,
        weights: Arc<WeightTable>,
        formulas: CompiledFormulaSet,
    ) -> Self {
        Self::with_options(config, names, weights, formulas, EvaluatorOptions::default())
    }

    pub fn with_options(
        config: Arc<EngineConfig>,
        names: Arc<AttributeNameMap>,
        weights: Arc<WeightTable>,
        formulas: CompiledFormulaSet,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            archetypes: ArchetypeScorer::new(Arc::clone(&weights), Arc::clone(&names), Arc::clone(&config)),
            overalls: OverallScorer::new(weights, names, Arc::clone(&config)),
            ratings: RatingCalculator::with_options(formulas, options),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn archetypes(&self) -> &ArchetypeScorer {
        &self.archetypes
    }

    pub fn overalls(&self) -> &OverallScorer {
        &self.overalls
    }

    pub fn ratings(&self) -> &RatingCalculator {
        &self.ratings
    }

    /// Archetype and id changes for `archetype` on `record`, when it has an id.
    fn archetype_change(&self, record: &PlayerRecord, archetype: &str) -> Option<Vec<FieldChange>> {
        let id = self.config.archetype_id(archetype)?;
        Some(vec![
            FieldChange::on(record, ARCHETYPE_KEY, archetype),
            FieldChange::on(record, ARCHETYPE_ID_KEY, i64::from(id)),
        ])
    }

    /// Assign every player the best valid archetype for their ratings.
    pub fn regenerate_archetypes(&self, records: &[PlayerRecord]) -> BatchReport {
        let changes = collect_changes(records, |_, record| {
            let best = self.archetypes.best_archetype(record)?;
            if record.archetype() == Some(best.as_str()) {
                return None;
            }
            self.archetype_change(record, &best)
        });
        finish("regenerate_archetypes", records.len(), changes)
    }

    /// Recompute every player's overall from their current archetype.
    pub fn recalculate_overalls(&self, records: &[PlayerRecord]) -> BatchReport {
        let changes = collect_changes(records, |_, record| {
            let overall = self.overalls.overall_for_record(record)?;
            let current = record.get(OVERALL_KEY).map(AttrValue::to_number);
            if current == Some(f64::from(overall)) {
                return None;
            }
            Some(vec![FieldChange::on(record, OVERALL_KEY, overall)])
        });
        finish("recalculate_overalls", records.len(), changes)
    }

    /// Replace legacy archetypes with their current counterpart.
    pub fn convert_legacy_archetypes(&self, records: &[PlayerRecord]) -> BatchReport {
        let changes = collect_changes(records, |_, record| {
            let target = self.config.conversion_for(record.archetype()?)?;
            self.archetype_change(record, target)
        });
        finish("convert_legacy_archetypes", records.len(), changes)
    }

    /// Whether the record's archetype belongs to another position group.
    /// Records without a position or archetype are never flagged.
    pub fn is_logically_invalid(&self, record: &PlayerRecord) -> bool {
        let (Some(position), Some(archetype)) = (record.position(), record.archetype()) else {
            return false;
        };
        archetype != UNKNOWN_ARCHETYPE && archetype_prefix(archetype) != self.config.group_or_self(position)
    }

    /// Recalculate the archetype of every logically invalid player.
    pub fn fix_invalid_archetypes(&self, records: &[PlayerRecord]) -> FixReport {
        let flagged: Vec<usize> =
            (0..records.len()).filter(|&i| self.is_logically_invalid(&records[i])).collect();

        let mut report = FixReport { flagged: flagged.len(), ..FixReport::default() };
        let mut changes = Vec::new();

        for index in flagged {
            let record = &records[index];
            let Some(best) = self.archetypes.best_archetype(record) else {
                let group = record.position().map(|p| self.config.group_or_self(p)).unwrap_or_default();
                push_unique(&mut report.calculation_failed, group);
                continue;
            };
            match self.archetype_change(record, &best) {
                Some(fields) => changes.push(RecordChange { index, fields }),
                None => push_unique(&mut report.id_not_found, &best),
            }
        }

        report.batch = finish("fix_invalid_archetypes", records.len(), changes);
        if !report.calculation_failed.is_empty() {
            info!("No archetype weights for groups: {}", report.calculation_failed.join(", "));
        }
        if !report.id_not_found.is_empty() {
            info!("Archetypes missing from the master list: {}", report.id_not_found.join(", "));
        }
        report
    }

    /// Re-evaluate every formula rating of every player.
    pub fn recalculate_ratings(&self, records: &[PlayerRecord]) -> BatchReport {
        let changes = collect_changes(records, |_, record| {
            let fields: Vec<FieldChange> = self
                .ratings
                .rating_changes(record)
                .into_iter()
                .map(|change| FieldChange::on(record, &change.rating, change.new))
                .collect();
            (!fields.is_empty()).then_some(fields)
        });
        finish("recalculate_ratings", records.len(), changes)
    }

    pub fn diagnose_archetype(&self, index: usize, record: &PlayerRecord) -> ArchetypeDiagnosis {
        let position = record.position();
        let current = record.archetype();
        let position_group = position.map(|p| self.config.group_or_self(p));
        let calculated = self.archetypes.best_archetype(record);

        let in_master_list = current.map(|a| self.config.is_valid_archetype(a)).unwrap_or(false);
        let logically_valid =
            in_master_list && current.map(archetype_prefix).is_some_and(|prefix| Some(prefix) == position_group);
        let optimal = logically_valid && current.is_some() && current == calculated.as_deref();

        ArchetypeDiagnosis {
            player: player_label(index, record),
            position: position.map(str::to_string),
            position_group: position_group.map(str::to_string),
            current: current.map(str::to_string),
            current_id: current.and_then(|a| self.config.archetype_id(a)),
            calculated,
            in_master_list,
            logically_valid,
            optimal,
            conversion_target: current.and_then(|a| self.config.conversion_for(a)).map(str::to_string),
        }
    }

    pub fn diagnose_all(&self, records: &[PlayerRecord]) -> Vec<ArchetypeDiagnosis> {
        if records.len() > PARALLEL_THRESHOLD {
            records.par_iter().enumerate().map(|(i, r)| self.diagnose_archetype(i, r)).collect()
        } else {
            records.iter().enumerate().map(|(i, r)| self.diagnose_archetype(i, r)).collect()
        }
    }
}

/// Run `change_for` over every record, in parallel for large batches.
/// Results keep record order.
fn collect_changes<F>(records: &[PlayerRecord], change_for: F) -> Vec<RecordChange>
where
    F: Fn(usize, &PlayerRecord) -> Option<Vec<FieldChange>> + Sync,
{
    let to_change = |(index, record): (usize, &PlayerRecord)| {
        change_for(index, record).map(|fields| RecordChange { index, fields })
    };

    if records.len() > PARALLEL_THRESHOLD {
        records.par_iter().enumerate().filter_map(to_change).collect()
    } else {
        records.iter().enumerate().filter_map(to_change).collect()
    }
}

fn finish(operation: &str, processed: usize, changes: Vec<RecordChange>) -> BatchReport {
    let report = BatchReport::new(operation, processed, changes);
    info!("{}: {} of {} players updated", operation, report.changed, report.processed);
    report
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
