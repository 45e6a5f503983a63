use crate::attributes::{AttributeNameMap, PlayerRecord};
use crate::config::EngineConfig;
use crate::scoring::weighted_sum;
use crate::scoring::weights::{WeightEntry, WeightTable};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const OVERALL_MIN: i32 = 12;
pub const OVERALL_MAX: i32 = 99;

/// Intermediate values of one overall computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallBreakdown {
    /// Table position the row came from (the position itself or its group).
    pub table_position: String,
    pub archetype: String,
    pub weighted_average: f64,
    pub desired_low: f64,
    pub desired_high: f64,
    /// Unrounded, unclamped overall.
    pub raw: f64,
    pub overall: i32,
}

/// Maps a player's weighted attribute average onto the overall scale.
#[derive(Debug, Clone)]
pub struct OverallScorer {
    table: Arc<WeightTable>,
    names: Arc<AttributeNameMap>,
    config: Arc<EngineConfig>,
}

impl OverallScorer {
    pub fn new(table: Arc<WeightTable>, names: Arc<AttributeNameMap>, config: Arc<EngineConfig>) -> Self {
        Self { table, names, config }
    }

    fn lookup<'a>(&'a self, position: &'a str, archetype: &str) -> Option<(&'a str, &'a WeightEntry)> {
        if let Some(entry) = self.table.entry(position, archetype) {
            return Some((position, entry));
        }
        let group = self.config.group_for(position)?;
        self.table.entry(group, archetype).map(|entry| (group, entry))
    }

    pub fn breakdown(&self, position: &str, archetype: &str, record: &PlayerRecord) -> Option<OverallBreakdown> {
        let Some((table_position, entry)) = self.lookup(position, archetype) else {
            debug!("No overall weights for {}/{}", position, archetype);
            return None;
        };

        let total = entry.total_weight();
        if total == 0.0 {
            debug!("Overall weights for {}/{} sum to zero", table_position, archetype);
            return None;
        }
        let weighted_average = weighted_sum(entry, &self.names, record) / total;

        let span = entry.desired_high - entry.desired_low;
        if span == 0.0 {
            debug!("Desired band for {}/{} is empty", table_position, archetype);
            return None;
        }
        let raw = (weighted_average - entry.desired_low) * (99.0 / span);
        if !raw.is_finite() {
            debug!("Overall for {}/{} is not finite", table_position, archetype);
            return None;
        }

        let overall = (raw.round_ties_even() as i32).clamp(OVERALL_MIN, OVERALL_MAX);
        Some(OverallBreakdown {
            table_position: table_position.to_string(),
            archetype: archetype.to_string(),
            weighted_average,
            desired_low: entry.desired_low,
            desired_high: entry.desired_high,
            raw,
            overall,
        })
    }

    pub fn overall(&self, position: &str, archetype: &str, record: &PlayerRecord) -> Option<i32> {
        self.breakdown(position, archetype, record).map(|b| b.overall)
    }

    /// Overall for the record's own position and archetype.
    pub fn overall_for_record(&self, record: &PlayerRecord) -> Option<i32> {
        let position = record.position()?;
        let archetype = record.archetype()?;
        self.overall(position, archetype, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigFile;

    fn scorer(table: WeightTable) -> OverallScorer {
        let names = AttributeNameMap::from_pairs([("SPD", "Speed"), ("STR", "Strength"), ("AWR", "Awareness")]);
        let file = EngineConfigFile {
            version: 1,
            position_groups: [("RT".to_string(), "OT".to_string())].into_iter().collect(),
            archetype_ids: Default::default(),
            archetype_conversions: Default::default(),
            section_aliases: Default::default(),
        };
        let config = EngineConfig::try_from(file).unwrap();
        OverallScorer::new(Arc::new(table), Arc::new(names), Arc::new(config))
    }

    #[test]
    fn test_band_scenario() {
        let table = WeightTable::new()
            .with_entry("QB", WeightEntry::new("QB_Scrambler").with_weight("SPD", 1.0).with_band(20.0, 99.0));
        let record = PlayerRecord::new().with("PositionName", "QB").with("Archetype", "QB_Scrambler").with("Speed", 60);

        let breakdown = scorer(table).breakdown("QB", "QB_Scrambler", &record).unwrap();
        assert_eq!(breakdown.weighted_average, 60.0);
        assert!((breakdown.raw - 50.126).abs() < 1e-3);
        assert_eq!(breakdown.overall, 50);
    }

    #[test]
    fn test_unmapped_weights_count_toward_total() {
        let table = WeightTable::new().with_entry(
            "QB",
            WeightEntry::new("QB_Scrambler").with_weight("SPD", 1.0).with_weight("ZZZ", 1.0).with_band(0.0, 99.0),
        );
        let record = PlayerRecord::new().with("PositionName", "QB").with("Archetype", "QB_Scrambler").with("Speed", 80);

        assert_eq!(scorer(table).overall_for_record(&record), Some(40));
    }

    #[test]
    fn test_group_fallback() {
        let table = WeightTable::new()
            .with_entry("OT", WeightEntry::new("OT_Power").with_weight("STR", 1.0).with_band(0.0, 99.0));
        let scorer = scorer(table);
        let record = PlayerRecord::new().with("Strength", 88);

        let breakdown = scorer.breakdown("RT", "OT_Power", &record).unwrap();
        assert_eq!(breakdown.table_position, "OT");
        assert_eq!(breakdown.overall, 88);
        assert_eq!(scorer.overall("TE", "OT_Power", &record), None);
        assert_eq!(scorer.overall("RT", "OT_Agile", &record), None);
    }

    #[test]
    fn test_guards() {
        let table = WeightTable::new()
            .with_entry("QB", WeightEntry::new("Flat").with_weight("SPD", 1.0).with_band(70.0, 70.0))
            .with_entry("QB", WeightEntry::new("Weightless").with_weight("SPD", 0.0))
            .with_entry("QB", WeightEntry::new("NoBand").with_weight("SPD", 1.0).with_band(12.0, f64::NAN));
        let scorer = scorer(table);
        let record = PlayerRecord::new().with("Speed", 80);

        assert_eq!(scorer.overall("QB", "Flat", &record), None);
        assert_eq!(scorer.overall("QB", "Weightless", &record), None);
        assert_eq!(scorer.overall("QB", "NoBand", &record), None);
    }

    #[test]
    fn test_clamped_to_scale() {
        let table = WeightTable::new()
            .with_entry("QB", WeightEntry::new("QB_StrongArm").with_weight("AWR", 1.0).with_band(50.0, 60.0));
        let scorer = scorer(table);

        let high = PlayerRecord::new().with("Awareness", 99);
        let low = PlayerRecord::new().with("Awareness", 10);
        assert_eq!(scorer.overall("QB", "QB_StrongArm", &high), Some(OVERALL_MAX));
        assert_eq!(scorer.overall("QB", "QB_StrongArm", &low), Some(OVERALL_MIN));
    }

    #[test]
    fn test_record_without_archetype_has_no_overall() {
        let table = WeightTable::new().with_entry("QB", WeightEntry::new("QB_Scrambler").with_weight("SPD", 1.0));
        let record = PlayerRecord::new().with("PositionName", "QB").with("Speed", 80);
        assert_eq!(scorer(table).overall_for_record(&record), None);
    }
}
