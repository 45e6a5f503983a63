use crate::attributes::{AttributeNameMap, PlayerRecord};
use crate::config::EngineConfig;
use crate::scoring::weighted_sum;
use crate::scoring::weights::{WeightEntry, WeightTable};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Score of one archetype row for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeScore {
    pub archetype: String,
    pub score: f64,
    /// Whether the archetype is in the current master list.
    pub valid: bool,
}

/// Picks the archetype whose weighted attribute score is highest.
#[derive(Debug, Clone)]
pub struct ArchetypeScorer {
    table: Arc<WeightTable>,
    names: Arc<AttributeNameMap>,
    config: Arc<EngineConfig>,
}

impl ArchetypeScorer {
    pub fn new(table: Arc<WeightTable>, names: Arc<AttributeNameMap>, config: Arc<EngineConfig>) -> Self {
        Self { table, names, config }
    }

    /// Rows for the exact position, else for its group.
    fn options(&self, position: &str) -> Option<&[WeightEntry]> {
        self.table.position(position).or_else(|| {
            let group = self.config.group_for(position)?;
            self.table.position(group)
        })
    }

    /// Every archetype row of the position, scored, in sheet order.
    pub fn score_all(&self, position: &str, record: &PlayerRecord) -> Option<Vec<ArchetypeScore>> {
        let options = self.options(position)?;
        Some(
            options
                .iter()
                .map(|entry| ArchetypeScore {
                    archetype: entry.key.clone(),
                    score: weighted_sum(entry, &self.names, record),
                    valid: self.config.is_valid_archetype(&entry.key),
                })
                .collect(),
        )
    }

    /// Best valid archetype for `position`. Ties keep the first row.
    pub fn best_archetype_for(&self, position: &str, record: &PlayerRecord) -> Option<String> {
        let Some(scores) = self.score_all(position, record) else {
            debug!("No archetype weights for position {}", position);
            return None;
        };

        let mut best: Option<ArchetypeScore> = None;
        for candidate in scores.into_iter().filter(|s| s.valid) {
            match &best {
                Some(current) if candidate.score <= current.score => {}
                _ => best = Some(candidate),
            }
        }

        if best.is_none() {
            debug!("No valid archetype left for position {}", position);
        }
        best.map(|s| s.archetype)
    }

    /// Best valid archetype for the record's own position.
    pub fn best_archetype(&self, record: &PlayerRecord) -> Option<String> {
        let position = record.position()?;
        self.best_archetype_for(position, record)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigFile;

    fn config() -> Arc<EngineConfig> {
        let file = EngineConfigFile {
            version: 1,
            position_groups: [("LT".to_string(), "OT".to_string())].into_iter().collect(),
            archetype_ids: [("QB_Scrambler", 3), ("QB_FieldGeneral", 1), ("OT_Power", 19), ("OT_Agile", 17)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            archetype_conversions: Default::default(),
            section_aliases: Default::default(),
        };
        Arc::new(EngineConfig::try_from(file).unwrap())
    }

    fn scorer(table: WeightTable) -> ArchetypeScorer {
        let names = AttributeNameMap::from_pairs([("SPD", "Speed"), ("AGI", "Agility"), ("STR", "Strength")]);
        ArchetypeScorer::new(Arc::new(table), Arc::new(names), config())
    }

    #[test]
    fn test_scrambler_scenario() {
        let table = WeightTable::new().with_entry(
            "QB",
            WeightEntry::new("QB_Scrambler").with_weight("SPD", 0.5).with_weight("AGI", 0.5),
        );
        let scorer = scorer(table);
        let record = PlayerRecord::new().with("PositionName", "QB").with("Speed", 90).with("Agility", 80);

        let scores = scorer.score_all("QB", &record).unwrap();
        assert_eq!(scores[0].score, 85.0);
        assert_eq!(scorer.best_archetype(&record), Some("QB_Scrambler".to_string()));
    }

    #[test]
    fn test_invalid_archetypes_are_filtered() {
        let table = WeightTable::new()
            .with_entry("QB", WeightEntry::new("QB_PureScrambler").with_weight("SPD", 5.0))
            .with_entry("QB", WeightEntry::new("QB_FieldGeneral").with_weight("AGI", 1.0));
        let record = PlayerRecord::new().with("PositionName", "QB").with("Speed", 90).with("Agility", 50);

        assert_eq!(scorer(table).best_archetype(&record), Some("QB_FieldGeneral".to_string()));
    }

    #[test]
    fn test_ties_keep_table_order() {
        let table = WeightTable::new()
            .with_entry("QB", WeightEntry::new("QB_FieldGeneral").with_weight("SPD", 1.0))
            .with_entry("QB", WeightEntry::new("QB_Scrambler").with_weight("AGI", 1.0));
        let record = PlayerRecord::new().with("PositionName", "QB").with("Speed", 70).with("Agility", 70);

        assert_eq!(scorer(table).best_archetype(&record), Some("QB_FieldGeneral".to_string()));
    }

    #[test]
    fn test_group_fallback_and_no_result() {
        let table = WeightTable::new()
            .with_entry("OT", WeightEntry::new("OT_Agile").with_weight("AGI", 1.0))
            .with_entry("OT", WeightEntry::new("OT_Power").with_weight("STR", 1.0));
        let scorer = scorer(table);
        let lineman = PlayerRecord::new().with("PositionName", "LT").with("Strength", 90).with("Agility", 60);

        assert_eq!(scorer.best_archetype(&lineman), Some("OT_Power".to_string()));
        assert_eq!(scorer.best_archetype(&lineman.clone().with("PositionName", "TE")), None);
        assert_eq!(scorer.best_archetype(&PlayerRecord::new().with("Strength", 90)), None);
    }

    #[test]
    fn test_only_invalid_rows_yield_nothing() {
        let table = WeightTable::new().with_entry("QB", WeightEntry::new("QB_PureScrambler").with_weight("SPD", 1.0));
        let record = PlayerRecord::new().with("PositionName", "QB").with("Speed", 90);

        assert_eq!(scorer(table).best_archetype(&record), None);
    }
}
