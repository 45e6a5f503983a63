//! Weighted scoring over the weight sheet: archetype classification and
//! overall ratings.

pub mod archetype;
pub mod overall;
pub mod weights;

pub use archetype::{ArchetypeScore, ArchetypeScorer};
pub use overall::{OverallBreakdown, OverallScorer, OVERALL_MAX, OVERALL_MIN};
pub use weights::{WeightEntry, WeightTable};

use crate::attributes::{AttributeNameMap, PlayerRecord};

/// Σ weight × rating over the entry's attributes that have a readable name.
/// Ratings are integer-truncated and read as 0 when absent or non-numeric.
pub(crate) fn weighted_sum(entry: &WeightEntry, names: &AttributeNameMap, record: &PlayerRecord) -> f64 {
    entry
        .weights
        .iter()
        .filter_map(|(short, weight)| {
            names.to_readable(short).map(|readable| record.rating(readable) as f64 * weight)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_sum_skips_unmapped_keys() {
        let names = AttributeNameMap::from_pairs([("SPD", "Speed"), ("AGI", "Agility")]);
        let entry = WeightEntry::new("QB_Scrambler")
            .with_weight("SPD", 0.5)
            .with_weight("AGI", 0.25)
            .with_weight("XYZ", 10.0);
        let record = PlayerRecord::new().with("Speed", 90.7).with("Agility", "n/a").with("XYZ", 99);

        assert_eq!(weighted_sum(&entry, &names, &record), 45.0);
    }
}
