use crate::attributes::PlayerRecord;
use serde::Serialize;

/// Why a player's archetype is (or is not) in good shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeDiagnosis {
    pub player: String,
    pub position: Option<String>,
    /// The position's group, or the position itself.
    pub position_group: Option<String>,
    pub current: Option<String>,
    pub current_id: Option<u32>,
    pub calculated: Option<String>,
    /// The current archetype is in the master list.
    pub in_master_list: bool,
    /// In the master list and prefixed by the player's position group.
    pub logically_valid: bool,
    /// Logically valid and equal to the calculated best.
    pub optimal: bool,
    /// Target of the legacy conversion, when the current archetype has one.
    pub conversion_target: Option<String>,
}

impl ArchetypeDiagnosis {
    pub fn convertible(&self) -> bool {
        self.conversion_target.is_some()
    }

    /// One-line verdicts, most severe first.
    pub fn findings(&self) -> Vec<String> {
        let current = self.current.as_deref().unwrap_or("<none>");
        let group = self.position_group.as_deref().unwrap_or("<none>");
        let mut findings = Vec::new();

        if !self.in_master_list {
            findings.push(format!("'{}' is not in the archetype master list", current));
        }
        if !self.logically_valid {
            findings.push(format!("'{}' does not belong to position group {}", current, group));
        }
        match (&self.calculated, self.optimal) {
            (None, _) => findings.push(format!("no archetype could be calculated for group {}", group)),
            (Some(best), false) => findings.push(format!("best calculated archetype is '{}'", best)),
            (Some(_), true) => findings.push("archetype is optimal".to_string()),
        }
        if let Some(target) = &self.conversion_target {
            findings.push(format!("legacy archetype, converts to '{}'", target));
        } else if self.in_master_list && !self.logically_valid {
            findings.push(format!("add a conversion for '{}' to fix this player", current));
        }
        findings
    }
}

/// Display label for a player: first and last name, else the batch index.
pub fn player_label(index: usize, record: &PlayerRecord) -> String {
    let name: Vec<&str> = ["First Name", "Last Name"].iter().filter_map(|key| record.text(key)).collect();
    if name.is_empty() {
        format!("#{}", index)
    } else {
        name.join(" ")
    }
}

/// Text before the first `_` of an archetype name.
pub fn archetype_prefix(archetype: &str) -> &str {
    archetype.split('_').next().unwrap_or(archetype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_label() {
        let named = PlayerRecord::new().with("First Name", "Sam").with("Last Name", "Bradford");
        assert_eq!(player_label(3, &named), "Sam Bradford");
        assert_eq!(player_label(3, &PlayerRecord::new()), "#3");
    }

    #[test]
    fn test_archetype_prefix() {
        assert_eq!(archetype_prefix("QB_Scrambler"), "QB");
        assert_eq!(archetype_prefix("Unknown"), "Unknown");
    }
}
