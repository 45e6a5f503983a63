//! Engine configuration: position groups, the archetype master list,
//! legacy archetype conversions and formula section aliases.
//!
//! A default configuration is embedded at compile time and parsed once.
//! Custom configurations load from YAML with the same shape.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::error;

pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../../data/engine_config.yaml");
static DEFAULT_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Raw YAML shape, validated into [`EngineConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfigFile {
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub position_groups: HashMap<String, String>,
    #[serde(default)]
    pub archetype_ids: HashMap<String, u32>,
    #[serde(default)]
    pub archetype_conversions: HashMap<String, String>,
    #[serde(default)]
    pub section_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineConfig {
    pub version: u8,
    /// Specific position → generic group ("LT" → "OT").
    pub position_groups: HashMap<String, String>,
    /// Archetypes legal in the current game version, with their roster id.
    pub archetype_ids: HashMap<String, u32>,
    /// Legacy archetype → current archetype.
    pub archetype_conversions: HashMap<String, String>,
    /// Formula document heading → formula position key.
    pub section_aliases: HashMap<String, String>,
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: EngineConfigFile = serde_yaml::from_str(yaml)?;
        Self::try_from(file)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn group_for(&self, position: &str) -> Option<&str> {
        self.position_groups.get(position).map(String::as_str)
    }

    /// The position's group, or the position itself when it has none.
    pub fn group_or_self<'a>(&'a self, position: &'a str) -> &'a str {
        self.group_for(position).unwrap_or(position)
    }

    pub fn is_valid_archetype(&self, archetype: &str) -> bool {
        self.archetype_ids.contains_key(archetype)
    }

    pub fn archetype_id(&self, archetype: &str) -> Option<u32> {
        self.archetype_ids.get(archetype).copied()
    }

    pub fn conversion_for(&self, archetype: &str) -> Option<&str> {
        self.archetype_conversions.get(archetype).map(String::as_str)
    }

    /// Formula position key for a document heading; unknown headings pass
    /// through verbatim.
    pub fn section_key<'a>(&'a self, heading: &'a str) -> &'a str {
        self.section_aliases.get(heading).map(String::as_str).unwrap_or(heading)
    }

    /// Whether `heading` is a formula document heading with an alias.
    pub fn is_section_heading(&self, heading: &str) -> bool {
        self.section_aliases.contains_key(heading)
    }

    fn validate(&self) -> Result<()> {
        for (position, group) in &self.position_groups {
            if position.trim().is_empty() || group.trim().is_empty() {
                return Err(ConfigError::malformed(
                    "position_groups",
                    format!("empty entry '{}' -> '{}'", position, group),
                ));
            }
        }

        for (legacy, target) in &self.archetype_conversions {
            if !self.archetype_ids.contains_key(target) {
                return Err(ConfigError::malformed(
                    "archetype_conversions",
                    format!("{} converts to {}, which has no archetype id", legacy, target),
                ));
            }
        }

        for (heading, key) in &self.section_aliases {
            if key.trim().is_empty() {
                return Err(ConfigError::malformed(
                    "section_aliases",
                    format!("heading '{}' has an empty position key", heading),
                ));
            }
        }

        Ok(())
    }
}

impl TryFrom<EngineConfigFile> for EngineConfig {
    type Error = ConfigError;

    fn try_from(file: EngineConfigFile) -> Result<Self> {
        let config = Self {
            version: file.version,
            position_groups: file.position_groups,
            archetype_ids: file.archetype_ids,
            archetype_conversions: file.archetype_conversions,
            section_aliases: file.section_aliases,
        };
        config.validate()?;
        Ok(config)
    }
}

/// The embedded configuration, parsed on first use.
///
/// A broken embedded file is logged and replaced by an empty configuration,
/// so every lookup answers "no result".
pub fn default_config() -> &'static EngineConfig {
    DEFAULT_CONFIG.get_or_init(|| {
        EngineConfig::from_yaml_str(DEFAULT_CONFIG_YAML).unwrap_or_else(|e| {
            error!("Embedded engine configuration is invalid: {}", e);
            EngineConfig::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_is_valid() {
        let config = EngineConfig::from_yaml_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.position_groups.len(), 13);
        assert_eq!(config.archetype_conversions.len(), 18);
        assert_eq!(&config, default_config());
    }

    #[test]
    fn test_lookups() {
        let config = default_config();
        assert_eq!(config.group_for("LT"), Some("OT"));
        assert_eq!(config.group_or_self("QB"), "QB");
        assert_eq!(config.group_or_self("FS"), "S");
        assert!(config.is_valid_archetype("QB_Scrambler"));
        assert!(!config.is_valid_archetype("QB_PureScrambler"));
        assert_eq!(config.conversion_for("QB_PureScrambler"), Some("QB_Scrambler"));
        assert_eq!(config.section_key("Safeties"), "SS");
        assert_eq!(config.section_key("Kickers"), "Kickers");
    }

    #[test]
    fn test_every_conversion_target_has_id() {
        let config = default_config();
        for target in config.archetype_conversions.values() {
            assert!(config.archetype_id(target).is_some(), "{} has no id", target);
        }
    }

    #[test]
    fn test_conversion_to_unknown_archetype_is_rejected() {
        let yaml = "archetype_ids:\n  QB_Scrambler: 3\narchetype_conversions:\n  QB_Old: QB_Missing\n";
        let err = EngineConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { ref what, .. } if what == "archetype_conversions"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_partial_config_defaults_missing_tables() {
        let config = EngineConfig::from_yaml_str("position_groups:\n  LT: OT\n").unwrap();
        assert_eq!(config.group_for("LT"), Some("OT"));
        assert!(config.archetype_ids.is_empty());
        assert_eq!(config.section_key("Quarterbacks"), "Quarterbacks");
    }

    #[test]
    fn test_bad_yaml_is_not_recoverable() {
        let err = EngineConfig::from_yaml_str("position_groups: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(!err.is_recoverable());
    }
}
