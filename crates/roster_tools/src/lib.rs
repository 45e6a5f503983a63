//! Roster Tools Library
//!
//! Loads the workbook exports (weight and description sheets, formula text),
//! roster JSON and engine configuration, and assembles a [`RosterEngine`].

pub mod sheets;

use anyhow::{Context, Result};
use roster_core::formula::CompiledFormulaSet;
use roster_core::{
    default_config, AttributeNameMap, EngineConfig, EvaluatorOptions, FormulaDocument, PlayerRecord, RosterEngine,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use sheets::{
    load_description_sheet, load_or_empty_description_sheet, load_or_empty_weight_sheet, load_weight_sheet,
    load_weight_sheet_with_stats, SheetStats,
};

/// Read the formula text file.
pub fn load_formula_document(path: &Path) -> Result<String> {
    sheets::ensure_exists(path)?;
    fs::read_to_string(path).with_context(|| format!("Failed to read formula file: {}", path.display()))
}

/// Formula text, or an empty document with one warning when the file is absent.
pub fn load_or_empty_formula_document(path: &Path) -> Result<String> {
    match load_formula_document(path) {
        Err(err) if sheets::is_missing(&err) => {
            warn!("Formula file not loaded ({}), ratings will not be calculated", err);
            Ok(String::new())
        }
        loaded => loaded,
    }
}

/// Read a roster: a JSON array of player records.
pub fn load_roster(path: &Path) -> Result<Vec<PlayerRecord>> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read roster: {}", path.display()))?;
    let records: Vec<PlayerRecord> =
        serde_json::from_str(&json).with_context(|| format!("Failed to parse roster JSON: {}", path.display()))?;
    info!("Loaded {} players from {}", records.len(), path.display());
    Ok(records)
}

pub fn save_roster(path: &Path, records: &[PlayerRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(records).context("Failed to serialize roster")?;
    fs::write(path, json).with_context(|| format!("Failed to write roster: {}", path.display()))?;
    info!("Saved {} players to {}", records.len(), path.display());
    Ok(())
}

/// Engine configuration from `path`, or the built-in one.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load engine config: {}", path.display())),
        None => Ok(default_config().clone()),
    }
}

/// Where the engine's inputs live. Missing sheets and formula files degrade
/// to empty tables; a missing config path falls back to the built-in one.
#[derive(Debug, Clone, Default)]
pub struct EngineSources {
    pub config: Option<PathBuf>,
    pub weights: PathBuf,
    pub descriptions: PathBuf,
    pub formulas: PathBuf,
}

impl EngineSources {
    /// `weights.csv`, `description.csv` and `formulas.txt` under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: None,
            weights: dir.join("weights.csv"),
            descriptions: dir.join("description.csv"),
            formulas: dir.join("formulas.txt"),
        }
    }
}

/// Everything the engine is built from, loaded and compiled.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub config: Arc<EngineConfig>,
    pub names: Arc<AttributeNameMap>,
    pub weights: Arc<roster_core::WeightTable>,
    pub formulas: CompiledFormulaSet,
}

impl LoadedSources {
    pub fn load(sources: &EngineSources) -> Result<Self> {
        let config = load_engine_config(sources.config.as_deref())?;
        let names = load_or_empty_description_sheet(&sources.descriptions)?;
        let weights = load_or_empty_weight_sheet(&sources.weights)?;
        let text = load_or_empty_formula_document(&sources.formulas)?;
        let formulas = CompiledFormulaSet::build(&FormulaDocument::parse_with_config(&text, &config), &names, &config);

        Ok(Self { config: Arc::new(config), names: Arc::new(names), weights: Arc::new(weights), formulas })
    }

    pub fn into_engine(self, options: EvaluatorOptions) -> RosterEngine {
        RosterEngine::with_options(self.config, self.names, self.weights, self.formulas, options)
    }
}

pub fn build_engine(sources: &EngineSources, options: EvaluatorOptions) -> Result<RosterEngine> {
    Ok(LoadedSources::load(sources)?.into_engine(options))
}

/// One translated formula as printed by the `translate` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedFormula {
    pub position: String,
    pub rating: String,
    pub source: Option<String>,
    pub expression: String,
    /// Compile error, when the expression did not compile.
    pub error: Option<String>,
}

pub fn translation_report(formulas: &CompiledFormulaSet) -> Vec<TranslatedFormula> {
    formulas
        .positions()
        .flat_map(|position| {
            position.ratings.iter().map(move |(rating, formula)| TranslatedFormula {
                position: position.position.clone(),
                rating: rating.clone(),
                source: formula.source.clone(),
                expression: formula.expression.clone(),
                error: formula.program.as_ref().err().map(ToString::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roster_round_trip_keeps_missing_values() -> Result<()> {
        let mut input = NamedTempFile::new()?;
        input.write_all(br#"[{"PositionName":"QB","Speed":90,"Injury":null},{"Overall":71.5}]"#)?;

        let records = load_roster(input.path())?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position(), Some("QB"));
        assert!(records[0].get("Injury").is_some_and(|v| v.is_missing()));

        let dir = tempfile::tempdir()?;
        let out = dir.path().join("nested").join("roster.json");
        save_roster(&out, &records)?;
        assert_eq!(load_roster(&out)?, records);
        Ok(())
    }

    #[test]
    fn test_bad_roster_json_has_context() -> Result<()> {
        let mut input = NamedTempFile::new()?;
        input.write_all(b"{ not a roster")?;
        let err = load_roster(input.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse roster JSON"));
        Ok(())
    }

    #[test]
    fn test_translation_report() {
        let names = AttributeNameMap::from_pairs([("SPD", "Speed")]);
        let document = FormulaDocument::parse("Quarterbacks\n\nSpeed Bonus\n\n=IF(SPD4>90,99,50)\n\nBroken\n\n=SPD+\n");
        let formulas = CompiledFormulaSet::build(&document, &names, default_config());

        let report = translation_report(&formulas);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].position, "QB");
        assert_eq!(report[0].expression, "(99 if Speed>90 else 50)");
        assert_eq!(report[0].error, None);
        assert!(report[1].error.is_some());
    }

    #[test]
    fn test_engine_from_empty_dir_degrades() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = build_engine(&EngineSources::in_dir(dir.path()), EvaluatorOptions::default())?;
        let records = vec![PlayerRecord::new().with("PositionName", "QB").with("Speed", 90)];

        assert!(engine.regenerate_archetypes(&records).is_empty());
        assert!(engine.recalculate_ratings(&records).is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_formula_file_is_config_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("formulas.txt");
        let err = load_formula_document(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<roster_core::ConfigError>(), Some(roster_core::ConfigError::Missing { .. })));
        assert_eq!(load_or_empty_formula_document(&path)?, "");
        Ok(())
    }
}
