//! CSV exports of the ratings workbook.
//!
//! - Weights: `Position,Archetype,<short keys>…[,Total][,DesiredHigh][,DesiredLow]`
//! - Description: `Readable,Short`

use anyhow::{bail, Context, Result};
use roster_core::{AttributeNameMap, ConfigError, WeightEntry, WeightTable};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

pub const POSITION_COLUMN: &str = "Position";
pub const ARCHETYPE_COLUMN: &str = "Archetype";
pub const READABLE_COLUMN: &str = "Readable";
pub const SHORT_COLUMN: &str = "Short";

/// Row counts of one sheet load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SheetStats {
    pub rows: usize,
    pub loaded: usize,
    pub skipped: usize,
}

/// `ConfigError::Missing` for an absent input file.
pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ConfigError::missing(path.display().to_string()).into());
    }
    Ok(())
}

/// Whether `err` is the absent-file error of [`ensure_exists`].
pub(crate) fn is_missing(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Missing { .. }))
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ensure_exists(path)?;
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))
}

fn column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    match headers.iter().position(|h| h.trim_start_matches('\u{feff}') == name) {
        Some(index) => Ok(index),
        None => bail!("{} has no '{}' column", path.display(), name),
    }
}

/// Empty or non-numeric cells read as `None`.
fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    match cell.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("Non-numeric weight cell '{}' treated as empty", cell);
            None
        }
    }
}

/// Load the weight sheet. Rows without a position or archetype are skipped.
pub fn load_weight_sheet(path: &Path) -> Result<WeightTable> {
    load_weight_sheet_with_stats(path).map(|(table, _)| table)
}

pub fn load_weight_sheet_with_stats(path: &Path) -> Result<(WeightTable, SheetStats)> {
    let mut reader = open(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let position_col = column(&headers, POSITION_COLUMN, path)?;
    let archetype_col = column(&headers, ARCHETYPE_COLUMN, path)?;

    let mut table = WeightTable::new();
    let mut stats = SheetStats::default();
    for result in reader.records() {
        stats.rows += 1;
        let record = result.with_context(|| format!("{}: bad CSV row {}", path.display(), stats.rows))?;

        let position = record.get(position_col).unwrap_or_default();
        let archetype = record.get(archetype_col).unwrap_or_default();
        if position.is_empty() || archetype.is_empty() {
            stats.skipped += 1;
            debug!("{}: row {} has no position or archetype, skipping", path.display(), stats.rows);
            continue;
        }

        let cells = headers
            .iter()
            .enumerate()
            .filter(|(index, header)| *index != position_col && *index != archetype_col && !header.is_empty())
            .map(|(index, header)| (header, record.get(index).and_then(parse_cell)));
        table.insert(position, WeightEntry::from_cells(archetype, cells));
        stats.loaded += 1;
    }

    info!(
        "Loaded weight sheet {}: {} rows, {} entries, {} skipped",
        path.display(),
        stats.rows,
        table.len(),
        stats.skipped
    );
    Ok((table, stats))
}

/// Load the short ↔ readable attribute names.
pub fn load_description_sheet(path: &Path) -> Result<AttributeNameMap> {
    let mut reader = open(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let readable_col = column(&headers, READABLE_COLUMN, path)?;
    let short_col = column(&headers, SHORT_COLUMN, path)?;

    let mut names = AttributeNameMap::new();
    let mut row = 0;
    for result in reader.records() {
        row += 1;
        let record = result.with_context(|| format!("{}: bad CSV row {}", path.display(), row))?;
        let readable = record.get(readable_col).unwrap_or_default();
        let short = record.get(short_col).unwrap_or_default();
        if readable.is_empty() || short.is_empty() {
            debug!("{}: row {} is missing a name, skipping", path.display(), row);
            continue;
        }
        if names.to_readable(short).is_some() || names.to_short(readable).is_some() {
            warn!("{}: '{}' / '{}' replaces an earlier mapping", path.display(), short, readable);
        }
        names.insert(short, readable);
    }

    info!("Loaded {} attribute names from {}", names.len(), path.display());
    Ok(names)
}

/// Weight sheet, or an empty table with one warning when the file is absent.
pub fn load_or_empty_weight_sheet(path: &Path) -> Result<WeightTable> {
    match load_weight_sheet(path) {
        Err(err) if is_missing(&err) => {
            warn!("Weight sheet not loaded ({}), archetypes and overalls will be unavailable", err);
            Ok(WeightTable::new())
        }
        loaded => loaded,
    }
}

/// Description sheet, or an empty map with one warning when the file is absent.
pub fn load_or_empty_description_sheet(path: &Path) -> Result<AttributeNameMap> {
    match load_description_sheet(path) {
        Err(err) if is_missing(&err) => {
            warn!("Description sheet not loaded ({}), attribute names will not resolve", err);
            Ok(AttributeNameMap::new())
        }
        loaded => loaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        Ok(file)
    }

    #[test]
    fn test_weight_sheet_columns() -> Result<()> {
        let file = csv_file(
            "Position,Archetype,SPD,AGI,THP,Total,DesiredHigh,DesiredLow\n\
             QB,QB_Scrambler,0.5,0.5,,1,99,20\n\
             QB,QB_StrongArm,,,1,1,,30\n\
             ,Orphan,1,1,1,3,99,12\n",
        )?;
        let (table, stats) = load_weight_sheet_with_stats(file.path())?;

        assert_eq!(stats, SheetStats { rows: 3, loaded: 2, skipped: 1 });
        let scrambler = table.entry("QB", "QB_Scrambler").unwrap();
        assert_eq!(scrambler.weights, vec![("SPD".to_string(), 0.5), ("AGI".to_string(), 0.5)]);
        assert_eq!(scrambler.total, Some(1.0));
        assert_eq!((scrambler.desired_low, scrambler.desired_high), (20.0, 99.0));

        let strong_arm = table.entry("QB", "QB_StrongArm").unwrap();
        assert!(strong_arm.desired_high.is_nan());
        assert_eq!(strong_arm.desired_low, 30.0);
        Ok(())
    }

    #[test]
    fn test_weight_sheet_without_band_columns() -> Result<()> {
        let file = csv_file("Position,Archetype,SPD\nHB,HB_PowerBack,1\n")?;
        let table = load_weight_sheet(file.path())?;
        let entry = table.entry("HB", "HB_PowerBack").unwrap();
        assert_eq!((entry.desired_low, entry.desired_high), (12.0, 99.0));
        Ok(())
    }

    #[test]
    fn test_weight_sheet_requires_key_columns() -> Result<()> {
        let file = csv_file("Pos,Archetype,SPD\nQB,QB_Scrambler,1\n")?;
        let err = load_weight_sheet(file.path()).unwrap_err();
        assert!(err.to_string().contains("'Position'"));
        Ok(())
    }

    #[test]
    fn test_description_sheet() -> Result<()> {
        let file = csv_file("Readable,Short\nSpeed,SPD\nThrow Power,THP\n,XXX\n")?;
        let names = load_description_sheet(file.path())?;
        assert_eq!(names.len(), 2);
        assert_eq!(names.to_readable("THP"), Some("Throw Power"));
        assert_eq!(names.to_short("Speed"), Some("SPD"));
        Ok(())
    }

    #[test]
    fn test_missing_sheets_degrade_to_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(load_or_empty_weight_sheet(&dir.path().join("weights.csv"))?.is_empty());
        assert!(load_or_empty_description_sheet(&dir.path().join("description.csv"))?.is_empty());
        let err = load_weight_sheet(&dir.path().join("weights.csv")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Missing { .. })));
        assert!(err.to_string().contains("weights.csv"));
        Ok(())
    }

    #[test]
    fn test_unreadable_sheet_is_not_treated_as_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let err = load_or_empty_weight_sheet(dir.path()).unwrap_err();
        assert!(!is_missing(&err));
        Ok(())
    }
}
