use anyhow::Result;
use roster_core::{AttrValue, EvaluatorOptions, PlayerRecord};
use roster_tools::{build_engine, load_roster, save_roster, EngineSources};
use std::fs;
use std::path::Path;

const WEIGHTS: &str = "\
Position,Archetype,SPD,AGI,THP,STR,Total,DesiredHigh,DesiredLow
QB,QB_Scrambler,0.5,0.5,,,1,99,20
QB,QB_FieldGeneral,,,1,,1,99,20
OT,OT_Power,,,,1,1,99,0
";

const DESCRIPTIONS: &str = "\
Readable,Short
Speed,SPD
Agility,AGI
Throw Power,THP
Strength,STR
";

const FORMULAS: &str = "\
Quarterbacks

Speed Bonus

=IF(SPD4>90,99,50)

RT

Anchor

=PRODUCT(STR2*1)
";

fn write_sources(dir: &Path) -> Result<EngineSources> {
    let sources = EngineSources::in_dir(dir);
    fs::write(&sources.weights, WEIGHTS)?;
    fs::write(&sources.descriptions, DESCRIPTIONS)?;
    fs::write(&sources.formulas, FORMULAS)?;
    Ok(sources)
}

fn roster() -> Vec<PlayerRecord> {
    vec![
        PlayerRecord::new()
            .with("First Name", "Quick")
            .with("Last Name", "Passer")
            .with("PositionName", "QB")
            .with("Archetype", "QB_FieldGeneral")
            .with("Speed", 90)
            .with("Agility", 80)
            .with("Throw Power", 70),
        PlayerRecord::new()
            .with("PositionName", "RT")
            .with("Archetype", "QB_Scrambler")
            .with("Strength", 88),
        PlayerRecord::new().with("PositionName", "LT").with("Archetype", "OT_WellRounded"),
    ]
}

#[test]
fn test_regenerate_and_recalculate_from_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = build_engine(&write_sources(dir.path())?, EvaluatorOptions::default())?;
    let mut records = roster();

    let archetypes = engine.regenerate_archetypes(&records);
    assert_eq!(archetypes.processed, 3);
    assert_eq!(archetypes.changes[0].index, 0);
    assert_eq!(archetypes.changes[0].fields[0].new, AttrValue::from("QB_Scrambler"));
    archetypes.apply(&mut records);
    assert_eq!(records[0].archetype(), Some("QB_Scrambler"));
    assert_eq!(records[1].archetype(), Some("OT_Power"));

    // (85 - 20) * 99 / 79 = 81.45
    let overalls = engine.recalculate_overalls(&records);
    overalls.apply(&mut records);
    assert_eq!(records[0].rating("Overall"), 81);
    assert_eq!(records[1].rating("Overall"), 88);

    let ratings = engine.recalculate_ratings(&records);
    ratings.apply(&mut records);
    assert_eq!(records[0].rating("SpeedBonus"), 50);
    assert_eq!(records[1].rating("Anchor"), 88);
    Ok(())
}

#[test]
fn test_convert_and_fix_from_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = build_engine(&write_sources(dir.path())?, EvaluatorOptions::default())?;
    let mut records = roster();

    let converted = engine.convert_legacy_archetypes(&records);
    assert_eq!(converted.changed, 1);
    converted.apply(&mut records);
    assert_eq!(records[2].archetype(), Some("OT_Agile"));

    let fix = engine.fix_invalid_archetypes(&records);
    assert_eq!(fix.flagged, 1);
    assert_eq!(fix.batch.changes[0].index, 1);
    assert_eq!(fix.failed(), 0);

    let diagnosis = engine.diagnose_archetype(0, &records[0]);
    assert_eq!(diagnosis.player, "Quick Passer");
    assert_eq!(diagnosis.calculated.as_deref(), Some("QB_Scrambler"));
    Ok(())
}

#[test]
fn test_applied_roster_is_saved() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = build_engine(&write_sources(dir.path())?, EvaluatorOptions::default())?;
    let input = dir.path().join("roster.json");
    save_roster(&input, &roster())?;

    let mut records = load_roster(&input)?;
    let report = engine.regenerate_archetypes(&records);
    assert_eq!(report.apply(&mut records), report.changed);

    let output = dir.path().join("out").join("roster.json");
    save_roster(&output, &records)?;
    let saved = load_roster(&output)?;
    assert_eq!(saved[0].archetype(), Some("QB_Scrambler"));
    assert_eq!(saved[0].get("PLTY"), Some(&AttrValue::Integer(3)));
    Ok(())
}
