//! Roster Tools CLI
//!
//! Runs the roster operations over a roster JSON file and prints a JSON
//! report. `--apply --out <file>` also writes the updated roster.

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use roster_core::{BatchReport, EvaluatorOptions, PlayerRecord, RosterEngine};
#[cfg(feature = "cli")]
use roster_tools::{EngineSources, LoadedSources};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "roster_tools")]
#[command(about = "Derive ratings, archetypes and overalls for a roster", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct SourceArgs {
    /// Directory holding weights.csv, description.csv and formulas.txt
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Weight sheet CSV (overrides <data_dir>/weights.csv)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Description sheet CSV (overrides <data_dir>/description.csv)
    #[arg(long)]
    descriptions: Option<PathBuf>,

    /// Formula text file (overrides <data_dir>/formulas.txt)
    #[arg(long)]
    formulas: Option<PathBuf>,

    /// Engine config YAML (defaults to the built-in one)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fail formulas that do not compile instead of reading the field they name
    #[arg(long, default_value = "false")]
    no_literal_fallback: bool,
}

#[cfg(feature = "cli")]
impl SourceArgs {
    fn sources(&self) -> EngineSources {
        let defaults = EngineSources::in_dir(&self.data_dir);
        EngineSources {
            config: self.config.clone(),
            weights: self.weights.clone().unwrap_or(defaults.weights),
            descriptions: self.descriptions.clone().unwrap_or(defaults.descriptions),
            formulas: self.formulas.clone().unwrap_or(defaults.formulas),
        }
    }

    fn options(&self) -> EvaluatorOptions {
        EvaluatorOptions { literal_text_fallback: !self.no_literal_fallback }
    }

    fn engine(&self) -> Result<RosterEngine> {
        roster_tools::build_engine(&self.sources(), self.options())
    }
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct RosterArgs {
    /// Input roster JSON (array of player records)
    #[arg(long)]
    roster: PathBuf,

    /// Write the changes back
    #[arg(long, default_value = "false", requires = "out")]
    apply: bool,

    /// Output roster JSON path
    #[arg(long)]
    out: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Recalculate every formula rating
    Ratings {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Assign each player the best archetype for their ratings
    Archetypes {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Recalculate overalls from the current archetype
    Overalls {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Convert legacy archetypes to their current names
    Convert {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Replace archetypes that do not belong to the player's position group
    Fix {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Explain the archetype state of each player
    Diagnose {
        #[command(flatten)]
        sources: SourceArgs,

        /// Input roster JSON
        #[arg(long)]
        roster: PathBuf,

        /// Only this player (index in the roster)
        #[arg(long)]
        index: Option<usize>,
    },

    /// Print every formula in translated form
    Translate {
        #[command(flatten)]
        sources: SourceArgs,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ratings { sources, roster } => {
            run_batch(&sources, &roster, |engine, records| engine.recalculate_ratings(records))?
        }
        Commands::Archetypes { sources, roster } => {
            run_batch(&sources, &roster, |engine, records| engine.regenerate_archetypes(records))?
        }
        Commands::Overalls { sources, roster } => {
            run_batch(&sources, &roster, |engine, records| engine.recalculate_overalls(records))?
        }
        Commands::Convert { sources, roster } => {
            run_batch(&sources, &roster, |engine, records| engine.convert_legacy_archetypes(records))?
        }
        Commands::Fix { sources, roster } => {
            let engine = sources.engine()?;
            let mut records = roster_tools::load_roster(&roster.roster)?;
            let report = engine.fix_invalid_archetypes(&records);
            print_json(&report)?;
            write_back(&roster, &report.batch, &mut records)?;
        }
        Commands::Diagnose { sources, roster, index } => {
            let engine = sources.engine()?;
            let records = roster_tools::load_roster(&roster)?;
            match index {
                Some(index) => {
                    let Some(record) = records.get(index) else {
                        anyhow::bail!("Roster has {} players, no index {}", records.len(), index);
                    };
                    print_json(&engine.diagnose_archetype(index, record))?;
                }
                None => print_json(&engine.diagnose_all(&records))?,
            }
        }
        Commands::Translate { sources } => {
            let loaded = LoadedSources::load(&sources.sources())?;
            print_json(&roster_tools::translation_report(&loaded.formulas))?;
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn run_batch<F>(sources: &SourceArgs, roster: &RosterArgs, operation: F) -> Result<()>
where
    F: FnOnce(&RosterEngine, &[PlayerRecord]) -> BatchReport,
{
    let engine = sources.engine()?;
    let mut records = roster_tools::load_roster(&roster.roster)?;
    let report = operation(&engine, &records);
    print_json(&report)?;
    write_back(roster, &report, &mut records)
}

#[cfg(feature = "cli")]
fn write_back(roster: &RosterArgs, report: &BatchReport, records: &mut [PlayerRecord]) -> Result<()> {
    if !roster.apply {
        return Ok(());
    }
    let Some(out) = &roster.out else {
        anyhow::bail!("--apply needs --out");
    };
    let touched = report.apply(records);
    roster_tools::save_roster(out, records)?;
    eprintln!("Applied {} to {} players, written to {}", report.operation, touched, out.display());
    Ok(())
}

#[cfg(feature = "cli")]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("roster_tools CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
