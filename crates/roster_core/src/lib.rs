//! # roster_core - Attribute Derivation Engine
//!
//! Derives player ratings for a sports roster editor:
//!
//! - rating formulas written in a spreadsheet dialect are translated into a
//!   small expression language, compiled once and evaluated per player
//! - archetypes are chosen by weighted attribute scores
//! - overall ratings map a weighted attribute average onto the 12..=99 scale
//!
//! Everything here is pure and synchronous. Tables are immutable after
//! construction; roster-wide operations return change sets that the caller
//! applies.

pub mod attributes;
pub mod config;
pub mod error;
pub mod formula;
pub mod roster;
pub mod scoring;

pub use attributes::{AttrValue, AttributeNameMap, PlayerRecord};
pub use config::{default_config, EngineConfig};
pub use error::{ConfigError, EvalError, FormulaError, Result};
pub use formula::{
    translate_formulas, CompiledFormulaSet, EvaluatorOptions, FormulaDocument, FormulaTranslator, RatingCalculator,
};
pub use roster::{ArchetypeDiagnosis, BatchReport, FixReport, RosterEngine};
pub use scoring::{ArchetypeScorer, OverallScorer, WeightEntry, WeightTable};
