//! Compiled per-position formula sets and the rating calculator.

use crate::attributes::{AttrValue, AttributeNameMap, PlayerRecord};
use crate::config::{default_config, EngineConfig};
use crate::error::FormulaError;
use crate::formula::ast::Expr;
use crate::formula::document::FormulaDocument;
use crate::formula::eval::{EvaluatorOptions, FormulaEvaluator};
use crate::formula::parser::parse;
use crate::formula::translate::FormulaTranslator;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Position used when a record carries no `PositionName`.
pub const UNKNOWN_POSITION: &str = "Unknown";

/// A formula in normalized form together with its compile outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    /// Raw spreadsheet text, when the formula came from a document.
    pub source: Option<String>,
    /// Normalized expression text.
    pub expression: String,
    pub program: Result<Expr, FormulaError>,
}

impl CompiledFormula {
    /// Compile an already normalized expression.
    pub fn compile(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let program = parse(&expression);
        Self { source: None, expression, program }
    }

    /// Translate a raw spreadsheet formula, then compile it.
    pub fn from_raw(raw: &str, translator: &FormulaTranslator<'_>) -> (Self, Vec<String>) {
        let translation = translator.translate(raw);
        let mut compiled = Self::compile(translation.expression);
        compiled.source = Some(raw.to_string());
        (compiled, translation.diagnostics)
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_ok()
    }
}

/// Ordered rating formulas of one position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionFormulas {
    pub position: String,
    pub ratings: Vec<(String, CompiledFormula)>,
}

impl PositionFormulas {
    pub fn get(&self, rating: &str) -> Option<&CompiledFormula> {
        self.ratings.iter().find(|(name, _)| name == rating).map(|(_, f)| f)
    }
}

/// Every compiled formula, keyed by formula position key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFormulaSet {
    positions: Vec<PositionFormulas>,
}

impl CompiledFormulaSet {
    /// Translate and compile a document. Section headings go through the
    /// configured aliases; a heading that resolves to a key seen earlier
    /// replaces that earlier section.
    pub fn build(document: &FormulaDocument, names: &AttributeNameMap, config: &EngineConfig) -> Self {
        let translator = FormulaTranslator::new(names);
        let mut set = Self::default();

        for line in &document.skipped {
            debug!("Formula document line {} skipped: '{}'", line.line_no, line.text);
        }

        for section in &document.sections {
            let position = config.section_key(&section.heading).to_string();
            let mut formulas = PositionFormulas { position: position.clone(), ratings: Vec::new() };

            for rating in &section.ratings {
                let (compiled, diagnostics) = CompiledFormula::from_raw(&rating.formula, &translator);
                for diagnostic in diagnostics {
                    warn!("{} / {}: {}", position, rating.name, diagnostic);
                }
                if let Err(e) = &compiled.program {
                    warn!(
                        "{} / {}: formula '{}' does not compile ({}), evaluation will fall back",
                        position, rating.name, compiled.expression, e
                    );
                }
                formulas.ratings.push((rating.name.clone(), compiled));
            }

            set.insert(formulas);
        }

        debug!(
            "Compiled {} formulas for {} positions",
            set.positions.iter().map(|p| p.ratings.len()).sum::<usize>(),
            set.positions.len()
        );
        set
    }

    pub fn insert(&mut self, formulas: PositionFormulas) {
        match self.positions.iter_mut().find(|p| p.position == formulas.position) {
            Some(existing) => {
                warn!("Formula section '{}' defined twice, keeping the later one", formulas.position);
                *existing = formulas;
            }
            None => self.positions.push(formulas),
        }
    }

    pub fn position(&self, key: &str) -> Option<&PositionFormulas> {
        self.positions.iter().find(|p| p.position == key)
    }

    pub fn positions(&self) -> impl Iterator<Item = &PositionFormulas> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Translate and compile a formula document with the default section aliases.
pub fn translate_formulas(document: &FormulaDocument, names: &AttributeNameMap) -> CompiledFormulaSet {
    CompiledFormulaSet::build(document, names, default_config())
}

/// Map a roster position onto the key its formulas are filed under.
///
/// Any position containing "LB" reads the linebacker formulas. After that,
/// any position containing "S" reads the safety formulas, which also catches
/// positions such as "SAM".
pub fn formula_position_key(position: &str) -> &str {
    let position = if position.contains("LB") { "LB" } else { position };
    if position.contains('S') {
        "SS"
    } else {
        position
    }
}

/// One rating whose recalculated value differs from the stored one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingChange {
    pub rating: String,
    /// Stored value as a number; NaN when it is not numeric.
    pub old: Option<f64>,
    pub new: i32,
}

pub struct RatingCalculator {
    formulas: CompiledFormulaSet,
    evaluator: FormulaEvaluator,
}

impl RatingCalculator {
    pub fn new(formulas: CompiledFormulaSet) -> Self {
        Self::with_options(formulas, EvaluatorOptions::default())
    }

    pub fn with_options(formulas: CompiledFormulaSet, options: EvaluatorOptions) -> Self {
        Self { formulas, evaluator: FormulaEvaluator::new(options) }
    }

    /// Parse, translate and compile a formula document in one go.
    pub fn from_document(text: &str, names: &AttributeNameMap, config: &EngineConfig) -> Self {
        let document = FormulaDocument::parse_with_config(text, config);
        Self::new(CompiledFormulaSet::build(&document, names, config))
    }

    pub fn formulas(&self) -> &CompiledFormulaSet {
        &self.formulas
    }

    /// Every rating defined for `position`, evaluated against `record`.
    /// Positions without formulas yield an empty map.
    pub fn calculate_all_ratings(&self, position: &str, record: &PlayerRecord) -> BTreeMap<String, i32> {
        let key = formula_position_key(position);
        let Some(formulas) = self.formulas.position(key) else {
            return BTreeMap::new();
        };

        formulas
            .ratings
            .iter()
            .map(|(name, formula)| (name.clone(), self.evaluator.evaluate(formula, record)))
            .collect()
    }

    /// [`RatingCalculator::calculate_all_ratings`] for the record's own position.
    pub fn calculate_for_record(&self, record: &PlayerRecord) -> BTreeMap<String, i32> {
        let position = record.position().unwrap_or(UNKNOWN_POSITION);
        self.calculate_all_ratings(position, record)
    }

    /// Ratings whose recalculated value differs from what the record stores.
    /// A fractional stored value never equals the integer rating.
    pub fn rating_changes(&self, record: &PlayerRecord) -> Vec<RatingChange> {
        self.calculate_for_record(record)
            .into_iter()
            .filter_map(|(rating, new)| {
                let old = record.get(&rating).filter(|v| !v.is_missing()).map(AttrValue::to_number);
                (old != Some(f64::from(new))).then_some(RatingChange { rating, old, new })
            })
            .collect()
    }
}
