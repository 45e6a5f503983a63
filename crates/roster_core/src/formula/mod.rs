//! Rating formulas: spreadsheet text → normalized expression → AST → rating.
//!
//! - [`document`] splits the formula text file into positions and ratings
//! - [`translate`] rewrites spreadsheet syntax into the expression language
//! - [`parser`] compiles an expression into an [`ast::Expr`]
//! - [`eval`] evaluates it against a player record
//! - [`calculator`] ties them together per position

pub mod ast;
pub mod calculator;
pub mod document;
pub mod eval;
pub mod parser;
pub mod token;
pub mod translate;

pub use calculator::{
    formula_position_key, translate_formulas, CompiledFormula, CompiledFormulaSet, PositionFormulas,
    RatingCalculator, RatingChange,
};
pub use document::{FormulaDocument, PositionSection, RatingFormula};
pub use eval::{EvaluatorOptions, FormulaEvaluator, Value};
pub use translate::{FormulaTranslator, Translation};
