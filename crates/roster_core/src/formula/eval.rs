//! Tree-walking evaluator for compiled rating expressions.
//!
//! Values follow a small dynamic model: numbers, booleans, text and an
//! absent value. Booleans take part in arithmetic as 0/1, `and`/`or` return
//! one of their operands, and a NaN number is truthy.

use crate::attributes::{AttrValue, PlayerRecord, ARCHETYPE_KEY};
use crate::error::EvalError;
use crate::formula::ast::{BinaryOp, CompareOp, Expr, Function, UnaryOp};
use crate::formula::calculator::CompiledFormula;
use std::cmp::Ordering;
use tracing::debug;

/// Inclusive bounds every evaluated rating is clamped into.
pub const RATING_MIN: f64 = 10.0;
pub const RATING_MAX: f64 = 99.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    None,
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::Text(s) => !s.is_empty(),
            Value::None => false,
        }
    }

    /// Numeric view used by arithmetic; text and absent values have none.
    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(_) | Value::None => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::None => "none",
        }
    }
}

/// Name lookup used while evaluating. `None` means the name is unknown.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// A player's record seen as an evaluation namespace.
///
/// Every value is coerced to a number (booleans stay booleans, anything
/// non-numeric reads as NaN) except the archetype, which is kept as text and
/// reads as absent when the record has none.
pub struct RecordScope<'r> {
    record: &'r PlayerRecord,
}

impl<'r> RecordScope<'r> {
    pub fn new(record: &'r PlayerRecord) -> Self {
        Self { record }
    }
}

impl Scope for RecordScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if name == ARCHETYPE_KEY {
            let value = match self.record.get(name) {
                Some(AttrValue::Text(s)) => Value::Text(s.clone()),
                Some(AttrValue::Bool(b)) => Value::Bool(*b),
                Some(AttrValue::Missing) | None => Value::None,
                Some(other) => Value::Number(other.to_number()),
            };
            return Some(value);
        }

        self.record.get(name).map(|value| match value {
            AttrValue::Bool(b) => Value::Bool(*b),
            other => Value::Number(other.to_number()),
        })
    }
}

pub fn eval(expr: &Expr, scope: &dyn Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Var(name) => {
            scope.lookup(name).ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))
        }
        Expr::Unary { op, expr } => {
            let value = eval(expr, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                UnaryOp::Neg => numeric_operand(&value, "unary -").map(|n| Value::Number(-n)),
                UnaryOp::Plus => numeric_operand(&value, "unary +").map(Value::Number),
            }
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            arithmetic(*op, &left, &right)
        }
        Expr::Compare { op, left, right } => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        Expr::And(left, right) => {
            let left = eval(left, scope)?;
            if left.truthy() {
                eval(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = eval(left, scope)?;
            if left.truthy() {
                Ok(left)
            } else {
                eval(right, scope)
            }
        }
        Expr::Conditional { cond, then, otherwise } => {
            if eval(cond, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call { func, args } => {
            let values = args.iter().map(|a| eval(a, scope)).collect::<Result<Vec<_>, _>>()?;
            extremum(*func, values)
        }
    }
}

fn numeric_operand(value: &Value, op: &str) -> Result<f64, EvalError> {
    value
        .numeric()
        .ok_or_else(|| EvalError::TypeMismatch(format!("bad operand type for {}: {}", op, value.type_name())))
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let symbol = match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
    };
    let (a, b) = match (left.numeric(), right.numeric()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "unsupported operand types for {}: {} and {}",
                symbol,
                left.type_name(),
                right.type_name()
            )))
        }
    };

    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a / b,
    };
    Ok(Value::Number(n))
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    // Numbers and booleans compare numerically, with IEEE NaN semantics.
    if let (Some(a), Some(b)) = (left.numeric(), right.numeric()) {
        return Ok(match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        });
    }

    let ordering = match (left, right) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let equal = match (left, right) {
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::None, Value::None) => true,
        _ => false,
    };

    match op {
        CompareOp::Eq => Ok(equal),
        CompareOp::Ne => Ok(!equal),
        _ => {
            let ordering = ordering.ok_or_else(|| {
                EvalError::TypeMismatch(format!(
                    "ordering not supported between {} and {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// MIN/MAX keep the first extreme value: a later argument replaces the
/// current one only when strictly smaller (larger).
fn extremum(func: Function, values: Vec<Value>) -> Result<Value, EvalError> {
    let mut best: Option<(f64, Value)> = None;
    for value in values {
        let n = value.numeric().ok_or_else(|| {
            EvalError::TypeMismatch(format!("{} argument must be numeric, got {}", func, value.type_name()))
        })?;
        let replace = match &best {
            None => true,
            Some((current, _)) => match func {
                Function::Min => n < *current,
                Function::Max => n > *current,
            },
        };
        if replace {
            best = Some((n, value));
        }
    }
    best.map(|(_, value)| value).ok_or(EvalError::EmptyArguments(func.name()))
}

/// Clamp a raw result into the rating range and round half to even.
///
/// The upper bound is applied first and only replaced by a strictly smaller
/// value, so NaN ends up at the maximum.
pub fn clamp_rating(raw: f64) -> i32 {
    let capped = if raw < RATING_MAX { raw } else { RATING_MAX };
    let floored = if capped > RATING_MIN { capped } else { RATING_MIN };
    floored.round_ties_even() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// On failure, read the record value stored under the formula's own
    /// normalized text before giving up with 0.
    pub literal_text_fallback: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self { literal_text_fallback: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormulaEvaluator {
    options: EvaluatorOptions,
}

impl FormulaEvaluator {
    pub fn new(options: EvaluatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> EvaluatorOptions {
        self.options
    }

    /// Evaluate without fallback.
    pub fn try_evaluate(&self, formula: &CompiledFormula, record: &PlayerRecord) -> Result<i32, EvalError> {
        let program = formula.program.as_ref().map_err(|e| EvalError::Compile(e.clone()))?;
        match eval(program, &RecordScope::new(record))? {
            Value::Number(n) => Ok(clamp_rating(n)),
            Value::Bool(b) => Ok(clamp_rating(if b { 1.0 } else { 0.0 })),
            Value::Text(_) | Value::None => Err(EvalError::NonNumericResult),
        }
    }

    /// Evaluate, recovering every failure with the fallback value.
    pub fn evaluate(&self, formula: &CompiledFormula, record: &PlayerRecord) -> i32 {
        match self.try_evaluate(formula, record) {
            Ok(rating) => rating,
            Err(e) => {
                let fallback = self.fallback(&formula.expression, record);
                debug!("Formula '{}' failed ({}), using {}", formula.expression, e, fallback);
                fallback
            }
        }
    }

    /// Value stored under the expression text, truncated to an integer
    /// (the stored value itself is not returned as is), else 0.
    fn fallback(&self, expression: &str, record: &PlayerRecord) -> i32 {
        if !self.options.literal_text_fallback {
            return 0;
        }
        match record.get(expression).map(AttrValue::to_number) {
            Some(n) if n.is_finite() => n.trunc() as i32,
            _ => 0,
        }
    }
}
