use thiserror::Error;

/// Failures while loading or validating engine configuration.
///
/// None of these abort the engine: callers log them once and continue with
/// empty tables, so every later query answers "no result".
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration missing: {what}")]
    Missing { what: String },

    #[error("Malformed {what}: {detail}")]
    Malformed { what: String, detail: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn malformed(what: impl Into<String>, detail: impl Into<String>) -> Self {
        ConfigError::Malformed { what: what.into(), detail: detail.into() }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        ConfigError::Missing { what: what.into() }
    }

    /// Whether the load can go on with the remaining units.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ConfigError::Missing { .. } => true,
            ConfigError::Malformed { .. } => true,
            ConfigError::Yaml(_) => false,
            ConfigError::Io(_) => true,
        }
    }
}

/// Compile-time errors of the normalized expression language.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("unexpected token '{found}' (expected {expected})")]
    UnexpectedToken { found: String, expected: &'static str },

    #[error("unexpected end of formula (expected {expected})")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown function '{0}' (only MIN and MAX are callable)")]
    UnknownFunction(String),

    #[error("chained comparison is not supported")]
    ChainedComparison,

    #[error("trailing input starting at '{0}'")]
    TrailingInput(String),

    #[error("formula nests deeper than {} levels", crate::formula::parser::MAX_DEPTH)]
    TooDeep,
}

/// Per-player evaluation failures. Always recovered by the evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0} called without arguments")]
    EmptyArguments(&'static str),

    #[error("formula produced a non-numeric result")]
    NonNumericResult,

    #[error("formula failed to compile: {0}")]
    Compile(#[from] FormulaError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
