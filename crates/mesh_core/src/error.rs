//! Error types for mesh_core

use thiserror::Error;

/// Errors raised while evaluating a target expression
///
/// These never escape the engine: the target renderer recovers from them by
/// showing a fallback display and logging the failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Nothing left to evaluate after sanitization
    #[error("empty expression")]
    Empty,

    /// The expression is not well-formed arithmetic
    #[error("malformed expression at column {column}: {message}")]
    Syntax {
        /// 1-indexed column in the arithmetic text after `@name` substitution
        column: usize,
        /// What the parser expected
        message: String,
    },

    /// A `@name` reference that matches no known source
    #[error("unknown variable @{0}")]
    UnknownVariable(String),

    /// Parentheses nest deeper than the evaluator allows
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    /// Arithmetic produced infinity or NaN (for example division by zero)
    #[error("arithmetic produced a non-finite result")]
    NonFinite,
}

/// Errors raised by persistence backends
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed
    #[error("persistence I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not hold a JSON object of strings
    #[error("persistence file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while building or driving a mesh
#[derive(Error, Debug)]
pub enum MeshError {
    /// Two sources share a name (compared case-insensitively)
    #[error("duplicate source name: {0}")]
    DuplicateSource(String),

    /// A source whose minimum lies above its maximum
    #[error("source {name} has min {min} greater than max {max}")]
    InvalidBounds { name: String, min: f64, max: f64 },

    /// An element is missing its identifying attribute
    #[error("element is missing the {0} attribute")]
    MissingAttribute(String),

    /// A gesture or query named a source the mesh does not know
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// Configuration values out of range
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration text could not be parsed
    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Persistence backend failure while opening a store
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for mesh_core operations
pub type Result<T> = std::result::Result<T, MeshError>;
