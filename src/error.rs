//! Error types for electron identification
//!
//! Almost everything that can go wrong here is a configuration problem: a
//! working point that does not exist, a formula that does not parse, a weight
//! file that cannot be found. Those are reported as soon as they are detected.
//! Degenerate electrons (e.g. without a supercluster) are never errors, they
//! simply fail the affected cuts.

use crate::numeric::Float;
use std::path::PathBuf;
use thiserror::Error;

/// Electron identification error type
#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    /// An evaluator was asked about a working point it does not define
    #[error("{evaluator} has no working point named '{working_point}'")]
    UnknownWorkingPoint {
        evaluator: String,
        working_point: String,
    },

    /// A registry was asked about an identification it does not define
    #[error("no {kind} named '{name}' is configured")]
    UnknownIdentification { kind: &'static str, name: String },

    /// A working point has no threshold for the requested category
    #[error("working point '{working_point}' defines no threshold for category {category}")]
    MissingCategory {
        working_point: String,
        category: usize,
    },

    /// A category key did not follow the `cutCategory<N>` convention
    #[error("malformed category key '{0}', expected 'cutCategory<N>'")]
    MalformedCategoryKey(String),

    /// None of the effective-area keys is part of a working point name
    #[error("no effective-area table matches identification '{id_name}'")]
    NoEffectiveAreaKey { id_name: String },

    /// An effective-area table lacks the requested isolation variable
    #[error("effective-area table '{key}' has no entry for variable '{variable}'")]
    MissingEffectiveArea { key: String, variable: String },

    /// Syntax or identifier error in a formula or cut string
    #[error("expression error: {0}")]
    Expression(String),

    /// A weight or variable file could not be located
    #[error("cannot resolve file '{}'", path.display())]
    UnresolvedFile { path: PathBuf },

    /// Category cuts and weight files must come in equal numbers
    #[error("{cuts} category cuts were configured for {weight_files} weight files")]
    CategoryCount { cuts: usize, weight_files: usize },

    /// Lazy construction of a discriminant model failed earlier
    #[error("model '{model}' is unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// A cut parameter is outside of its physical domain
    #[error("cut parameter '{parameter}' of '{id_name}' is invalid: {value}")]
    InvalidCutParameter {
        id_name: String,
        parameter: &'static str,
        value: Float,
    },

    /// Structural validation error in a configuration file
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure of an external discriminant engine, passed through untouched
    #[error(transparent)]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
