//! Error types for the assertion engine.
//!
//! Registration problems, unknown phrases, failed expectations, and
//! configuration mistakes are all distinct variants so callers can tell
//! a broken test apart from a broken registration.

use crate::engine::AssertionFailure;
use thiserror::Error;

/// Errors raised by the engine.
///
/// Only [`EngineError::Failure`] is ever rewritten by the error-mode
/// protocol; every other variant propagates untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An assertion pattern failed validation at registration time.
    #[error("invalid assertion pattern: {message}: '{pattern}'")]
    Pattern { pattern: String, message: String },

    /// The phrase was already registered by an unrelated call.
    #[error("cannot redefine assertion: {phrase}")]
    Redefinition { phrase: String },

    /// A type registration named a base that does not exist.
    #[error("unknown base type: {name}")]
    UnknownBaseType { name: String },

    /// No registration matched the phrase; carries ranked suggestions.
    #[error("unknown assertion '{phrase}', did you mean: '{}'", .suggestions.first().map(String::as_str).unwrap_or(""))]
    UnknownAssertion {
        phrase: String,
        suggestions: Vec<String>,
    },

    /// A handler's expectation was not met.
    #[error("{0}")]
    Failure(AssertionFailure),

    /// An error-mode name did not resolve to a known mode.
    #[error("unknown error mode: '{0}'")]
    UnknownErrorMode(String),

    /// An output-format name did not resolve to a known format.
    #[error("unknown output format: '{0}'")]
    UnknownOutputFormat(String),

    /// Equality recursed past the cycle guard; the input is malformed,
    /// not merely unequal.
    #[error("cannot compare circular structures")]
    CircularStructure,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
