//! Error types for task specification parsing.

use thiserror::Error;

/// A specialized `Result` type for task spec parsing.
pub type Result<T> = std::result::Result<T, TaskSpecError>;

/// Errors produced while parsing an RL-Glue task specification string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskSpecError {
    /// The input ended while a token was still expected.
    #[error("Unexpected end of task spec, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A token was found where a different one was expected.
    #[error("Unexpected token `{found}`, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    /// A mandatory section keyword never appeared.
    #[error("Missing section {0}")]
    MissingSection(&'static str),

    /// A numeric field could not be parsed or was not finite.
    #[error("Invalid number `{0}`")]
    InvalidNumber(String),

    /// A range was malformed or had `min > max`.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The discount factor was outside `[0, 1]`.
    #[error("Discount factor {0} is outside [0, 1]")]
    InvalidDiscount(f64),
}
