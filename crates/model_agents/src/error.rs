//! Error types for the model-based agents.

use rl_task_spec::TaskSpecError;
use thiserror::Error;

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error enum for all operations within the `model_agents` crate.
///
/// Everything here is fatal for the call that produced it. Unrecognized
/// messages are not errors; `Agent::message` always answers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The task descriptor could not be parsed.
    #[error("Task spec error: {0}")]
    TaskSpec(#[from] TaskSpecError),

    /// The task is well formed but not a single discrete, bounded
    /// observation/action pair.
    #[error("Unsupported task shape: {0}")]
    UnsupportedTaskShape(String),

    /// The harness delivered a state outside the range declared at init.
    #[error("State {state} is outside the task's range [0, {num_states})")]
    StateOutOfRange { state: i64, num_states: usize },

    /// The observation had no integer component to read a state from.
    #[error("Observation carries no discrete state")]
    MissingState,

    /// An operation was called in a lifecycle phase that does not allow it.
    #[error("Cannot {operation} while the agent is {phase}")]
    Lifecycle {
        operation: &'static str,
        phase: String,
    },

    /// The agent configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Saving or loading a model snapshot failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}
