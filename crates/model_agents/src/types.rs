//! Observation and action payloads exchanged with the environment.
//!
//! Both mirror the RL-Glue abstract type: an integer array, a real array and
//! a character string. The discrete agents in this crate only read and write
//! the first integer.

use serde::{Deserialize, Serialize};

/// Index of a state in `[0, S)`.
pub type StateIndex = usize;
/// Index of an action in `[0, A)`.
pub type ActionIndex = usize;

/// What the environment reports after each step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub ints: Vec<i64>,
    pub doubles: Vec<f64>,
    pub chars: String,
}

impl Observation {
    /// An observation holding a single discrete state.
    pub fn discrete(state: StateIndex) -> Self {
        Self {
            ints: vec![state as i64],
            ..Default::default()
        }
    }

    /// The first integer component, if any.
    pub fn first_int(&self) -> Option<i64> {
        self.ints.first().copied()
    }
}

/// What the agent sends back to the environment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    pub ints: Vec<i64>,
    pub doubles: Vec<f64>,
    pub chars: String,
}

impl Action {
    /// An action holding a single discrete choice.
    pub fn discrete(action: ActionIndex) -> Self {
        Self {
            ints: vec![action as i64],
            ..Default::default()
        }
    }

    /// The discrete choice, if this is a well-formed single-integer action.
    pub fn as_discrete(&self) -> Option<ActionIndex> {
        self.ints
            .first()
            .and_then(|&a| usize::try_from(a).ok())
    }
}
