//! The agent's estimate of the unknown MDP.
//!
//! [`MdpModel`] pairs the empirical [`TransitionEstimator`] with the
//! [`MixtureTracker`] and feeds both from the same transitions, so the two
//! hypotheses always see identical evidence.

mod estimator;
mod mixture;

pub use estimator::TransitionEstimator;
pub use mixture::{MixtureStatus, MixtureTracker};

use crate::config::ModelHypothesis;
use crate::error::{Error, Result};
use crate::task::DiscreteTask;
use crate::types::{ActionIndex, StateIndex};
use serde::{Deserialize, Serialize};

/// Everything the agent has learned about the environment's dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdpModel {
    estimator: TransitionEstimator,
    tracker: MixtureTracker,
}

impl MdpModel {
    /// Allocates empty `S x A` tables with optimistic reward estimates.
    pub fn new(task: &DiscreteTask, hypothesis: ModelHypothesis) -> Self {
        let (s, a, r) = (task.num_states, task.num_actions, task.reward_max);
        let tracker = match hypothesis {
            ModelHypothesis::Mixture => MixtureTracker::new(s, a, r),
            ModelHypothesis::StochasticOnly => MixtureTracker::stochastic_only(s, a, r),
        };
        Self {
            estimator: TransitionEstimator::new(s, a, r),
            tracker,
        }
    }

    /// Records a completed transition in both hypotheses. Returns `true` if
    /// it falsified the deterministic hypothesis.
    pub fn record(
        &mut self,
        state: StateIndex,
        action: ActionIndex,
        next_state: Option<StateIndex>,
        reward: f64,
    ) -> bool {
        let visit = self
            .estimator
            .record_transition(state, action, next_state, reward);
        self.tracker
            .observe(state, action, visit, next_state, reward)
    }

    pub fn estimator(&self) -> &TransitionEstimator {
        &self.estimator
    }

    pub fn tracker(&self) -> &MixtureTracker {
        &self.tracker
    }

    pub fn num_states(&self) -> usize {
        self.estimator.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.estimator.num_actions()
    }

    /// Checks the tables of a model read back from storage. Both hypotheses
    /// must cover the same `S x A` pairs and name only states inside `[0, S)`.
    pub fn validate(&self) -> Result<()> {
        self.estimator.validate()?;
        self.tracker.validate()?;
        if self.tracker.num_states() != self.num_states()
            || self.tracker.num_actions() != self.num_actions()
        {
            return Err(Error::Persistence(format!(
                "tracker covers {}x{} pairs but the estimator covers {}x{}",
                self.tracker.num_states(),
                self.tracker.num_actions(),
                self.num_states(),
                self.num_actions()
            )));
        }
        Ok(())
    }
}

/// Number of `(s, a)` pairs in a table, rejecting empty and overflowing
/// shapes.
pub(crate) fn table_size(num_states: usize, num_actions: usize) -> Result<usize> {
    match num_states.checked_mul(num_actions) {
        Some(pairs) if pairs > 0 => Ok(pairs),
        _ => Err(Error::Persistence(format!(
            "{}x{} is not a usable table shape",
            num_states, num_actions
        ))),
    }
}

pub(crate) fn check_len(table: &str, len: usize, expected: usize) -> Result<()> {
    if len == expected {
        Ok(())
    } else {
        Err(Error::Persistence(format!(
            "{} has {} entries, expected {}",
            table, len, expected
        )))
    }
}
