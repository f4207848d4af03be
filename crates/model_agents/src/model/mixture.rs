//! Belief that the world is deterministic rather than stochastic.

use super::{check_len, table_size};
use crate::error::{Error, Result};
use crate::types::{ActionIndex, StateIndex};
use serde::{Deserialize, Serialize};

/// Whether the deterministic hypothesis still explains every observation.
///
/// One contradiction anywhere in the MDP falsifies the deterministic model
/// class for the whole run. `FalsifiedStochastic` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixtureStatus {
    Consistent,
    FalsifiedStochastic,
}

/// Tracks the first observed outcome of each pair and the global confidence
/// factor that trades the deterministic hypothesis against the stochastic one.
///
/// While consistent, `pD = 1 / (1 + s_factor)` and `pS = 1 - pD`. The prior
/// `s_factor = 1` gives both hypotheses equal weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureTracker {
    num_states: usize,
    num_actions: usize,
    status: MixtureStatus,
    s_factor: f64,
    /// Successor recorded on the first visit. `None` until a non-terminal
    /// transition of the pair has been seen.
    next_states: Vec<Option<StateIndex>>,
    /// Reward recorded on the first visit, seeded optimistically.
    rewards: Vec<f64>,
}

impl MixtureTracker {
    pub fn new(num_states: usize, num_actions: usize, reward_max: f64) -> Self {
        let pairs = num_states * num_actions;
        Self {
            num_states,
            num_actions,
            status: MixtureStatus::Consistent,
            s_factor: 1.0,
            next_states: vec![None; pairs],
            rewards: vec![reward_max; pairs],
        }
    }

    /// A tracker that has given up on determinism before seeing any data.
    pub fn stochastic_only(num_states: usize, num_actions: usize, reward_max: f64) -> Self {
        Self {
            status: MixtureStatus::FalsifiedStochastic,
            ..Self::new(num_states, num_actions, reward_max)
        }
    }

    fn index(&self, state: StateIndex, action: ActionIndex) -> usize {
        assert!(
            state < self.num_states && action < self.num_actions,
            "pair ({}, {}) outside {}x{} tables",
            state,
            action,
            self.num_states,
            self.num_actions
        );
        state * self.num_actions + action
    }

    /// Feeds one transition of `(state, action)`, whose visit count including
    /// this transition is `visit`. Returns `true` if this observation is the
    /// one that falsified the deterministic hypothesis.
    ///
    /// A terminal transition (`next_state == None`) is compared on reward only.
    pub fn observe(
        &mut self,
        state: StateIndex,
        action: ActionIndex,
        visit: u64,
        next_state: Option<StateIndex>,
        reward: f64,
    ) -> bool {
        if self.status == MixtureStatus::FalsifiedStochastic || visit == 0 {
            return false;
        }
        let i = self.index(state, action);

        if visit == 1 {
            self.next_states[i] = next_state;
            self.rewards[i] = reward;
            return false;
        }

        self.s_factor *= visit as f64 / (self.num_states as u64 + visit - 1) as f64;

        let next_differs = match (self.next_states[i], next_state) {
            (Some(recorded), Some(observed)) => recorded != observed,
            (None, Some(observed)) => {
                self.next_states[i] = Some(observed);
                false
            }
            (_, None) => false,
        };

        if next_differs || reward != self.rewards[i] {
            self.status = MixtureStatus::FalsifiedStochastic;
            return true;
        }
        false
    }

    pub fn status(&self) -> MixtureStatus {
        self.status
    }

    pub fn s_factor(&self) -> f64 {
        self.s_factor
    }

    /// Probability that the MDP is deterministic.
    pub fn p_deterministic(&self) -> f64 {
        match self.status {
            MixtureStatus::Consistent => 1.0 / (1.0 + self.s_factor),
            MixtureStatus::FalsifiedStochastic => 0.0,
        }
    }

    /// Probability that the MDP is stochastic.
    pub fn p_stochastic(&self) -> f64 {
        1.0 - self.p_deterministic()
    }

    /// The successor the deterministic hypothesis predicts for the pair.
    pub fn deterministic_next(&self, state: StateIndex, action: ActionIndex) -> Option<StateIndex> {
        self.next_states[self.index(state, action)]
    }

    /// The reward the deterministic hypothesis predicts for the pair.
    pub fn deterministic_reward(&self, state: StateIndex, action: ActionIndex) -> f64 {
        self.rewards[self.index(state, action)]
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Checks tables read back from storage: both tables are sized for the
    /// declared shape, recorded successors lie inside `[0, S)` and the
    /// confidence factor is a finite, non-negative number.
    pub fn validate(&self) -> Result<()> {
        let pairs = table_size(self.num_states, self.num_actions)?;
        check_len("tracker successors", self.next_states.len(), pairs)?;
        check_len("tracker rewards", self.rewards.len(), pairs)?;

        if let Some((i, next)) = self
            .next_states
            .iter()
            .enumerate()
            .find_map(|(i, next)| next.filter(|&n| n >= self.num_states).map(|n| (i, n)))
        {
            return Err(Error::Persistence(format!(
                "pair {} predicts successor {} outside {} states",
                i, next, self.num_states
            )));
        }
        if !(self.s_factor.is_finite() && self.s_factor >= 0.0) {
            return Err(Error::Persistence(format!(
                "confidence factor {} is not a finite non-negative number",
                self.s_factor
            )));
        }
        if self.rewards.iter().any(|r| !r.is_finite()) {
            return Err(Error::Persistence(
                "tracker holds a non-finite reward".to_string(),
            ));
        }
        Ok(())
    }
}
