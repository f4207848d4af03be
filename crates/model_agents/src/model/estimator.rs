//! Empirical transition counts and running reward means.

use super::{check_len, table_size};
use crate::error::{Error, Result};
use crate::types::{ActionIndex, StateIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per state-action statistics gathered from experience.
///
/// Next-state counts are sparse: a pair only stores the successors it has
/// actually produced, so memory grows with observed diversity rather than
/// with `S² · A`. Every table is indexed `s * A + a`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEstimator {
    num_states: usize,
    num_actions: usize,
    /// Next state -> number of times it followed `(s, a)`.
    counts: Vec<HashMap<StateIndex, u64>>,
    visits: Vec<u64>,
    visits_sum: Vec<u64>,
    /// Running mean reward of `(s, a)` under the stochastic hypothesis.
    rewards: Vec<f64>,
}

impl TransitionEstimator {
    /// Creates empty statistics with every reward estimate seeded to
    /// `reward_max`.
    pub fn new(num_states: usize, num_actions: usize, reward_max: f64) -> Self {
        let pairs = num_states * num_actions;
        Self {
            num_states,
            num_actions,
            counts: vec![HashMap::new(); pairs],
            visits: vec![0; pairs],
            visits_sum: vec![0; num_states],
            rewards: vec![reward_max; pairs],
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

    /// Records one completed transition of `(state, action)` and returns the
    /// pair's visit count including this one.
    ///
    /// `next_state` is `None` for the terminal transition of an episode,
    /// which updates the visit count and the reward mean but adds no
    /// successor count.
    pub fn record_transition(
        &mut self,
        state: StateIndex,
        action: ActionIndex,
        next_state: Option<StateIndex>,
        reward: f64,
    ) -> u64 {
        let i = self.index(state, action);
        self.visits[i] += 1;
        self.visits_sum[state] += 1;

        if let Some(next) = next_state {
            *self.counts[i].entry(next).or_insert(0) += 1;
        }

        let n = self.visits[i];
        self.rewards[i] = ((n - 1) as f64 * self.rewards[i] + reward) / n as f64;
        n
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Times `action` has been taken in `state`.
    pub fn visits(&self, state: StateIndex, action: ActionIndex) -> u64 {
        self.visits[self.index(state, action)]
    }

    /// Times any action has been taken in `state`.
    pub fn visits_sum(&self, state: StateIndex) -> u64 {
        self.visits_sum[state]
    }

    /// Visit counts of every action in `state`, indexed by action.
    pub fn action_visits(&self, state: StateIndex) -> &[u64] {
        let start = self.index(state, 0);
        &self.visits[start..start + self.num_actions]
    }

    /// Observed successors of `(state, action)` with their counts.
    pub fn next_state_counts(
        &self,
        state: StateIndex,
        action: ActionIndex,
    ) -> &HashMap<StateIndex, u64> {
        &self.counts[self.index(state, action)]
    }

    /// Running mean reward of `(state, action)`.
    pub fn mean_reward(&self, state: StateIndex, action: ActionIndex) -> f64 {
        self.rewards[self.index(state, action)]
    }

    /// `Σ_j count(s, a, j) · values[j]` over observed successors.
    pub fn weighted_successor_value(
        &self,
        state: StateIndex,
        action: ActionIndex,
        values: &[f64],
    ) -> f64 {
        self.next_state_counts(state, action)
            .iter()
            .map(|(&next, &count)| count as f64 * values[next])
            .sum()
    }

    /// Laplace-smoothed estimate of `P(next | state, action)`: every state
    /// carries one pseudo-count, normalized by `S + visits(s, a)`.
    pub fn transition_probability(
        &self,
        state: StateIndex,
        action: ActionIndex,
        next: StateIndex,
    ) -> f64 {
        let i = self.index(state, action);
        let count = self.counts[i].get(&next).copied().unwrap_or(0);
        (1 + count) as f64 / (self.num_states as u64 + self.visits[i]) as f64
    }

    /// Checks tables read back from storage: every table is sized for the
    /// declared shape, successors lie inside `[0, S)`, successor counts never
    /// exceed the pair's visits, and per-state visit sums agree with the
    /// per-pair visits.
    pub fn validate(&self) -> Result<()> {
        let pairs = table_size(self.num_states, self.num_actions)?;
        check_len("estimator counts", self.counts.len(), pairs)?;
        check_len("estimator visits", self.visits.len(), pairs)?;
        check_len("estimator rewards", self.rewards.len(), pairs)?;
        check_len("estimator visit sums", self.visits_sum.len(), self.num_states)?;

        for (i, successors) in self.counts.iter().enumerate() {
            if let Some(next) = successors.keys().find(|&&next| next >= self.num_states) {
                return Err(Error::Persistence(format!(
                    "pair {} has successor {} outside {} states",
                    i, next, self.num_states
                )));
            }
            let total = successors
                .values()
                .try_fold(0u64, |sum, &count| sum.checked_add(count));
            if total.is_none_or(|total| total > self.visits[i]) {
                return Err(Error::Persistence(format!(
                    "pair {} has more successor counts than visits",
                    i
                )));
            }
        }

        for (state, chunk) in self.visits.chunks(self.num_actions).enumerate() {
            let total = chunk.iter().try_fold(0u64, |sum, &n| sum.checked_add(n));
            if total != Some(self.visits_sum[state]) {
                return Err(Error::Persistence(format!(
                    "visit sum of state {} does not match its pair visits",
                    state
                )));
            }
        }

        if let Some(i) = self.rewards.iter().position(|r| !r.is_finite()) {
            return Err(Error::Persistence(format!(
                "pair {} has a non-finite reward estimate",
                i
            )));
        }
        Ok(())
    }
}
