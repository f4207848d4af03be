//! Value iteration over the current model estimate.
//!
//! Each backup blends the two hypotheses tracked by [`MdpModel`]:
//!
//! ```text
//! det(s,a)   = v[next(s,a)]                          if (s,a) has a recorded successor
//!            = Σv / S                                otherwise
//! stoch(s,a) = (Σv + Σ_j count(s,a,j)·v[j]) / (S + visits(s,a))
//! Q(s,a)     = pD·(rD(s,a) + γ·det(s,a)) + pS·(rS(s,a) + γ·stoch(s,a))
//! ```
//!
//! and sweeps are repeated until `sup|v' - v| <= δ(1-γ)/(2γ)`.

use crate::error::{Error, Result};
use crate::model::MdpModel;
use crate::types::{ActionIndex, StateIndex};
use serde::{Deserialize, Serialize};

/// Outcome of one planning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanReport {
    /// Full sweeps performed, including the accepting one.
    pub sweeps: usize,
    /// `sup|v' - v|` of the accepting sweep.
    pub residual: f64,
}

/// Holds the value function and greedy policy derived from the model.
///
/// Values persist between passes, so each pass warm-starts from the last
/// solution. Backups read only the previous sweep's values (double
/// buffered), so the order states are visited in does not matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueIterationPlanner {
    discount: f64,
    tolerance: f64,
    values: Vec<f64>,
    scratch: Vec<f64>,
    policy: Vec<ActionIndex>,
}

impl ValueIterationPlanner {
    /// Creates a planner over `num_states` states with all values at zero and
    /// action 0 everywhere.
    pub fn new(num_states: usize, discount: f64, tolerance: f64) -> Self {
        Self {
            discount,
            tolerance,
            values: vec![0.0; num_states],
            scratch: vec![0.0; num_states],
            policy: vec![0; num_states],
        }
    }

    /// Runs value iteration to convergence against `model`.
    pub fn plan(&mut self, model: &MdpModel) -> PlanReport {
        let threshold = self.threshold();
        let mut sweeps = 0;
        loop {
            let residual = self.sweep(model);
            sweeps += 1;
            if residual.is_nan() || residual <= threshold {
                return PlanReport { sweeps, residual };
            }
        }
    }

    /// One Bellman backup over every state. Returns the sup-norm change.
    fn sweep(&mut self, model: &MdpModel) -> f64 {
        let values = &self.values;
        let value_sum: f64 = values.iter().sum();
        let mut residual: f64 = 0.0;

        for s in 0..values.len() {
            let mut best_action = 0;
            let mut best = action_value(model, s, 0, values, value_sum, self.discount);

            // With no visits at s every action looks the same.
            if model.estimator().visits_sum(s) > 0 {
                for a in 1..model.num_actions() {
                    let q = action_value(model, s, a, values, value_sum, self.discount);
                    if q > best {
                        best = q;
                        best_action = a;
                    }
                }
            }

            residual = residual.max((best - values[s]).abs());
            self.scratch[s] = best;
            self.policy[s] = best_action;
        }

        std::mem::swap(&mut self.values, &mut self.scratch);
        residual
    }

    /// Blended expected return of taking `action` in `state` under the
    /// current values.
    pub fn q_value(&self, model: &MdpModel, state: StateIndex, action: ActionIndex) -> f64 {
        let value_sum: f64 = self.values.iter().sum();
        action_value(model, state, action, &self.values, value_sum, self.discount)
    }

    /// The stopping threshold `δ(1-γ)/(2γ)`. Infinite for `γ = 0`, where
    /// one sweep is exact.
    pub fn threshold(&self) -> f64 {
        if self.discount > 0.0 {
            self.tolerance * (1.0 - self.discount) / (2.0 * self.discount)
        } else {
            f64::INFINITY
        }
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn policy(&self) -> &[ActionIndex] {
        &self.policy
    }

    /// The greedy action for `state` from the latest pass.
    pub fn action(&self, state: StateIndex) -> ActionIndex {
        self.policy[state]
    }

    pub fn num_states(&self) -> usize {
        self.values.len()
    }

    /// Checks a planner read back from storage against an `S x A` task.
    pub fn validate(&self, num_states: usize, num_actions: usize) -> Result<()> {
        for (name, len) in [
            ("values", self.values.len()),
            ("scratch values", self.scratch.len()),
            ("policy", self.policy.len()),
        ] {
            if len != num_states {
                return Err(Error::Persistence(format!(
                    "planner {} has {} entries, expected {}",
                    name, len, num_states
                )));
            }
        }
        if let Some(state) = self.policy.iter().position(|&a| a >= num_actions) {
            return Err(Error::Persistence(format!(
                "policy picks action {} in state {}, but the task has {} actions",
                self.policy[state], state, num_actions
            )));
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(Error::Persistence(format!(
                "planner discount {} is outside [0, 1]",
                self.discount
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::Persistence(format!(
                "planner tolerance {} is not a positive number",
                self.tolerance
            )));
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Persistence(
                "planner holds a non-finite value".to_string(),
            ));
        }
        Ok(())
    }
}

fn action_value(
    model: &MdpModel,
    state: StateIndex,
    action: ActionIndex,
    values: &[f64],
    value_sum: f64,
    discount: f64,
) -> f64 {
    let estimator = model.estimator();
    let tracker = model.tracker();
    let num_states = values.len() as f64;
    let visits = estimator.visits(state, action);

    let stochastic_future = (value_sum + estimator.weighted_successor_value(state, action, values))
        / (num_states + visits as f64);
    let stochastic = estimator.mean_reward(state, action) + discount * stochastic_future;

    let p_det = tracker.p_deterministic();
    if p_det == 0.0 {
        return stochastic;
    }

    let deterministic_future = match tracker.deterministic_next(state, action) {
        Some(next) if visits > 0 => values[next],
        _ => value_sum / num_states,
    };
    let deterministic = tracker.deterministic_reward(state, action) + discount * deterministic_future;

    p_det * deterministic + (1.0 - p_det) * stochastic
}
