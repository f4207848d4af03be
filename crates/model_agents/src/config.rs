//! Configuration for model-based agents.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which world models the planner blends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ModelHypothesis {
    /// Weigh a deterministic and a stochastic explanation of the data, and
    /// drop the deterministic one for good once it is contradicted.
    #[default]
    Mixture,
    /// Assume the world is stochastic from the first step.
    StochasticOnly,
}

/// How the exploration probability of a state is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExplorationSchedule {
    /// `ε(s) = visits(s)^(-exponent)`: decays with experience at `s`.
    VisitDecay { exponent: f64 },
    /// A fixed `ε` for every state.
    Constant { epsilon: f64 },
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        ExplorationSchedule::VisitDecay { exponent: 0.8 }
    }
}

/// How an exploratory action is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExplorationDraw {
    /// Probability proportional to `1 / (visits(s, a) + 1)`.
    #[default]
    RarityWeighted,
    /// Every action equally likely.
    Uniform,
}

/// Defines the configuration for a model-based agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name returned to the identification query.
    pub name: String,
    /// The model class the planner works with.
    pub hypothesis: ModelHypothesis,
    /// The exploration probability schedule.
    pub exploration: ExplorationSchedule,
    /// How exploratory actions are sampled.
    pub draw: ExplorationDraw,
    /// The tolerance δ in the value iteration stopping rule
    /// `sup|v' - v| <= δ(1-γ)/(2γ)`.
    pub tolerance: f64,
    /// Upper bound applied to the task's discount factor. Must be below 1 so
    /// that value iteration is a contraction.
    pub max_discount: f64,
    /// Plan once every this many accepted transitions.
    pub planning_batch: usize,
    /// Optimistic reward seed used when the task does not bound its rewards.
    pub default_reward_max: f64,
    /// Seed for the exploration RNG. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::mixed()
    }
}

impl AgentConfig {
    /// The deterministic/stochastic mixture agent with visit-decayed,
    /// rarity-weighted exploration.
    pub fn mixed() -> Self {
        Self {
            name: "MixedModelAgent".to_string(),
            hypothesis: ModelHypothesis::Mixture,
            exploration: ExplorationSchedule::default(),
            draw: ExplorationDraw::RarityWeighted,
            tolerance: 0.01,
            max_discount: 0.95,
            planning_batch: 1,
            default_reward_max: 10.0,
            seed: None,
        }
    }

    /// A purely stochastic model with the same exploration as [`mixed`](Self::mixed).
    pub fn stochastic() -> Self {
        Self {
            name: "SuperModelAgent".to_string(),
            hypothesis: ModelHypothesis::StochasticOnly,
            ..Self::mixed()
        }
    }

    /// A purely stochastic model explored with a fixed, uniform 5% ε.
    pub fn fixed_exploration() -> Self {
        Self {
            name: "ModelAgent".to_string(),
            hypothesis: ModelHypothesis::StochasticOnly,
            exploration: ExplorationSchedule::Constant { epsilon: 0.05 },
            draw: ExplorationDraw::Uniform,
            ..Self::mixed()
        }
    }

    /// Sets the name returned to identification queries.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Plans every `batch` accepted transitions instead of every one.
    pub fn with_planning_batch(mut self, batch: usize) -> Self {
        self.planning_batch = batch;
        self
    }

    /// Fixes the exploration RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_exploration(mut self, exploration: ExplorationSchedule) -> Self {
        self.exploration = exploration;
        self
    }

    /// Checks that every field is within its usable range.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(Error::Config(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(0.0..1.0).contains(&self.max_discount) {
            return Err(Error::Config(format!(
                "max_discount must be in [0, 1), got {}",
                self.max_discount
            )));
        }
        if self.planning_batch == 0 {
            return Err(Error::Config("planning_batch must be at least 1".into()));
        }
        if !self.default_reward_max.is_finite() {
            return Err(Error::Config("default_reward_max must be finite".into()));
        }
        match self.exploration {
            ExplorationSchedule::VisitDecay { exponent } if exponent.is_nan() || exponent <= 0.0 => {
                Err(Error::Config(format!(
                    "decay exponent must be positive, got {}",
                    exponent
                )))
            }
            ExplorationSchedule::Constant { epsilon } if !(0.0..=1.0).contains(&epsilon) => {
                Err(Error::Config(format!(
                    "epsilon must be in [0, 1], got {}",
                    epsilon
                )))
            }
            _ => Ok(()),
        }
    }
}
