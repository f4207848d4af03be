#![doc = include_str!("../README.md")]
//! # Model Agents
//!
//! Model-based reinforcement learning agents for small discrete MDPs.
//!
//! ## Overview
//!
//! Instead of learning action values from temporal-difference errors, a
//! [`ModelAgent`] estimates the MDP itself and re-derives its policy from
//! that estimate as evidence arrives:
//! - **Estimate** next-state counts and mean rewards for every state-action pair
//! - **Weigh** a deterministic explanation of the data against a stochastic one
//! - **Plan** with value iteration over the blended model
//! - **Explore** less as each state becomes familiar
//!
//! ## Architecture
//!
//! ```text
//!   task spec ──► DiscreteTask ──► MdpModel ─────────────┐
//!                                 ├ TransitionEstimator  │
//!                                 └ MixtureTracker       ▼
//!   observation ──► ModelAgent ──────────────► ValueIterationPlanner
//!                      │                             │ policy
//!                      ▼                             ▼
//!   action ◄──────── ActionSelector ◄────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use model_agents::{create_agent, Agent, Observation, NAME_QUERY};
//!
//! let spec = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
//!             OBSERVATIONS INTS (0 4) ACTIONS INTS (0 1) REWARDS (0 1)";
//!
//! let mut agent = create_agent();
//! agent.init(spec).unwrap();
//! assert_eq!(agent.message(NAME_QUERY), "MixedModelAgent");
//!
//! let action = agent.start(&Observation::discrete(0)).unwrap();
//! assert!(action.as_discrete().unwrap() < 2);
//! agent.end(1.0).unwrap();
//! agent.cleanup();
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod glue;
pub mod model;
pub mod persistence;
pub mod planner;
pub mod selector;
pub mod task;
pub mod types;

pub use agent::{AgentPhase, AgentStats, ModelAgent};
pub use config::{AgentConfig, ExplorationDraw, ExplorationSchedule, ModelHypothesis};
pub use error::{Error, Result};
pub use glue::{
    Agent, EpisodeSummary, Environment, Experiment, Transition, FREEZE_LEARNING, NAME_QUERY,
    NOT_HANDLED, UNFREEZE_LEARNING,
};
pub use model::{MdpModel, MixtureStatus, MixtureTracker, TransitionEstimator};
pub use persistence::{AgentPersistence, ModelSnapshot, PersistenceOptions};
pub use planner::{PlanReport, ValueIterationPlanner};
pub use selector::ActionSelector;
pub use task::DiscreteTask;
pub use types::*;

pub use rl_task_spec;

/// Crate version, recorded in snapshots.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates the mixed deterministic/stochastic model agent with default
/// settings.
///
/// # Examples
///
/// ```
/// use model_agents::{create_agent, AgentPhase};
///
/// let agent = create_agent();
/// assert_eq!(agent.name(), "MixedModelAgent");
/// assert_eq!(agent.phase(), AgentPhase::Uninitialized);
/// ```
pub fn create_agent() -> ModelAgent {
    ModelAgent::default()
}

/// Creates an agent that treats every task as stochastic from the start.
///
/// # Examples
///
/// ```
/// use model_agents::{create_stochastic_agent, ModelHypothesis};
///
/// let agent = create_stochastic_agent();
/// assert_eq!(agent.config().hypothesis, ModelHypothesis::StochasticOnly);
/// ```
///
/// # See Also
///
/// - [`AgentConfig::stochastic`] for manual configuration
/// - [`AgentConfig::fixed_exploration`] for a constant, uniform ε
pub fn create_stochastic_agent() -> ModelAgent {
    ModelAgent::with_valid_config(AgentConfig::stochastic())
}
