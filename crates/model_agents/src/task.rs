//! The discrete task shape an agent is built for.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use rl_task_spec::{IntRange, SpaceSpec, TaskSpec};
use serde::{Deserialize, Serialize};

/// Sizes and constants extracted from a task spec, fixed for the lifetime of
/// an initialized agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscreteTask {
    pub num_states: usize,
    pub num_actions: usize,
    /// Discount factor after the configured cap is applied.
    pub discount: f64,
    /// Optimistic seed for every reward estimate.
    pub reward_max: f64,
}

impl DiscreteTask {
    /// Checks that `spec` describes a single bounded discrete observation and
    /// a single bounded discrete action, and derives the table sizes.
    pub fn from_spec(spec: &TaskSpec, config: &AgentConfig) -> Result<Self> {
        let num_states = single_discrete_dim(spec.observations(), "observation")?;
        let num_actions = single_discrete_dim(spec.actions(), "action")?;

        let reward_max = spec
            .reward_range()
            .max
            .value()
            .unwrap_or(config.default_reward_max);

        Ok(Self {
            num_states,
            num_actions,
            discount: spec.discount_factor().min(config.max_discount),
            reward_max,
        })
    }

    /// Parses `task_spec` and derives the task shape in one go.
    pub fn parse(task_spec: &str, config: &AgentConfig) -> Result<Self> {
        let spec = TaskSpec::parse(task_spec)?;
        Self::from_spec(&spec, config)
    }
}

fn single_discrete_dim(space: &SpaceSpec, kind: &str) -> Result<usize> {
    if space.continuous_dims() > 0 {
        return Err(Error::UnsupportedTaskShape(format!(
            "{} continuous {} dimension(s)",
            space.continuous_dims(),
            kind
        )));
    }
    if space.discrete_dims() != 1 {
        return Err(Error::UnsupportedTaskShape(format!(
            "expected exactly one discrete {} dimension, found {}",
            kind,
            space.discrete_dims()
        )));
    }

    let range: &IntRange = &space.ints[0];
    let (min, max) = match (range.min.value(), range.max.value()) {
        (Some(min), Some(max)) => (min, max),
        _ => {
            return Err(Error::UnsupportedTaskShape(format!(
                "{} range {} is open-ended",
                kind, range
            )))
        }
    };
    if min < 0 || max < min {
        return Err(Error::UnsupportedTaskShape(format!(
            "{} range {} does not fit a table index",
            kind, range
        )));
    }

    usize::try_from(max)
        .ok()
        .and_then(|m| m.checked_add(1))
        .ok_or_else(|| {
            Error::UnsupportedTaskShape(format!("{} range {} is too large", kind, range))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(obs: &str, act: &str, rewards: &str, discount: &str) -> String {
        format!(
            "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR {} \
             OBSERVATIONS {} ACTIONS {} REWARDS {}",
            discount, obs, act, rewards
        )
    }

    #[test]
    fn test_discrete_task_shape() {
        let text = spec("INTS (0 19)", "INTS (0 3)", "(-1 1)", "0.9");
        let task = DiscreteTask::parse(&text, &AgentConfig::default()).unwrap();
        assert_eq!(task.num_states, 20);
        assert_eq!(task.num_actions, 4);
        assert_eq!(task.discount, 0.9);
        assert_eq!(task.reward_max, 1.0);
    }

    #[test]
    fn test_discount_is_capped() {
        let text = spec("INTS (0 1)", "INTS (0 1)", "(0 1)", "1.0");
        let task = DiscreteTask::parse(&text, &AgentConfig::default()).unwrap();
        assert_eq!(task.discount, 0.95);
    }

    #[test]
    fn test_unspecified_reward_uses_default() {
        let text = spec("INTS (0 1)", "INTS (0 1)", "(UNSPEC UNSPEC)", "0.5");
        let task = DiscreteTask::parse(&text, &AgentConfig::default()).unwrap();
        assert_eq!(task.reward_max, 10.0);
    }

    #[test]
    fn test_rejects_continuous_dimensions() {
        let text = spec("INTS (0 3) DOUBLES (0 1)", "INTS (0 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));

        let text = spec("INTS (0 3)", "DOUBLES (-1 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));
    }

    #[test]
    fn test_rejects_multiple_discrete_dimensions() {
        let text = spec("INTS (2 0 3)", "INTS (0 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));
    }

    #[test]
    fn test_rejects_open_ended_range() {
        let text = spec("INTS (0 POSINF)", "INTS (0 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));

        let text = spec("INTS (0 3)", "INTS (UNSPEC 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));
    }

    #[test]
    fn test_rejects_negative_minimum() {
        let text = spec("INTS (-1 3)", "INTS (0 1)", "(0 1)", "0.9");
        assert!(matches!(
            DiscreteTask::parse(&text, &AgentConfig::default()),
            Err(Error::UnsupportedTaskShape(_))
        ));
    }

    #[test]
    fn test_malformed_spec_is_task_spec_error() {
        assert!(matches!(
            DiscreteTask::parse("VERSION", &AgentConfig::default()),
            Err(Error::TaskSpec(_))
        ));
    }
}
