//! The two-way agent/environment protocol and an in-process driver.
//!
//! An [`Agent`] is initialized once per task with the task spec string,
//! then driven through episodes of `start`, any number of `step`s and an
//! optional `end`. The [`Experiment`] runner plays the harness role for
//! tests, benchmarks and demos, wiring an agent to an [`Environment`]
//! without any transport in between.

use crate::error::Result;
use crate::types::{Action, Observation};

/// Message that disables exploration without pausing model updates.
pub const FREEZE_LEARNING: &str = "freeze learning";
/// Message that re-enables exploration.
pub const UNFREEZE_LEARNING: &str = "unfreeze learning";
/// Message asking the agent for its name.
pub const NAME_QUERY: &str = "what is your name?";
/// Reply to any message the receiver does not recognize.
pub const NOT_HANDLED: &str = "Agent does not handle any messages.";

/// The agent side of the protocol.
pub trait Agent {
    /// Prepares the agent for the task described by `task_spec`.
    fn init(&mut self, task_spec: &str) -> Result<()>;

    /// Begins an episode and returns the first action.
    fn start(&mut self, observation: &Observation) -> Result<Action>;

    /// Takes the reward for the previous action and the resulting
    /// observation, and returns the next action.
    fn step(&mut self, reward: f64, observation: &Observation) -> Result<Action>;

    /// Takes the reward of the terminal transition.
    fn end(&mut self, reward: f64) -> Result<()>;

    /// Releases everything allocated by `init`.
    fn cleanup(&mut self);

    /// Side channel for out-of-band commands. Always answers.
    fn message(&mut self, message: &str) -> String;
}

/// What the environment reports in response to an action.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub reward: f64,
    pub observation: Observation,
    /// `true` if `observation` is terminal and the episode is over.
    pub terminal: bool,
}

/// The environment side of the protocol.
pub trait Environment {
    /// Returns the task spec string handed to the agent.
    fn init(&mut self) -> String;

    /// Resets to an initial state and returns its observation.
    fn start(&mut self) -> Observation;

    /// Applies `action`.
    fn step(&mut self, action: &Action) -> Transition;

    fn cleanup(&mut self) {}

    fn message(&mut self, _message: &str) -> String {
        NOT_HANDLED.to_string()
    }
}

/// Totals for one episode run by [`Experiment::run_episode`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeSummary {
    /// Actions sent to the environment.
    pub steps: usize,
    pub total_reward: f64,
    /// `false` if the episode was cut off by the step cap.
    pub terminated: bool,
}

/// Drives an agent against an environment in-process.
#[derive(Debug)]
pub struct Experiment<A, E> {
    agent: A,
    environment: E,
    episodes: usize,
}

impl<A: Agent, E: Environment> Experiment<A, E> {
    pub fn new(agent: A, environment: E) -> Self {
        Self {
            agent,
            environment,
            episodes: 0,
        }
    }

    /// Passes the environment's task spec to the agent.
    pub fn init(&mut self) -> Result<()> {
        let task_spec = self.environment.init();
        self.agent.init(&task_spec)
    }

    /// Runs one episode. A `max_steps` of 0 means no cap; a capped
    /// episode is abandoned without calling [`Agent::end`].
    pub fn run_episode(&mut self, max_steps: usize) -> Result<EpisodeSummary> {
        let observation = self.environment.start();
        let mut action = self.agent.start(&observation)?;
        let mut summary = EpisodeSummary::default();

        loop {
            let transition = self.environment.step(&action);
            summary.steps += 1;
            summary.total_reward += transition.reward;

            if transition.terminal {
                self.agent.end(transition.reward)?;
                summary.terminated = true;
                break;
            }
            if max_steps > 0 && summary.steps >= max_steps {
                break;
            }
            action = self.agent.step(transition.reward, &transition.observation)?;
        }

        self.episodes += 1;
        Ok(summary)
    }

    /// Runs `count` episodes and returns their summaries in order.
    pub fn run_episodes(&mut self, count: usize, max_steps: usize) -> Result<Vec<EpisodeSummary>> {
        (0..count).map(|_| self.run_episode(max_steps)).collect()
    }

    pub fn cleanup(&mut self) {
        self.agent.cleanup();
        self.environment.cleanup();
    }

    /// Episodes run so far.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Returns the agent and environment.
    pub fn into_parts(self) -> (A, E) {
        (self.agent, self.environment)
    }
}
