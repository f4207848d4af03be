//! The model-based agent and its lifecycle.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::glue::{Agent, FREEZE_LEARNING, NAME_QUERY, NOT_HANDLED, UNFREEZE_LEARNING};
use crate::model::MdpModel;
use crate::planner::{PlanReport, ValueIterationPlanner};
use crate::selector::ActionSelector;
use crate::task::DiscreteTask;
use crate::types::{Action, ActionIndex, Observation, StateIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the agent is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPhase {
    /// Constructed but no task yet.
    Uninitialized,
    /// Has a task and is between episodes.
    Ready,
    InEpisode,
    /// `cleanup` released the task; only `init` is accepted.
    ShutDown,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AgentPhase::Uninitialized => "uninitialized",
            AgentPhase::Ready => "ready",
            AgentPhase::InEpisode => "in an episode",
            AgentPhase::ShutDown => "shut down",
        };
        f.write_str(text)
    }
}

/// Running totals since the last `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentStats {
    /// Actions returned by `start` and `step`.
    pub steps: u64,
    /// Episodes closed by `end`.
    pub episodes: u64,
    pub planning_passes: u64,
    /// Value iteration sweeps across all planning passes.
    pub total_sweeps: u64,
}

/// The pair whose outcome the agent is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub(crate) state: StateIndex,
    pub(crate) action: ActionIndex,
}

/// Everything allocated by `init` and released by `cleanup`.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) task: DiscreteTask,
    pub(crate) model: MdpModel,
    pub(crate) planner: ValueIterationPlanner,
    pub(crate) cursor: Option<Cursor>,
    pub(crate) transitions_since_plan: usize,
}

impl Session {
    pub(crate) fn new(task: DiscreteTask, config: &AgentConfig) -> Self {
        Self {
            task,
            model: MdpModel::new(&task, config.hypothesis),
            planner: ValueIterationPlanner::new(task.num_states, task.discount, config.tolerance),
            cursor: None,
            transitions_since_plan: 0,
        }
    }
}

/// A model-based agent for discrete MDPs.
///
/// The agent learns transition counts and reward means for every state-action
/// pair, weighs a deterministic explanation of that data against a
/// stochastic one, and re-plans with value iteration every
/// `planning_batch` transitions. Actions come from the latest greedy policy
/// except when the exploration schedule fires.
///
/// # Examples
///
/// ```
/// use model_agents::{Agent, AgentConfig, ModelAgent, Observation};
///
/// let spec = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
///             OBSERVATIONS INTS (0 3) ACTIONS INTS (0 1) REWARDS (0 1)";
///
/// let mut agent = ModelAgent::new(AgentConfig::default().with_seed(1)).unwrap();
/// agent.init(spec).unwrap();
///
/// let first = agent.start(&Observation::discrete(0)).unwrap();
/// assert!(first.as_discrete().unwrap() < 2);
/// agent.step(0.0, &Observation::discrete(1)).unwrap();
/// agent.end(1.0).unwrap();
/// assert_eq!(agent.stats().episodes, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ModelAgent {
    pub(crate) config: AgentConfig,
    pub(crate) selector: ActionSelector,
    pub(crate) phase: AgentPhase,
    pub(crate) session: Option<Session>,
    pub(crate) stats: AgentStats,
}

impl ModelAgent {
    /// Creates an uninitialized agent after validating `config`.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    /// Builds an agent from a config already known to validate.
    pub(crate) fn with_valid_config(config: AgentConfig) -> Self {
        let selector = ActionSelector::new(config.exploration, config.draw, config.seed);
        Self {
            config,
            selector,
            phase: AgentPhase::Uninitialized,
            session: None,
            stats: AgentStats::default(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    pub fn is_frozen(&self) -> bool {
        self.selector.is_frozen()
    }

    /// The task shape from the last `init`, until `cleanup`.
    pub fn task(&self) -> Option<&DiscreteTask> {
        self.session.as_ref().map(|s| &s.task)
    }

    pub fn model(&self) -> Option<&MdpModel> {
        self.session.as_ref().map(|s| &s.model)
    }

    pub fn planner(&self) -> Option<&ValueIterationPlanner> {
        self.session.as_ref().map(|s| &s.planner)
    }

    /// The state the agent last acted in, while an episode is running.
    pub fn current_state(&self) -> Option<StateIndex> {
        self.session
            .as_ref()
            .and_then(|s| s.cursor)
            .map(|c| c.state)
    }

    /// The probability that the next action taken in `state` is exploratory.
    pub fn exploration_probability(&self, state: StateIndex) -> Option<f64> {
        let session = self.session.as_ref()?;
        if state >= session.task.num_states {
            return None;
        }
        Some(
            self.selector
                .epsilon(session.model.estimator().visits_sum(state)),
        )
    }

    /// Runs a planning pass now, regardless of the batch counter.
    pub fn plan(&mut self) -> Result<PlanReport> {
        self.expect_phase("plan", &[AgentPhase::Ready, AgentPhase::InEpisode])?;
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| lifecycle("plan", phase))?;
        Ok(run_planner(session, &mut self.stats))
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[AgentPhase]) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(lifecycle(operation, self.phase))
        }
    }

    /// Records a transition out of the cursor pair. `next_state` is `None`
    /// for the terminal transition. `phase` is only used to report a missing
    /// cursor.
    fn learn(
        session: &mut Session,
        config: &AgentConfig,
        phase: AgentPhase,
        next_state: Option<StateIndex>,
        reward: f64,
    ) -> Result<()> {
        let cursor = session
            .cursor
            .ok_or_else(|| lifecycle("learn", phase))?;

        if session
            .model
            .record(cursor.state, cursor.action, next_state, reward)
        {
            log::info!(
                "{}: deterministic model falsified at ({}, {}), planning with the stochastic model only",
                config.name,
                cursor.state,
                cursor.action
            );
        }
        Ok(())
    }
}

impl Default for ModelAgent {
    fn default() -> Self {
        Self::with_valid_config(AgentConfig::default())
    }
}

impl Agent for ModelAgent {
    fn init(&mut self, task_spec: &str) -> Result<()> {
        let task = DiscreteTask::parse(task_spec, &self.config)?;

        let frozen = self.selector.is_frozen();
        self.selector =
            ActionSelector::new(self.config.exploration, self.config.draw, self.config.seed);
        if frozen {
            self.selector.freeze();
        }

        self.session = Some(Session::new(task, &self.config));
        self.stats = AgentStats::default();
        self.phase = AgentPhase::Ready;

        log::info!(
            "{} initialized: {} states, {} actions, discount {}, {:?} model",
            self.config.name,
            task.num_states,
            task.num_actions,
            task.discount,
            self.config.hypothesis
        );
        Ok(())
    }

    fn start(&mut self, observation: &Observation) -> Result<Action> {
        self.expect_phase("start", &[AgentPhase::Ready, AgentPhase::InEpisode])?;
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| lifecycle("start", phase))?;

        let state = read_state(observation, session.task.num_states)?;
        let action = self
            .selector
            .select(state, session.model.estimator(), session.planner.policy());
        session.cursor = Some(Cursor { state, action });

        self.phase = AgentPhase::InEpisode;
        self.stats.steps += 1;
        Ok(Action::discrete(action))
    }

    fn step(&mut self, reward: f64, observation: &Observation) -> Result<Action> {
        self.expect_phase("step", &[AgentPhase::InEpisode])?;
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| lifecycle("step", phase))?;

        let next_state = read_state(observation, session.task.num_states)?;
        Self::learn(session, &self.config, phase, Some(next_state), reward)?;

        session.transitions_since_plan += 1;
        if session.transitions_since_plan >= self.config.planning_batch {
            run_planner(session, &mut self.stats);
        }

        let action = self.selector.select(
            next_state,
            session.model.estimator(),
            session.planner.policy(),
        );
        session.cursor = Some(Cursor {
            state: next_state,
            action,
        });

        self.stats.steps += 1;
        Ok(Action::discrete(action))
    }

    fn end(&mut self, reward: f64) -> Result<()> {
        self.expect_phase("end", &[AgentPhase::InEpisode])?;
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| lifecycle("end", phase))?;

        Self::learn(session, &self.config, phase, None, reward)?;
        session.cursor = None;

        self.phase = AgentPhase::Ready;
        self.stats.episodes += 1;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.session = None;
        self.phase = AgentPhase::ShutDown;
        log::info!(
            "{} cleaned up after {} steps in {} episodes",
            self.config.name,
            self.stats.steps,
            self.stats.episodes
        );
    }

    fn message(&mut self, message: &str) -> String {
        match message {
            FREEZE_LEARNING => self.selector.freeze(),
            UNFREEZE_LEARNING => self.selector.unfreeze(),
            NAME_QUERY => return self.config.name.clone(),
            other => log::warn!("{}: unhandled message {:?}", self.config.name, other),
        }
        NOT_HANDLED.to_string()
    }
}

fn lifecycle(operation: &'static str, phase: AgentPhase) -> Error {
    Error::Lifecycle {
        operation,
        phase: phase.to_string(),
    }
}

fn run_planner(session: &mut Session, stats: &mut AgentStats) -> PlanReport {
    let report = session.planner.plan(&session.model);
    session.transitions_since_plan = 0;
    stats.planning_passes += 1;
    stats.total_sweeps += report.sweeps as u64;
    log::debug!(
        "planning pass {}: {} sweeps, residual {:.3e}, pD {:.4}",
        stats.planning_passes,
        report.sweeps,
        report.residual,
        session.model.tracker().p_deterministic()
    );
    report
}

/// Reads the discrete state from `observation` and checks it against the
/// task's range.
fn read_state(observation: &Observation, num_states: usize) -> Result<StateIndex> {
    let raw = observation.first_int().ok_or(Error::MissingState)?;
    match usize::try_from(raw) {
        Ok(state) if state < num_states => Ok(state),
        _ => Err(Error::StateOutOfRange {
            state: raw,
            num_states,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MixtureStatus;

    const SPEC: &str = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
                        OBSERVATIONS INTS (0 2) ACTIONS INTS (0 1) REWARDS (0 1)";

    fn ready_agent() -> ModelAgent {
        let mut agent = ModelAgent::new(AgentConfig::default().with_seed(11)).unwrap();
        agent.init(SPEC).unwrap();
        agent
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AgentConfig::default().with_planning_batch(0);
        assert!(matches!(ModelAgent::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_init_allocates_tables() {
        let agent = ready_agent();
        assert_eq!(agent.phase(), AgentPhase::Ready);

        let task = agent.task().unwrap();
        assert_eq!(task.num_states, 3);
        assert_eq!(task.num_actions, 2);
        assert_eq!(agent.model().unwrap().num_states(), 3);
        assert_eq!(agent.planner().unwrap().num_states(), 3);
        assert_eq!(agent.model().unwrap().estimator().mean_reward(2, 1), 1.0);
    }

    #[test]
    fn test_init_rejects_continuous_task() {
        let mut agent = ModelAgent::default();
        let spec = "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
                    OBSERVATIONS DOUBLES (0 1) ACTIONS INTS (0 1) REWARDS (0 1)";
        assert!(matches!(
            agent.init(spec),
            Err(Error::UnsupportedTaskShape(_))
        ));
        assert_eq!(agent.phase(), AgentPhase::Uninitialized);
    }

    #[test]
    fn test_episode_updates_model() {
        let mut agent = ready_agent();
        let first = agent.start(&Observation::discrete(0)).unwrap();
        let a0 = first.as_discrete().unwrap();
        assert_eq!(agent.current_state(), Some(0));

        let second = agent.step(0.5, &Observation::discrete(1)).unwrap();
        let a1 = second.as_discrete().unwrap();
        assert!(a1 < 2);
        agent.end(1.0).unwrap();

        let model = agent.model().unwrap();
        assert_eq!(model.estimator().visits(0, a0), 1);
        assert_eq!(model.estimator().mean_reward(0, a0), 0.5);
        assert_eq!(model.estimator().visits(1, a1), 1);
        assert_eq!(model.estimator().mean_reward(1, a1), 1.0);

        let stats = agent.stats();
        assert_eq!(stats.steps, 2);
        assert_eq!(stats.episodes, 1);
        assert_eq!(stats.planning_passes, 1);
        assert_eq!(agent.phase(), AgentPhase::Ready);
        assert_eq!(agent.current_state(), None);
    }

    #[test]
    fn test_end_does_not_plan() {
        let mut agent = ready_agent();
        agent.start(&Observation::discrete(0)).unwrap();
        agent.end(0.0).unwrap();
        assert_eq!(agent.stats().planning_passes, 0);
    }

    #[test]
    fn test_planning_batch() {
        let config = AgentConfig::default().with_seed(3).with_planning_batch(3);
        let mut agent = ModelAgent::new(config).unwrap();
        agent.init(SPEC).unwrap();

        agent.start(&Observation::discrete(0)).unwrap();
        for i in 0..7 {
            agent.step(0.0, &Observation::discrete(i % 3)).unwrap();
        }
        assert_eq!(agent.stats().planning_passes, 2);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut agent = ModelAgent::default();
        assert!(matches!(
            agent.start(&Observation::discrete(0)),
            Err(Error::Lifecycle { operation: "start", .. })
        ));

        agent.init(SPEC).unwrap();
        assert!(matches!(
            agent.step(0.0, &Observation::discrete(0)),
            Err(Error::Lifecycle { operation: "step", .. })
        ));
        assert!(matches!(
            agent.end(0.0),
            Err(Error::Lifecycle { operation: "end", .. })
        ));

        agent.cleanup();
        assert_eq!(agent.phase(), AgentPhase::ShutDown);
        assert!(agent.task().is_none());
        assert!(agent.plan().is_err());
        assert!(agent.start(&Observation::discrete(0)).is_err());

        agent.init(SPEC).unwrap();
        assert!(agent.start(&Observation::discrete(0)).is_ok());
    }

    #[test]
    fn test_missing_cursor_reports_current_phase() {
        let mut agent = ready_agent();
        agent.start(&Observation::discrete(0)).unwrap();
        agent.session.as_mut().unwrap().cursor = None;

        let err = agent.step(0.0, &Observation::discrete(1)).unwrap_err();
        assert_eq!(
            err,
            Error::Lifecycle {
                operation: "learn",
                phase: "in an episode".to_string(),
            }
        );
    }

    #[test]
    fn test_restart_abandons_episode() {
        let mut agent = ready_agent();
        agent.start(&Observation::discrete(0)).unwrap();
        agent.step(0.0, &Observation::discrete(1)).unwrap();
        agent.start(&Observation::discrete(2)).unwrap();
        assert_eq!(agent.current_state(), Some(2));
        assert_eq!(agent.stats().episodes, 0);
    }

    #[test]
    fn test_bad_observations() {
        let mut agent = ready_agent();
        assert!(matches!(
            agent.start(&Observation::discrete(3)),
            Err(Error::StateOutOfRange {
                state: 3,
                num_states: 3
            })
        ));
        assert!(matches!(
            agent.start(&Observation::default()),
            Err(Error::MissingState)
        ));
        let negative = Observation {
            ints: vec![-2],
            ..Default::default()
        };
        assert!(matches!(
            agent.start(&negative),
            Err(Error::StateOutOfRange { state: -2, .. })
        ));
        assert_eq!(agent.phase(), AgentPhase::Ready);
    }

    #[test]
    fn test_messages() {
        let mut agent = ModelAgent::default();
        assert_eq!(agent.message(NAME_QUERY), "MixedModelAgent");

        assert_eq!(agent.message(FREEZE_LEARNING), NOT_HANDLED);
        assert!(agent.is_frozen());
        assert_eq!(agent.message(UNFREEZE_LEARNING), NOT_HANDLED);
        assert!(!agent.is_frozen());

        assert_eq!(agent.message("open the pod bay doors"), NOT_HANDLED);
    }

    #[test]
    fn test_freeze_survives_init_and_zeroes_exploration() {
        let mut agent = ModelAgent::default();
        agent.message(FREEZE_LEARNING);
        agent.init(SPEC).unwrap();
        assert!(agent.is_frozen());
        assert_eq!(agent.exploration_probability(0), Some(0.0));
        assert_eq!(agent.exploration_probability(3), None);
    }

    #[test]
    fn test_contradicting_reward_falsifies_through_agent() {
        let mut agent = ready_agent();
        // Frozen and never planned, so every episode takes action 0 in state 0.
        agent.message(FREEZE_LEARNING);
        for reward in [0.0, 0.0] {
            let action = agent.start(&Observation::discrete(0)).unwrap();
            assert_eq!(action.as_discrete(), Some(0));
            agent.end(reward).unwrap();
        }
        let tracker = agent.model().unwrap().tracker();
        assert_eq!(tracker.status(), MixtureStatus::Consistent);
        assert!(tracker.p_deterministic() > 0.5);

        agent.start(&Observation::discrete(0)).unwrap();
        agent.end(1.0).unwrap();
        let tracker = agent.model().unwrap().tracker();
        assert_eq!(tracker.status(), MixtureStatus::FalsifiedStochastic);
        assert_eq!(tracker.p_deterministic(), 0.0);
        assert_eq!(agent.model().unwrap().estimator().visits(0, 0), 3);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AgentPhase::Ready.to_string(), "ready");
        assert_eq!(AgentPhase::InEpisode.to_string(), "in an episode");
        assert_eq!(AgentPhase::ShutDown.to_string(), "shut down");
    }
}
