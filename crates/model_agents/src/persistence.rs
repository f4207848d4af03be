//! Saving and restoring what an agent has learned.
//!
//! A [`ModelSnapshot`] captures the configuration, the task shape, the
//! estimated model and the latest value function and policy. Snapshots are
//! stored as JSON and can be taken between or during episodes; a restored
//! agent always starts out between episodes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use model_agents::{AgentPersistence, ModelAgent};
//! use std::path::Path;
//!
//! // ... train the agent ...
//! agent.save_to_file(Path::new("agent.json"))?;
//!
//! // Later, pick up where it left off.
//! let agent = ModelAgent::load_from_file(Path::new("agent.json"))?;
//! ```

use crate::agent::{AgentPhase, AgentStats, ModelAgent, Session};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::model::MdpModel;
use crate::planner::ValueIterationPlanner;
use crate::selector::ActionSelector;
use crate::task::DiscreteTask;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serialized form of a [`ModelAgent`] with a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Crate version that wrote the snapshot.
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub config: AgentConfig,
    pub task: DiscreteTask,
    pub model: MdpModel,
    pub planner: ValueIterationPlanner,
    pub frozen: bool,
    pub stats: AgentStats,
}

/// Options for configuring persistence operations.
#[derive(Debug, Clone)]
pub struct PersistenceOptions {
    /// If `true`, pretty-prints the JSON output.
    pub pretty: bool,
}

impl Default for PersistenceOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl PersistenceOptions {
    /// Single-line JSON.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

/// Saving and loading an agent's learned state.
pub trait AgentPersistence: Sized {
    /// Saves the agent's state to a file using default options.
    fn save_to_file(&self, path: &Path) -> Result<()> {
        self.save_to_file_with_options(path, &PersistenceOptions::default())
    }

    /// Saves the agent's state to a file with custom `PersistenceOptions`.
    fn save_to_file_with_options(&self, path: &Path, options: &PersistenceOptions) -> Result<()>;

    /// Loads an agent's state from a file.
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Serializes the agent's state using default options.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with_options(&PersistenceOptions::default())
    }

    /// Serializes the agent's state with custom `PersistenceOptions`.
    fn to_bytes_with_options(&self, options: &PersistenceOptions) -> Result<Vec<u8>>;

    /// Restores an agent from bytes produced by [`to_bytes`](Self::to_bytes).
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl ModelAgent {
    /// Captures the agent's learned state. Fails if the agent has no task.
    pub fn snapshot(&self) -> Result<ModelSnapshot> {
        let session = self.session.as_ref().ok_or_else(|| Error::Lifecycle {
            operation: "snapshot",
            phase: self.phase.to_string(),
        })?;

        Ok(ModelSnapshot {
            version: crate::VERSION.to_string(),
            saved_at: Utc::now(),
            config: self.config.clone(),
            task: session.task,
            model: session.model.clone(),
            planner: session.planner.clone(),
            frozen: self.selector.is_frozen(),
            stats: self.stats,
        })
    }

    /// Rebuilds an agent from a snapshot. The agent is between episodes and
    /// continues learning from the restored model.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        let ModelSnapshot {
            config,
            task,
            model,
            planner,
            frozen,
            stats,
            ..
        } = snapshot;

        config.validate()?;
        if model.num_states() != task.num_states || model.num_actions() != task.num_actions {
            return Err(Error::Persistence(format!(
                "snapshot tables do not match a {}x{} task",
                task.num_states, task.num_actions
            )));
        }
        if !(0.0..=1.0).contains(&task.discount) || !task.reward_max.is_finite() {
            return Err(Error::Persistence(format!(
                "snapshot task has discount {} and reward seed {}",
                task.discount, task.reward_max
            )));
        }
        model.validate()?;
        planner.validate(task.num_states, task.num_actions)?;

        let mut selector = ActionSelector::new(config.exploration, config.draw, config.seed);
        if frozen {
            selector.freeze();
        }

        let mut session = Session::new(task, &config);
        session.model = model;
        session.planner = planner;

        Ok(Self {
            config,
            selector,
            phase: AgentPhase::Ready,
            session: Some(session),
            stats,
        })
    }
}

impl AgentPersistence for ModelAgent {
    fn save_to_file_with_options(&self, path: &Path, options: &PersistenceOptions) -> Result<()> {
        let bytes = self.to_bytes_with_options(options)?;
        fs::write(path, bytes)?;

        log::info!("Saved {} to {:?}", self.config.name, path);
        Ok(())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let agent = Self::from_bytes(&bytes)?;

        log::info!("Loaded {} from {:?}", agent.config.name, path);
        Ok(agent)
    }

    fn to_bytes_with_options(&self, options: &PersistenceOptions) -> Result<Vec<u8>> {
        let snapshot = self.snapshot()?;
        let bytes = if options.pretty {
            serde_json::to_vec_pretty(&snapshot)?
        } else {
            serde_json::to_vec(&snapshot)?
        };
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: ModelSnapshot = serde_json::from_slice(bytes)?;
        Self::from_snapshot(snapshot)
    }
}
