//! Exploration-aware action selection.

use crate::config::{ExplorationDraw, ExplorationSchedule};
use crate::model::TransitionEstimator;
use crate::types::{ActionIndex, StateIndex};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses between the planner's greedy action and an exploratory one.
///
/// Freezing only stops exploration. The model keeps learning and the
/// greedy action is read straight from the latest policy.
#[derive(Debug, Clone)]
pub struct ActionSelector {
    schedule: ExplorationSchedule,
    draw: ExplorationDraw,
    frozen: bool,
    rng: StdRng,
}

impl ActionSelector {
    /// Creates a selector. With `seed == None` the RNG is seeded from the
    /// thread-local generator.
    pub fn new(schedule: ExplorationSchedule, draw: ExplorationDraw, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            schedule,
            draw,
            frozen: false,
            rng,
        }
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Exploration probability for a state visited `visits_sum` times.
    ///
    /// Under the decay schedule an unvisited state yields `+inf`, i.e. the
    /// first action there is always exploratory.
    pub fn epsilon(&self, visits_sum: u64) -> f64 {
        if self.frozen {
            return 0.0;
        }
        match self.schedule {
            ExplorationSchedule::VisitDecay { exponent } => (visits_sum as f64).powf(-exponent),
            ExplorationSchedule::Constant { epsilon } => epsilon,
        }
    }

    /// Picks the action to take in `state`.
    pub fn select(
        &mut self,
        state: StateIndex,
        estimator: &TransitionEstimator,
        policy: &[ActionIndex],
    ) -> ActionIndex {
        let epsilon = self.epsilon(estimator.visits_sum(state));
        if self.rng.random::<f64>() < epsilon {
            self.explore(estimator.action_visits(state))
        } else {
            policy[state]
        }
    }

    /// Draws an exploratory action given the visit counts of each action.
    fn explore(&mut self, action_visits: &[u64]) -> ActionIndex {
        match self.draw {
            ExplorationDraw::Uniform => self.rng.random_range(0..action_visits.len()),
            ExplorationDraw::RarityWeighted => {
                let weights = action_visits.iter().map(|&n| 1.0 / (n as f64 + 1.0));
                match WeightedIndex::new(weights) {
                    Ok(dist) => dist.sample(&mut self.rng),
                    Err(_) => self.rng.random_range(0..action_visits.len()),
                }
            }
        }
    }
}
