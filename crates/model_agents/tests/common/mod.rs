//! Small chain environments shared by the integration tests.
//!
//! States `0..length` are laid out in a line. Action 1 moves right, action 0
//! sends the agent back to state 0. Reaching the last state pays 1 and ends
//! the episode; every other transition pays 0.

#![allow(dead_code)]

use model_agents::{Action, Environment, Observation, Transition};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn chain_spec(length: usize) -> String {
    format!(
        "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
         OBSERVATIONS INTS (0 {}) ACTIONS INTS (0 1) REWARDS (0 1.0)",
        length - 1
    )
}

/// A deterministic chain.
pub struct ChainEnvironment {
    length: usize,
    state: usize,
}

impl ChainEnvironment {
    pub fn new(length: usize) -> Self {
        Self { length, state: 0 }
    }

    pub fn state(&self) -> usize {
        self.state
    }
}

impl Environment for ChainEnvironment {
    fn init(&mut self) -> String {
        chain_spec(self.length)
    }

    fn start(&mut self) -> Observation {
        self.state = 0;
        Observation::discrete(0)
    }

    fn step(&mut self, action: &Action) -> Transition {
        self.state = match action.as_discrete() {
            Some(1) => self.state + 1,
            _ => 0,
        };
        chain_transition(self.state, self.length)
    }
}

/// A chain where the chosen move is swapped with probability `slip`.
pub struct SlipperyChainEnvironment {
    length: usize,
    state: usize,
    slip: f64,
    rng: StdRng,
}

impl SlipperyChainEnvironment {
    pub fn new(length: usize, slip: f64, seed: u64) -> Self {
        Self {
            length,
            state: 0,
            slip,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Environment for SlipperyChainEnvironment {
    fn init(&mut self) -> String {
        chain_spec(self.length)
    }

    fn start(&mut self) -> Observation {
        self.state = 0;
        Observation::discrete(0)
    }

    fn step(&mut self, action: &Action) -> Transition {
        let mut forward = action.as_discrete() == Some(1);
        if self.rng.random::<f64>() < self.slip {
            forward = !forward;
        }
        self.state = if forward { self.state + 1 } else { 0 };
        chain_transition(self.state, self.length)
    }
}

fn chain_transition(state: usize, length: usize) -> Transition {
    let terminal = state == length - 1;
    Transition {
        reward: if terminal { 1.0 } else { 0.0 },
        observation: Observation::discrete(state),
        terminal,
    }
}
