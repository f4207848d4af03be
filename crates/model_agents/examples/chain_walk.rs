//! Chain Walk Example
//!
//! Trains the three agent presets on a short chain where only the far end
//! pays, then shows what each one learned.
//!
//! Run with: cargo run -p model_agents --example chain_walk

use model_agents::{
    Action, Agent, AgentConfig, Environment, Experiment, ModelAgent, Observation, Transition,
    FREEZE_LEARNING, NAME_QUERY,
};

const LENGTH: usize = 6;

/// Action 1 steps right, action 0 returns to the start.
struct Chain {
    state: usize,
}

impl Environment for Chain {
    fn init(&mut self) -> String {
        format!(
            "VERSION RL-Glue-3.0 PROBLEMTYPE episodic DISCOUNTFACTOR 0.9 \
             OBSERVATIONS INTS (0 {}) ACTIONS INTS (0 1) REWARDS (0 1)",
            LENGTH - 1
        )
    }

    fn start(&mut self) -> Observation {
        self.state = 0;
        Observation::discrete(0)
    }

    fn step(&mut self, action: &Action) -> Transition {
        self.state = if action.as_discrete() == Some(1) {
            self.state + 1
        } else {
            0
        };
        let terminal = self.state == LENGTH - 1;
        Transition {
            reward: if terminal { 1.0 } else { 0.0 },
            observation: Observation::discrete(self.state),
            terminal,
        }
    }
}

fn main() -> model_agents::Result<()> {
    println!("=== Chain Walk ===\n");

    for config in [
        AgentConfig::mixed(),
        AgentConfig::stochastic(),
        AgentConfig::fixed_exploration(),
    ] {
        let agent = ModelAgent::new(config.with_seed(42))?;
        let mut experiment = Experiment::new(agent, Chain { state: 0 });
        experiment.init()?;

        let name = experiment.agent_mut().message(NAME_QUERY);
        println!("{}", name);

        let summaries = experiment.run_episodes(50, 500)?;
        let early: usize = summaries[..10].iter().map(|s| s.steps).sum();
        let late: usize = summaries[40..].iter().map(|s| s.steps).sum();
        println!("  steps, first 10 episodes: {}", early);
        println!("  steps, last 10 episodes:  {}", late);

        experiment.agent_mut().message(FREEZE_LEARNING);
        let greedy = experiment.run_episode(100)?;
        println!(
            "  greedy episode: {} steps, reward {:.1}",
            greedy.steps, greedy.total_reward
        );

        let agent = experiment.agent();
        if let (Some(model), Some(planner)) = (agent.model(), agent.planner()) {
            println!("  P(deterministic): {:.4}", model.tracker().p_deterministic());
            println!("  policy: {:?}", planner.policy());
            let values: Vec<String> = planner.values().iter().map(|v| format!("{:.2}", v)).collect();
            println!("  values: [{}]", values.join(", "));
        }
        println!("  stats: {:?}\n", agent.stats());

        experiment.cleanup();
    }

    Ok(())
}
