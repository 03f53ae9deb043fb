use serde::Serialize;

use crate::game::{Direction, StepResult};
use crate::rl::{Decision, LearnReport};

/// Read-only view of the agent for observers
///
/// Updated by the agent as it acts and learns; renderers and loggers only
/// ever get a shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentTelemetry {
    /// Exploration rate in effect for the next decision
    pub epsilon: f64,

    /// Justification attached to the last decision
    pub last_reasoning: String,

    /// Value vector behind the last decision, if the network was consulted
    pub last_q_values: Option<[f32; Direction::COUNT]>,

    /// Completed episodes
    pub episodes: usize,

    /// Food eaten across all episodes
    pub food_eaten: usize,

    pub deaths: usize,

    /// Successful learning steps
    pub learn_steps: usize,

    /// Learning steps rejected for non-finite numbers
    pub failed_learn_steps: usize,

    pub last_loss: Option<f32>,
}

impl AgentTelemetry {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            last_reasoning: "Reasoning: Initializing...".to_string(),
            last_q_values: None,
            episodes: 0,
            food_eaten: 0,
            deaths: 0,
            learn_steps: 0,
            failed_learn_steps: 0,
            last_loss: None,
        }
    }

    pub(crate) fn record_decision(&mut self, decision: &Decision) {
        self.last_reasoning.clone_from(&decision.reasoning);
        self.last_q_values = decision.q_values;
    }

    pub(crate) fn record_step(&mut self, result: &StepResult) {
        if result.info.ate_food {
            self.food_eaten += 1;
        }
        if result.info.collision_type.is_some() {
            self.deaths += 1;
        }
    }

    pub(crate) fn record_learn(&mut self, report: &LearnReport, epsilon: f64) {
        self.learn_steps = report.step;
        self.last_loss = Some(report.loss);
        self.epsilon = epsilon;
    }
}
