//! Epsilon-greedy action selection with reversal filtering
//!
//! The greedy path runs the value network one step forward with the carried
//! [`RecurrentMemory`] and hands the advanced memory back. The exploring path
//! never touches the network, so the memory comes back exactly as it went in.
//!
//! Whatever the source of the action, a move that would send the worm straight
//! back into its own neck is swapped for one of the three other directions.

use burn::tensor::backend::Backend;
use rand::{Rng, RngCore};

use super::features::{Features, features_to_tensor};
use super::network::{RecurrentMemory, ValueNetwork};
use crate::game::Direction;

/// Justification used when the learning capability is off
pub const LEARNING_DISABLED_REASONING: &str = "Reasoning: Random movement (learning disabled)";

/// Outcome of one action selection
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Action to take, never the reversal of the facing direction
    pub action: Direction,

    /// Human-readable justification
    pub reasoning: String,

    /// Raw per-action values, present only when the network was consulted
    pub q_values: Option<[f32; Direction::COUNT]>,

    /// Chosen by the exploration branch (or with learning disabled)
    pub explored: bool,

    /// The reversal filter replaced the original choice
    pub reversal_prevented: bool,
}

/// Epsilon-greedy selection
///
/// # Arguments
///
/// * `network` - Value network on an inference backend
/// * `features` - Current featurized state
/// * `facing` - Direction the worm is currently moving in
/// * `epsilon` - Exploration probability in `[0, 1]`
/// * `memory` - Carried recurrent memory, `None` at the start of an episode
/// * `rng` - Source of randomness for exploration and the reversal filter
/// * `device` - Device the network lives on
///
/// # Returns
///
/// The decision and the memory to carry into the next selection
pub fn select_action<B: Backend>(
    network: &ValueNetwork<B>,
    features: &Features,
    facing: Direction,
    epsilon: f64,
    memory: Option<RecurrentMemory<B>>,
    rng: &mut dyn RngCore,
    device: &B::Device,
) -> (Decision, Option<RecurrentMemory<B>>) {
    if rng.gen_bool(epsilon.clamp(0.0, 1.0)) {
        let action = uniform_direction(rng);
        let decision = filtered(
            action,
            facing,
            "Reasoning: Exploring (no Q-values available)".to_string(),
            None,
            true,
            rng,
        );
        return (decision, memory);
    }

    let input = features_to_tensor::<B>(std::iter::once(features), device);
    let (q_values, memory) = network.forward_step(input, memory);
    let q_values = to_action_values(q_values.into_data().to_vec::<f32>().unwrap_or_default());

    let action = Direction::from_index(argmax(&q_values)).unwrap_or(facing);
    let reasoning = format!(
        "Reasoning: Action {} (Q-values: {})",
        action.name(),
        format_values(&q_values)
    );

    let decision = filtered(action, facing, reasoning, Some(q_values), false, rng);
    (decision, Some(memory))
}

/// Uniform random selection used when learning is disabled
pub fn random_action(facing: Direction, rng: &mut dyn RngCore) -> Decision {
    let action = uniform_direction(rng);
    filtered(
        action,
        facing,
        LEARNING_DISABLED_REASONING.to_string(),
        None,
        true,
        rng,
    )
}

fn uniform_direction(rng: &mut dyn RngCore) -> Direction {
    Direction::ALL[rng.gen_range(0..Direction::COUNT)]
}

/// Apply the reversal filter and assemble the decision
fn filtered(
    action: Direction,
    facing: Direction,
    mut reasoning: String,
    q_values: Option<[f32; Direction::COUNT]>,
    explored: bool,
    rng: &mut dyn RngCore,
) -> Decision {
    let reversal_prevented = action.is_opposite(facing);
    let action = if reversal_prevented {
        let safe: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|d| !d.is_opposite(facing))
            .collect();
        reasoning.push_str(" (prevented 180° turn)");
        safe[rng.gen_range(0..safe.len())]
    } else {
        action
    };

    Decision {
        action,
        reasoning,
        q_values,
        explored,
        reversal_prevented,
    }
}

fn to_action_values(values: Vec<f32>) -> [f32; Direction::COUNT] {
    let mut out = [0.0; Direction::COUNT];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value;
    }
    out
}

/// First index of the maximum value, NaN never wins
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] || values[best].is_nan() {
            best = index;
        }
    }
    best
}

fn format_values(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.2}")).collect();
    format!("[{}]", parts.join(", "))
}
