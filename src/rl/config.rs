//! Double-DQN hyperparameter configuration

use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;
use super::network::ValueNetworkConfig;
use crate::game::Direction;

/// Configuration for the Double-DQN trainer and its replay memory
///
/// # Example
///
/// ```rust
/// use worm_dqn::rl::DqnConfig;
///
/// let config = DqnConfig {
///     learning_rate: 5e-4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Learning rate for the Adam optimizer
    ///
    /// Default: 1e-3
    pub learning_rate: f64,

    /// Discount factor for bootstrapped targets
    ///
    /// Default: 0.99
    pub gamma: f32,

    /// Exploration rate before any learning step
    ///
    /// Default: 1.0
    pub epsilon_start: f64,

    /// Exploration floor
    ///
    /// Default: 0.01
    pub epsilon_min: f64,

    /// Multiplicative decay applied after every successful learning step
    ///
    /// Default: 0.995
    pub epsilon_decay: f64,

    /// Transitions per learning step
    ///
    /// Learning is skipped until the replay memory holds this many.
    ///
    /// Default: 64
    pub batch_size: usize,

    /// Replay memory capacity, oldest transitions are evicted first
    ///
    /// Default: 10000
    pub replay_capacity: usize,

    /// Learning steps between hard target-network copies
    ///
    /// Default: 5
    pub target_sync_interval: usize,

    /// Every gradient component is clamped to `[-grad_clip, grad_clip]`
    ///
    /// Default: 1.0
    pub grad_clip: f32,

    /// Added to `|td_error|` when writing priorities back
    ///
    /// Default: 1e-6
    pub priority_epsilon: f32,

    /// Value network layer widths
    pub network: ValueNetworkConfig,
}

impl DqnConfig {
    /// Create a new configuration with default hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Exploration rate after `learn_steps` successful learning steps
    ///
    /// `max(epsilon_min, epsilon_start * epsilon_decay^learn_steps)`
    ///
    /// # Example
    ///
    /// ```rust
    /// use worm_dqn::rl::DqnConfig;
    ///
    /// let config = DqnConfig::default();
    /// assert_eq!(config.epsilon_after(0), 1.0);
    /// assert_eq!(config.epsilon_after(100_000), 0.01);
    /// ```
    pub fn epsilon_after(&self, learn_steps: usize) -> f64 {
        let steps = i32::try_from(learn_steps).unwrap_or(i32::MAX);
        (self.epsilon_start * self.epsilon_decay.powi(steps)).max(self.epsilon_min)
    }

    /// Validate configuration parameters
    ///
    /// # Returns
    ///
    /// `Ok(())` if all parameters are valid, `Err(String)` with an error message otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate > 0.0) {
            return Err(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }

        if !(0.0..=1.0).contains(&self.epsilon_start) {
            return Err(format!(
                "epsilon_start must be in [0, 1], got {}",
                self.epsilon_start
            ));
        }

        if !(0.0..=1.0).contains(&self.epsilon_min) || self.epsilon_min > self.epsilon_start {
            return Err(format!(
                "epsilon_min must be in [0, epsilon_start], got {}",
                self.epsilon_min
            ));
        }

        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(format!(
                "epsilon_decay must be in (0, 1], got {}",
                self.epsilon_decay
            ));
        }

        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }

        if self.replay_capacity == 0 {
            return Err("replay_capacity must be at least 1".to_string());
        }

        if self.batch_size > self.replay_capacity {
            return Err(format!(
                "batch_size ({}) cannot exceed replay_capacity ({})",
                self.batch_size, self.replay_capacity
            ));
        }

        if self.target_sync_interval == 0 {
            return Err("target_sync_interval must be at least 1".to_string());
        }

        if !(self.grad_clip > 0.0) {
            return Err(format!("grad_clip must be positive, got {}", self.grad_clip));
        }

        if !(self.priority_epsilon > 0.0) {
            return Err(format!(
                "priority_epsilon must be positive, got {}",
                self.priority_epsilon
            ));
        }

        let network = &self.network;
        if network.input_size != FEATURE_COUNT {
            return Err(format!(
                "network.input_size must equal the feature count ({FEATURE_COUNT}), got {}",
                network.input_size
            ));
        }

        if network.num_actions != Direction::COUNT {
            return Err(format!(
                "network.num_actions must equal the action count ({}), got {}",
                Direction::COUNT,
                network.num_actions
            ));
        }

        if network.feature_width == 0 || network.recurrent_width == 0 || network.head_width == 0 {
            return Err("network layer widths must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            batch_size: 64,
            replay_capacity: 10_000,
            target_sync_interval: 5,
            grad_clip: 1.0,
            priority_epsilon: 1e-6,
            network: ValueNetworkConfig::default(),
        }
    }
}
