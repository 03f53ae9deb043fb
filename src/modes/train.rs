//! Headless training mode
//!
//! Runs the tick loop: featurize, act, step the environment, store the
//! transition, learn. Commentary is requested every fifth meal of an episode
//! and on every death.
//!
//! # Example
//!
//! ```rust,no_run
//! use worm_dqn::capabilities::Capabilities;
//! use worm_dqn::modes::{TrainConfig, TrainMode};
//! use worm_dqn::rl::{TrainingBackend, default_device};
//!
//! let config = TrainConfig::new(500);
//! let mut train_mode =
//!     TrainMode::<TrainingBackend>::new(config, &Capabilities::default(), default_device())?;
//! train_mode.run()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result, anyhow};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::capabilities::{CapabilityRequest, Capabilities, CommentaryMode};
use crate::commentary::{
    CannedCommentary, Commentator, CommentaryConfig, CommentaryRequest, HttpCommentary,
};
use crate::game::GameConfig;
use crate::metrics::{AgentTelemetry, TrainingStats};
use crate::rl::{DqnConfig, Environment, SnakeEnvironment, Transition, WormAgent};

/// Meals between commentary requests within an episode
const MEALS_PER_COMMENT: u32 = 5;

/// Configuration for training mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of episodes to train
    pub num_episodes: usize,

    /// Episodes are cut off after this many steps
    pub max_steps_per_episode: usize,

    /// Log training progress every N episodes
    pub log_frequency: usize,

    /// Seed for the game and the agent, entropy when absent
    pub seed: Option<u64>,

    /// Game configuration (grid size, rewards)
    pub game_config: GameConfig,

    /// DQN hyperparameters
    pub dqn_config: DqnConfig,

    pub commentary: CommentaryConfig,

    /// Default capability request, overridable from the command line
    pub capabilities: CapabilityRequest,
}

impl TrainConfig {
    /// Create a new training configuration with defaults
    ///
    /// # Example
    ///
    /// ```rust
    /// use worm_dqn::modes::TrainConfig;
    ///
    /// let config = TrainConfig::new(10000);
    /// assert_eq!(config.num_episodes, 10000);
    /// ```
    pub fn new(num_episodes: usize) -> Self {
        Self {
            num_episodes,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {path:?}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_steps_per_episode == 0 {
            return Err("max_steps_per_episode must be at least 1".to_string());
        }
        if self.log_frequency == 0 {
            return Err("log_frequency must be at least 1".to_string());
        }
        self.game_config.validate()?;
        self.dqn_config.validate()?;
        self.commentary.validate()
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_episodes: 1000,
            max_steps_per_episode: 2000,
            log_frequency: 10,
            seed: None,
            game_config: GameConfig::default(),
            dqn_config: DqnConfig::default(),
            commentary: CommentaryConfig::default(),
            capabilities: CapabilityRequest::default(),
        }
    }
}

/// Per-episode totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub reward: f32,
    pub steps: usize,
    /// Food eaten
    pub score: u32,
    /// Ended by a collision rather than the step cap
    pub died: bool,
}

/// Training mode for the DQN agent
pub struct TrainMode<B: AutodiffBackend> {
    agent: WormAgent<B>,

    env: SnakeEnvironment,

    /// Absent when commentary is off
    commentator: Option<Commentator>,

    stats: TrainingStats,

    config: TrainConfig,

    current_episode: usize,

    total_steps: usize,
}

impl<B: AutodiffBackend> TrainMode<B> {
    /// Create a new training mode
    ///
    /// # Arguments
    ///
    /// * `config` - Training configuration
    /// * `capabilities` - Resolved capability set
    /// * `device` - Device for computation
    pub fn new(config: TrainConfig, capabilities: &Capabilities, device: B::Device) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow!("Invalid training config: {e}"))?;

        let (agent, env) = match config.seed {
            Some(seed) => (
                WormAgent::with_seed(config.dqn_config.clone(), capabilities, device, seed)?,
                SnakeEnvironment::with_seed(config.game_config.clone(), seed),
            ),
            None => (
                WormAgent::new(config.dqn_config.clone(), capabilities, device)?,
                SnakeEnvironment::new(config.game_config.clone()),
            ),
        };

        let commentator = match &capabilities.commentary {
            CommentaryMode::Off => None,
            CommentaryMode::Canned => Some(
                Commentator::from_config(Box::new(CannedCommentary), &config.commentary)
                    .context("Failed to start commentary")?,
            ),
            CommentaryMode::Remote { api_key } => {
                let provider = HttpCommentary::new(&config.commentary, api_key.clone())
                    .context("Failed to build commentary client")?;
                Some(
                    Commentator::from_config(Box::new(provider), &config.commentary)
                        .context("Failed to start commentary")?,
                )
            }
        };

        Ok(Self {
            agent,
            env,
            commentator,
            stats: TrainingStats::new(100),
            config,
            current_episode: 0,
            total_steps: 0,
        })
    }

    /// Run the training loop
    pub fn run(&mut self) -> Result<()> {
        self.log_header();

        for episode in 0..self.config.num_episodes {
            self.current_episode = episode;

            let summary = self.run_episode()?;
            self.stats
                .record_episode(summary.reward, summary.steps, summary.score);

            if (episode + 1) % self.config.log_frequency == 0 {
                self.log_progress(episode + 1);
            }
        }

        info!("Training complete");
        info!("{}", self.stats.format_summary(self.agent.epsilon()));

        Ok(())
    }

    /// Run a single training episode
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        self.agent.begin_episode();
        self.env.reset();

        let mut features = self.env.features();
        let mut summary = EpisodeSummary {
            reward: 0.0,
            steps: 0,
            score: 0,
            died: false,
        };

        while summary.steps < self.config.max_steps_per_episode {
            let decision = self.agent.act(&features, self.env.facing());
            let result = self.env.step(decision.action);
            let next_features = self.env.features();

            self.agent.remember(Transition {
                state: features,
                action: decision.action,
                reward: result.reward,
                next_state: next_features,
                terminal: result.terminated,
            });
            self.agent.record_step(&result);

            if let Some(report) = self.agent.learn() {
                self.stats.record_update(report.loss, report.mean_td_error);
            }

            summary.reward += result.reward;
            summary.steps += 1;
            self.total_steps += 1;

            if result.info.ate_food {
                summary.score += 1;
            }

            let milestone = result.info.ate_food && summary.score % MEALS_PER_COMMENT == 0;
            if milestone || result.terminated {
                self.comment(result.terminated, &decision.reasoning);
            }

            if result.terminated {
                summary.died = result.info.collision_type.is_some();
                break;
            }
            features = next_features;
        }

        self.agent.end_episode();
        debug!(
            episode = self.current_episode + 1,
            reward = summary.reward,
            steps = summary.steps,
            score = summary.score,
            "episode finished"
        );

        Ok(summary)
    }

    fn comment(&mut self, is_terminal: bool, reasoning: &str) {
        let Some(commentator) = self.commentator.as_mut() else {
            return;
        };

        let state = self.env.current_state();
        let request = CommentaryRequest {
            context: format!(
                "episode {}, {} food eaten, length {}, {} steps since the last meal",
                self.current_episode + 1,
                state.score,
                state.worm.len(),
                state.steps_without_food
            ),
            reasoning: reasoning.to_string(),
            is_terminal,
        };

        let line = commentator.comment(&request);
        info!(source = ?line.source, "{}", line.text);
    }

    fn log_header(&self) {
        let dqn = &self.config.dqn_config;
        info!(
            episodes = self.config.num_episodes,
            grid = %format!("{}x{}", self.config.game_config.grid_width, self.config.game_config.grid_height),
            learning = self.agent.is_learning(),
            "Double-DQN training"
        );
        info!(
            learning_rate = dqn.learning_rate,
            gamma = dqn.gamma,
            batch_size = dqn.batch_size,
            replay_capacity = dqn.replay_capacity,
            target_sync_interval = dqn.target_sync_interval,
            "hyperparameters"
        );
    }

    fn log_progress(&self, episode: usize) {
        info!(
            "[Episode {}/{}] {}",
            episode,
            self.config.num_episodes,
            self.stats.format_summary(self.agent.epsilon())
        );
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn telemetry(&self) -> &AgentTelemetry {
        self.agent.telemetry()
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{ReplayKind, TrainingBackend, default_device};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn quick_config(num_episodes: usize) -> TrainConfig {
        let mut config = TrainConfig::new(num_episodes);
        config.max_steps_per_episode = 30;
        config.log_frequency = 5;
        config.seed = Some(17);
        config.game_config = GameConfig::small();
        config.dqn_config.batch_size = 8;
        config.dqn_config.replay_capacity = 128;
        config.commentary.timeout_ms = 100;
        config
    }

    #[test]
    fn test_train_config_defaults() {
        let config = TrainConfig::new(1000);
        assert_eq!(config.num_episodes, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_json_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "num_episodes": 42, "game_config": {{ "grid_width": 12 }}, "capabilities": {{ "replay": "sum-tree" }} }}"#
        )
        .unwrap();

        let config = TrainConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.num_episodes, 42);
        assert_eq!(config.game_config.grid_width, 12);
        assert_eq!(config.game_config.grid_height, 30);
        assert_eq!(config.capabilities.replay, ReplayKind::SumTree);
        assert!(config.capabilities.learning);
        assert_eq!(config.dqn_config.batch_size, 64);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrainConfig::from_json_file(&dir.path().join("absent.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = quick_config(1);
        config.max_steps_per_episode = 0;

        let result = TrainMode::<TrainingBackend>::new(config, &Capabilities::default(), default_device());
        assert!(result.is_err());
    }

    #[test]
    fn test_run_single_episode() {
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(quick_config(1), &Capabilities::default(), default_device())
                .unwrap();

        let summary = train_mode.run_episode().unwrap();

        assert!(summary.steps > 0);
        assert!(summary.steps <= 30);
        assert!(summary.died || summary.steps == 30);
        assert_eq!(train_mode.telemetry().episodes, 1);
    }

    #[test]
    fn test_short_run_updates_telemetry() {
        let capabilities = Capabilities {
            replay: ReplayKind::SumTree,
            ..Default::default()
        };
        let mut train_mode =
            TrainMode::<TrainingBackend>::new(quick_config(12), &capabilities, default_device())
                .unwrap();

        train_mode.run().unwrap();

        let telemetry = train_mode.telemetry();
        assert_eq!(telemetry.episodes, 12);
        assert_eq!(train_mode.stats().total_episodes(), 12);
        assert_eq!(train_mode.stats().total_steps(), train_mode.total_steps());
        // At least one step per episode, so the batch of 8 fills
        assert!(telemetry.learn_steps > 0);
        assert_eq!(telemetry.failed_learn_steps, 0);
        assert!(telemetry.epsilon < 1.0);
        assert!(telemetry.last_loss.is_some());
        assert!(!telemetry.last_reasoning.is_empty());
    }
}
