//! The worm agent: the one object the tick loop talks to
//!
//! Owns the trainer, the replay memory, the per-episode recurrent memory and
//! the observability snapshot. A tick looks like:
//!
//! ```text
//! features ─▶ act ─▶ env.step ─▶ remember ─▶ learn
//! ```

use burn::tensor::backend::AutodiffBackend;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, warn};

use super::config::DqnConfig;
use super::error::AgentError;
use super::features::Features;
use super::network::RecurrentMemory;
use super::policy::{Decision, random_action, select_action};
use super::replay::{ReplayMemory, Transition, build_replay};
use super::trainer::{DqnTrainer, LearnOutcome, LearnReport};
use crate::capabilities::Capabilities;
use crate::game::{Direction, StepResult};
use crate::metrics::AgentTelemetry;

/// Double-DQN agent with prioritized replay and recurrent memory
///
/// # Example
///
/// ```rust
/// use worm_dqn::capabilities::Capabilities;
/// use worm_dqn::game::Direction;
/// use worm_dqn::rl::{DqnConfig, TrainingBackend, WormAgent, default_device};
///
/// let mut agent =
///     WormAgent::<TrainingBackend>::new(DqnConfig::default(), &Capabilities::default(), default_device())
///         .unwrap();
///
/// agent.begin_episode();
/// let decision = agent.act(&[0.0; 11], Direction::Up);
/// assert_ne!(decision.action, Direction::Down);
/// ```
pub struct WormAgent<B: AutodiffBackend> {
    trainer: DqnTrainer<B>,

    memory: Box<dyn ReplayMemory>,

    /// `None` until the first greedy decision of an episode
    recurrent: Option<RecurrentMemory<B::InnerBackend>>,

    /// When false, decisions are uniform random and nothing is stored or learned
    learning: bool,

    telemetry: AgentTelemetry,

    rng: StdRng,
}

impl<B: AutodiffBackend> WormAgent<B> {
    /// Create an agent
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidConfig`] if `config` fails validation
    pub fn new(
        config: DqnConfig,
        capabilities: &Capabilities,
        device: B::Device,
    ) -> Result<Self, AgentError> {
        Self::with_rng(config, capabilities, device, StdRng::from_entropy())
    }

    /// Create an agent with reproducible exploration and sampling
    pub fn with_seed(
        config: DqnConfig,
        capabilities: &Capabilities,
        device: B::Device,
        seed: u64,
    ) -> Result<Self, AgentError> {
        Self::with_rng(config, capabilities, device, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        config: DqnConfig,
        capabilities: &Capabilities,
        device: B::Device,
        rng: StdRng,
    ) -> Result<Self, AgentError> {
        config.validate().map_err(AgentError::InvalidConfig)?;

        let memory = build_replay(capabilities.replay, config.replay_capacity);
        let trainer = DqnTrainer::new(config, device);
        let telemetry = AgentTelemetry::new(trainer.epsilon());

        Ok(Self {
            trainer,
            memory,
            recurrent: None,
            learning: capabilities.learning,
            telemetry,
            rng,
        })
    }

    /// Reset the recurrent memory for a new episode
    pub fn begin_episode(&mut self) {
        self.recurrent = None;
    }

    /// Choose the next direction
    ///
    /// Advances the recurrent memory when the network is consulted.
    pub fn act(&mut self, features: &Features, facing: Direction) -> Decision {
        let decision = if self.learning {
            let network = self.trainer.inference_policy();
            let (decision, recurrent) = select_action(
                network,
                features,
                facing,
                self.trainer.epsilon(),
                self.recurrent.take(),
                &mut self.rng,
                self.trainer.device(),
            );
            self.recurrent = recurrent;
            decision
        } else {
            random_action(facing, &mut self.rng)
        };

        debug!(action = decision.action.name(), reasoning = %decision.reasoning, "decision");
        self.telemetry.record_decision(&decision);
        decision
    }

    /// Store a transition for replay
    pub fn remember(&mut self, transition: Transition) {
        if self.learning {
            self.memory.add(transition);
        }
    }

    /// Run one learning step if the replay memory is warm
    ///
    /// A rejected step is logged and counted; the agent keeps its previous
    /// parameters and the tick loop carries on.
    pub fn learn(&mut self) -> Option<LearnReport> {
        if !self.learning {
            return None;
        }

        match self.trainer.learn(self.memory.as_mut(), &mut self.rng) {
            Ok(LearnOutcome::Trained(report)) => {
                self.telemetry.record_learn(&report, self.trainer.epsilon());
                Some(report)
            }
            Ok(LearnOutcome::Skipped) => None,
            Err(err) => {
                self.telemetry.failed_learn_steps += 1;
                warn!(error = %err, "learning step skipped");
                None
            }
        }
    }

    /// Fold an environment step into the telemetry
    pub fn record_step(&mut self, result: &StepResult) {
        self.telemetry.record_step(result);
    }

    /// Close the current episode
    pub fn end_episode(&mut self) {
        self.telemetry.episodes += 1;
        self.recurrent = None;
    }

    pub fn telemetry(&self) -> &AgentTelemetry {
        &self.telemetry
    }

    pub fn epsilon(&self) -> f64 {
        self.trainer.epsilon()
    }

    pub fn is_learning(&self) -> bool {
        self.learning
    }

    pub fn memory(&self) -> &dyn ReplayMemory {
        self.memory.as_ref()
    }

    pub fn trainer(&self) -> &DqnTrainer<B> {
        &self.trainer
    }
}
