//! Reinforcement learning core for the worm agent
//!
//! Provides:
//! - 11-component state featurization
//! - Recurrent (LSTM) Q-value network
//! - Prioritized replay memory with two interchangeable implementations
//! - Epsilon-greedy policy with reversal filtering
//! - Double-DQN trainer with target-network synchronization
//! - The environment adapter and the agent that ties it all together

pub mod agent;
pub mod backend;
pub mod config;
pub mod environment;
pub mod error;
pub mod features;
pub mod network;
pub mod policy;
pub mod replay;
pub mod trainer;

pub use agent::WormAgent;
pub use backend::{InferenceBackend, TrainingBackend, default_device};
pub use config::DqnConfig;
pub use environment::{Environment, SnakeEnvironment};
pub use error::{AgentError, LearnError};
pub use features::{FEATURE_COUNT, Features, featurize, featurize_state};
pub use network::{RecurrentMemory, ValueNetwork, ValueNetworkConfig};
pub use policy::{Decision, random_action, select_action};
pub use replay::{ReplayKind, ReplayMemory, SampledBatch, Transition, build_replay};
pub use trainer::{DqnTrainer, LearnOutcome, LearnReport};
