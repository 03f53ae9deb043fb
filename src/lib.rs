//! Worm DQN - a recurrent Double-DQN agent that learns a grid game by self-play
//!
//! This library provides:
//! - Headless game logic (game module)
//! - Featurizer, value network, prioritized replay, policy and trainer (rl module)
//! - Time-bounded commentary with canned fallback (commentary module)
//! - Training statistics and the agent telemetry snapshot (metrics module)
//! - The headless training loop (modes module)

pub mod capabilities;
pub mod commentary;
pub mod game;
pub mod metrics;
pub mod modes;
pub mod rl;
