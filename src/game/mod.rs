//! Headless grid game the agent learns on
//!
//! Pure game logic with no I/O or rendering. It is the concrete world behind
//! the [`Environment`](crate::rl::Environment) adapter.

pub mod action;
pub mod config;
pub mod engine;
pub mod state;

pub use action::Direction;
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Position, Worm};
