use super::features::{Features, featurize_state};
use crate::game::{Direction, GameConfig, GameEngine, GameState, StepResult};

/// World the agent acts in
///
/// The learning core only ever sees states through the featurizer and
/// rewards through [`StepResult`].
pub trait Environment {
    /// State after the last `step` or `reset`
    fn current_state(&self) -> &GameState;

    /// Advance one tick with the chosen direction
    fn step(&mut self, direction: Direction) -> StepResult;

    /// Start a new episode
    fn reset(&mut self) -> &GameState;

    /// Featurized current state
    fn features(&self) -> Features {
        featurize_state(self.current_state())
    }

    /// Direction the agent is currently moving in
    fn facing(&self) -> Direction {
        self.current_state().worm.direction
    }
}

/// Worm game wrapped as an [`Environment`]
///
/// # Example
///
/// ```rust
/// use worm_dqn::game::{Direction, GameConfig};
/// use worm_dqn::rl::{Environment, SnakeEnvironment};
///
/// let mut env = SnakeEnvironment::new(GameConfig::small());
/// let facing = env.facing();
/// let result = env.step(facing);
/// assert!(result.reward.is_finite());
/// ```
pub struct SnakeEnvironment {
    engine: GameEngine,
    state: GameState,
}

impl SnakeEnvironment {
    pub fn new(config: GameConfig) -> Self {
        Self::from_engine(GameEngine::new(config))
    }

    /// Environment with reproducible spawns
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::from_engine(GameEngine::with_seed(config, seed))
    }

    fn from_engine(mut engine: GameEngine) -> Self {
        let state = engine.reset();
        Self { engine, state }
    }

    pub fn config(&self) -> &GameConfig {
        self.engine.config()
    }

    pub fn is_done(&self) -> bool {
        !self.state.is_alive
    }
}

impl Environment for SnakeEnvironment {
    fn current_state(&self) -> &GameState {
        &self.state
    }

    fn step(&mut self, direction: Direction) -> StepResult {
        self.engine.step(&mut self.state, direction)
    }

    fn reset(&mut self) -> &GameState {
        self.state = self.engine.reset();
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::CollisionType;

    #[test]
    fn test_environment_creation() {
        let env = SnakeEnvironment::new(GameConfig::default());
        let state = env.current_state();

        assert!(state.is_alive);
        assert_eq!(state.worm.len(), 1);
        assert_eq!((state.grid_width, state.grid_height), (40, 30));
        assert!(!env.is_done());
    }

    #[test]
    fn test_features_match_state() {
        let env = SnakeEnvironment::with_seed(GameConfig::default(), 12);
        let state = env.current_state();
        let features = env.features();

        assert_eq!(features[0], 20.0 / 40.0);
        assert_eq!(features[2], 15.0 / 30.0);
        assert_eq!(features[4], (state.food.x - 20) as f32 / 40.0);
        assert_eq!(features[10], 1.0 / 1200.0);
    }

    #[test]
    fn test_step_rewards_follow_shaping() {
        let mut env = SnakeEnvironment::with_seed(GameConfig::default(), 5);
        let facing = env.facing();

        let result = env.step(facing);
        let state = env.current_state();

        assert!(!result.terminated);
        let expected = if result.info.ate_food {
            1.0 - state.worm.head().manhattan(state.food) as f32 / 70.0
        } else {
            -(state.worm.head().manhattan(state.food) as f32) / 70.0
        };
        assert!((result.reward - expected).abs() < 1e-6);
    }

    #[test]
    fn test_death_is_terminal() {
        let mut env = SnakeEnvironment::with_seed(GameConfig::small(), 2);
        let facing = env.facing();

        // Straight line from the centre reaches a wall within the grid size
        let mut last = None;
        for _ in 0..20 {
            let result = env.step(facing);
            let done = result.terminated;
            last = Some(result);
            if done {
                break;
            }
        }

        let last = last.unwrap();
        assert!(last.terminated);
        assert!(env.is_done());
        if last.info.collision_type == Some(CollisionType::Wall) {
            assert_eq!(last.reward, -1.0);
        }
    }

    #[test]
    fn test_reset_revives() {
        let mut env = SnakeEnvironment::with_seed(GameConfig::small(), 4);
        let facing = env.facing();
        while !env.step(facing).terminated {}

        let state = env.reset();
        assert!(state.is_alive);
        assert_eq!(state.steps, 0);
        assert!(!env.is_done());
    }
}
