use super::{
    action::Direction,
    config::GameConfig,
    state::{CollisionType, GameState, Position, Worm},
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Random draws before falling back to a scan of the free cells
const RANDOM_FOOD_ATTEMPTS: usize = 64;

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether the worm ate food this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Reward for this step (for RL training)
    pub reward: f32,
    /// Whether the game has terminated
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

/// The game engine that handles all game logic
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
}

impl GameEngine {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an engine with a fixed seed (reproducible food placement)
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Reset the game to initial state
    ///
    /// The worm starts at the grid centre facing a random direction.
    pub fn reset(&mut self) -> GameState {
        let center_x = (self.config.grid_width / 2) as i32;
        let center_y = (self.config.grid_height / 2) as i32;
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::COUNT)];

        let worm = Worm::new(
            Position::new(center_x, center_y),
            direction,
            self.config.initial_length,
        );

        // A validated config always leaves free cells around the starting worm
        let food = self
            .spawn_food_avoid_worm(&worm)
            .unwrap_or_else(|| worm.head());

        GameState::new(worm, food, self.config.grid_width, self.config.grid_height)
    }

    /// Execute one step of the game
    pub fn step(&mut self, state: &mut GameState, direction: Direction) -> StepResult {
        if !state.is_alive {
            return StepResult {
                reward: 0.0,
                terminated: true,
                info: StepInfo {
                    ate_food: false,
                    collision_type: None,
                },
            };
        }

        // 180-degree turns are ignored
        if !state.worm.direction.is_opposite(direction) {
            state.worm.direction = direction;
        }

        let new_head = state.worm.head().moved_in_direction(state.worm.direction);

        if let Some(collision_type) = self.check_collision(state, new_head) {
            state.is_alive = false;
            state.steps += 1;

            return StepResult {
                reward: self.config.death_penalty,
                terminated: true,
                info: StepInfo {
                    ate_food: false,
                    collision_type: Some(collision_type),
                },
            };
        }

        let ate_food = new_head == state.food;
        state.worm.advance(ate_food);

        if ate_food {
            state.score += 1;
            state.steps_without_food = 0;
            state.steps += 1;

            let Some(food) = self.spawn_food_avoid_worm(&state.worm) else {
                // The worm fills the grid
                state.is_alive = false;
                return StepResult {
                    reward: self.config.food_reward,
                    terminated: true,
                    info: StepInfo {
                        ate_food,
                        collision_type: None,
                    },
                };
            };
            state.food = food;
        } else {
            state.steps += 1;
            state.steps_without_food += 1;
        }

        StepResult {
            reward: self.shaped_reward(state, ate_food),
            terminated: false,
            info: StepInfo {
                ate_food,
                collision_type: None,
            },
        }
    }

    /// Distance-shaped reward for a surviving step
    ///
    /// Measured against the food as placed after the move, so a meal is scored
    /// against the freshly spawned food plus the food bonus.
    fn shaped_reward(&self, state: &GameState, ate_food: bool) -> f32 {
        let span = (self.config.grid_width + self.config.grid_height) as f32;
        let distance = state.worm.head().manhattan(state.food) as f32;
        let mut reward = -distance / span;

        if ate_food {
            reward += self.config.food_reward;
        }
        if state.steps_without_food > self.config.hunger_threshold {
            reward += self.config.hunger_penalty;
        }
        if state.steps_without_food > self.config.circling_threshold {
            reward += self.config.circling_penalty;
        }

        reward
    }

    /// Check if the new head position causes a collision
    fn check_collision(&self, state: &GameState, pos: Position) -> Option<CollisionType> {
        if !state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        if state.worm.collides_with_body(pos) {
            return Some(CollisionType::SelfCollision);
        }

        None
    }

    /// Spawn food on a random cell the worm does not cover
    ///
    /// `None` when the worm covers the whole grid.
    fn spawn_food_avoid_worm(&mut self, worm: &Worm) -> Option<Position> {
        let (width, height) = (self.config.grid_width, self.config.grid_height);

        for _ in 0..RANDOM_FOOD_ATTEMPTS {
            let x = self.rng.gen_range(0..width) as i32;
            let y = self.rng.gen_range(0..height) as i32;
            let pos = Position::new(x, y);

            if !worm.body.contains(&pos) {
                return Some(pos);
            }
        }

        let free: Vec<Position> = (0..height as i32)
            .flat_map(|y| (0..width as i32).map(move |x| Position::new(x, y)))
            .filter(|pos| !worm.body.contains(pos))
            .collect();
        free.choose(&mut self.rng).copied()
    }
}
