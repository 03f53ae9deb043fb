use serde::{Deserialize, Serialize};

/// Configuration for the game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Initial length of the worm
    pub initial_length: usize,

    // Rewards (for RL)
    /// Bonus for eating food, on top of the distance term
    pub food_reward: f32,
    /// Reward for dying
    pub death_penalty: f32,
    /// Steps without food after which the hunger penalty applies
    pub hunger_threshold: u32,
    /// Penalty applied past `hunger_threshold`
    pub hunger_penalty: f32,
    /// Steps without food after which the worm is considered circling
    pub circling_threshold: u32,
    /// Extra penalty applied past `circling_threshold`
    pub circling_penalty: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 40,
            grid_height: 30,
            initial_length: 1,
            food_reward: 1.0,
            death_penalty: -1.0,
            hunger_threshold: 100,
            hunger_penalty: -0.1,
            circling_threshold: 200,
            circling_penalty: -0.2,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10, 10)
    }

    /// Total number of cells on the grid
    pub fn cell_count(&self) -> usize {
        self.grid_width * self.grid_height
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_width < 3 || self.grid_height < 3 {
            return Err(format!(
                "grid must be at least 3x3, got {}x{}",
                self.grid_width, self.grid_height
            ));
        }

        if self.initial_length == 0 || self.initial_length > self.grid_width / 2 {
            return Err(format!(
                "initial_length must be in [1, {}], got {}",
                self.grid_width / 2,
                self.initial_length
            ));
        }

        if self.circling_threshold < self.hunger_threshold {
            return Err(format!(
                "circling_threshold ({}) cannot be below hunger_threshold ({})",
                self.circling_threshold, self.hunger_threshold
            ));
        }

        Ok(())
    }
}
