use super::action::Direction;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    /// Manhattan distance to another position
    pub fn manhattan(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// The worm in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Worm {
    /// Body segments, with head at index 0
    pub body: Vec<Position>,
    /// Current direction of movement
    pub direction: Direction,
}

impl Worm {
    /// Create a new worm with given starting position and direction
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let mut body = vec![head];

        // Initial segments trail behind the head
        let back = direction.opposite();
        for i in 1..length {
            let prev = body[i - 1];
            body.push(prev.moved_in_direction(back));
        }

        Self { body, direction }
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Get body segments (excluding head)
    pub fn body_segments(&self) -> &[Position] {
        &self.body[1..]
    }

    /// Check if position collides with worm body (excluding head)
    pub fn collides_with_body(&self, pos: Position) -> bool {
        self.body_segments().contains(&pos)
    }

    /// Move worm in current direction, growing if should_grow is true
    pub fn advance(&mut self, should_grow: bool) {
        let new_head = self.head().moved_in_direction(self.direction);
        self.body.insert(0, new_head);

        if !should_grow {
            self.body.pop();
        }
    }

    /// Get the length of the worm
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Worm hit a wall
    Wall,
    /// Worm hit itself
    SelfCollision,
}

/// Complete game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub worm: Worm,
    pub food: Position,
    pub grid_width: usize,
    pub grid_height: usize,
    /// Food eaten this episode
    pub score: u32,
    pub steps: u32,
    pub steps_without_food: u32,
    pub is_alive: bool,
}

impl GameState {
    /// Create a new game state
    pub fn new(worm: Worm, food: Position, grid_width: usize, grid_height: usize) -> Self {
        Self {
            worm,
            food,
            grid_width,
            grid_height,
            score: 0,
            steps: 0,
            steps_without_food: 0,
            is_alive: true,
        }
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.x < self.grid_width as i32
            && pos.y >= 0
            && pos.y < self.grid_height as i32
    }

    /// Check if a position is occupied by the worm
    pub fn is_occupied_by_worm(&self, pos: Position) -> bool {
        self.worm.body.contains(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_movement() {
        let pos = Position::new(5, 5);
        assert_eq!(pos.moved_by(1, 0), Position::new(6, 5));
        assert_eq!(pos.moved_by(-1, 0), Position::new(4, 5));
        assert_eq!(pos.moved_in_direction(Direction::Down), Position::new(5, 6));
        assert_eq!(pos.moved_in_direction(Direction::Up), Position::new(5, 4));
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(Position::new(1, 1).manhattan(Position::new(4, -1)), 5);
        assert_eq!(Position::new(3, 3).manhattan(Position::new(3, 3)), 0);
    }

    #[test]
    fn test_worm_creation() {
        let worm = Worm::new(Position::new(5, 5), Direction::Right, 3);
        assert_eq!(worm.len(), 3);
        assert_eq!(worm.head(), Position::new(5, 5));
        assert_eq!(worm.body[1], Position::new(4, 5));
        assert_eq!(worm.body[2], Position::new(3, 5));
    }

    #[test]
    fn test_worm_movement() {
        let mut worm = Worm::new(Position::new(5, 5), Direction::Right, 3);

        worm.advance(false);
        assert_eq!(worm.len(), 3);
        assert_eq!(worm.head(), Position::new(6, 5));

        worm.advance(true);
        assert_eq!(worm.len(), 4);
        assert_eq!(worm.head(), Position::new(7, 5));
    }

    #[test]
    fn test_collision_detection() {
        let worm = Worm::new(Position::new(5, 5), Direction::Right, 3);
        assert!(!worm.collides_with_body(Position::new(5, 5))); // head
        assert!(worm.collides_with_body(Position::new(4, 5))); // body
        assert!(!worm.collides_with_body(Position::new(10, 10))); // empty
    }

    #[test]
    fn test_bounds_checking() {
        let state = GameState::new(
            Worm::new(Position::new(5, 5), Direction::Right, 3),
            Position::new(10, 10),
            20,
            15,
        );

        assert!(state.is_in_bounds(Position::new(0, 0)));
        assert!(state.is_in_bounds(Position::new(19, 14)));
        assert!(!state.is_in_bounds(Position::new(-1, 0)));
        assert!(!state.is_in_bounds(Position::new(20, 0)));
        assert!(!state.is_in_bounds(Position::new(0, 15)));
    }
}
