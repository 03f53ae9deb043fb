//! Fixed-size feature vector for the value network
//!
//! Layout (11 components):
//!
//! ```text
//! [0..4)   wall distances      left, right, top, bottom   in [0, 1]
//! [4..6)   food offset         (fx - x) / W, (fy - y) / H  signed
//! [6..10)  danger flags        Up, Right, Down, Left       0 or 1
//! [10]     body length         len / (W * H)
//! ```
//!
//! Danger flags follow action-index order so the network sees them aligned
//! with its outputs.

use burn::tensor::{Tensor, TensorData, backend::Backend};

use crate::game::{Direction, GameState, Position};

/// Number of features produced by [`featurize`]
pub const FEATURE_COUNT: usize = 11;

/// One featurized game state
pub type Features = [f32; FEATURE_COUNT];

/// Featurize a raw game state
///
/// `body` is ordered head first. An empty body yields the zero vector.
///
/// # Example
///
/// ```rust
/// use worm_dqn::game::Position;
/// use worm_dqn::rl::features::featurize;
///
/// let body = [Position::new(20, 15)];
/// let features = featurize(&body, Position::new(23, 15), 40, 30);
///
/// assert_eq!(features[4], 3.0 / 40.0);
/// assert_eq!(features[5], 0.0);
/// ```
pub fn featurize(body: &[Position], food: Position, grid_width: usize, grid_height: usize) -> Features {
    let mut features = [0.0; FEATURE_COUNT];
    let Some(&head) = body.first() else {
        return features;
    };

    let width = grid_width as f32;
    let height = grid_height as f32;

    features[0] = head.x as f32 / width;
    features[1] = (grid_width as i32 - head.x - 1) as f32 / width;
    features[2] = head.y as f32 / height;
    features[3] = (grid_height as i32 - head.y - 1) as f32 / height;

    features[4] = (food.x - head.x) as f32 / width;
    features[5] = (food.y - head.y) as f32 / height;

    let segments = &body[1..];
    for direction in Direction::ALL {
        let next = head.moved_in_direction(direction);
        let off_grid = next.x < 0
            || next.x >= grid_width as i32
            || next.y < 0
            || next.y >= grid_height as i32;
        if off_grid || segments.contains(&next) {
            features[6 + direction.index()] = 1.0;
        }
    }

    features[10] = body.len() as f32 / (grid_width * grid_height) as f32;

    features
}

/// Featurize a [`GameState`]
pub fn featurize_state(state: &GameState) -> Features {
    featurize(&state.worm.body, state.food, state.grid_width, state.grid_height)
}

/// Stack feature vectors into a `[batch, FEATURE_COUNT]` tensor
pub fn features_to_tensor<'a, B: Backend>(
    rows: impl IntoIterator<Item = &'a Features>,
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Vec<f32> = rows.into_iter().flat_map(|row| row.iter().copied()).collect();
    let batch = data.len() / FEATURE_COUNT;
    Tensor::<B, 2>::from_data(TensorData::new(data, [batch, FEATURE_COUNT]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Worm, GameState};
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type TestBackend = NdArray<f32>;

    const W: usize = 40;
    const H: usize = 30;

    #[test]
    fn test_food_offset_three_cells_right() {
        let body = [Position::new(20, 15)];
        let features = featurize(&body, Position::new(23, 15), W, H);

        assert_eq!(features[4], 3.0 / W as f32);
        assert_eq!(features[5], 0.0);
    }

    #[test]
    fn test_wall_distances_at_origin() {
        let body = [Position::new(0, 0)];
        let features = featurize(&body, Position::new(5, 5), W, H);

        assert_eq!(features[0], 0.0);
        assert_eq!(features[1], 39.0 / 40.0);
        assert_eq!(features[2], 0.0);
        assert_eq!(features[3], 29.0 / 30.0);
        // Up and Left leave the grid
        assert_eq!(&features[6..10], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_danger_from_body() {
        let worm = Worm::new(Position::new(10, 10), Direction::Right, 3);
        let features = featurize(&worm.body, Position::new(0, 0), W, H);

        // Segment at (9, 10) sits to the left of the head
        assert_eq!(&features[6..10], &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(features[10], 3.0 / 1200.0);
    }

    #[test]
    fn test_empty_body_is_zero() {
        let features = featurize(&[], Position::new(1, 1), W, H);
        assert_eq!(features, [0.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_ranges_over_every_cell() {
        for x in 0..W as i32 {
            for y in 0..H as i32 {
                let body = [Position::new(x, y), Position::new(x, y).moved_by(0, 1)];
                let food = Position::new((x * 7) % W as i32, (y * 3) % H as i32);
                let features = featurize(&body, food, W, H);

                assert_eq!(features.len(), FEATURE_COUNT);
                assert!(features.iter().all(|f| f.is_finite()));
                assert!(features[0..4].iter().all(|d| (0.0..=1.0).contains(d)));
                assert!(features[4..6].iter().all(|d| (-1.0..=1.0).contains(d)));
                assert!(features[6..10].iter().all(|d| *d == 0.0 || *d == 1.0));
                assert!((0.0..=1.0).contains(&features[10]));
            }
        }
    }

    #[test]
    fn test_featurize_is_deterministic() {
        let state = GameState::new(
            Worm::new(Position::new(4, 4), Direction::Up, 2),
            Position::new(8, 1),
            10,
            10,
        );
        assert_eq!(featurize_state(&state), featurize_state(&state));
    }

    #[test]
    fn test_features_to_tensor_shape() {
        let device = NdArrayDevice::default();
        let rows = [[0.5; FEATURE_COUNT], [0.25; FEATURE_COUNT], [0.0; FEATURE_COUNT]];

        let tensor = features_to_tensor::<TestBackend>(rows.iter(), &device);

        assert_eq!(tensor.dims(), [3, FEATURE_COUNT]);
        let data = tensor.into_data();
        assert_eq!(data.as_slice::<f32>().unwrap()[FEATURE_COUNT], 0.25);
    }
}
