//! Recurrent Q-value network for the worm agent
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, 11]
//!   ↓ Linear(11 → 128) + ReLU
//!   ↓ Linear(128 → 128) + ReLU
//!   ↓ LSTM(128 → 128), one time step, carried (cell, hidden)
//!   ↓ Linear(128 → 64) + ReLU
//!   ↓ Linear(64 → 4)          → Q-values, one per direction
//! ```
//!
//! The LSTM memory is never stored inside the network. Callers pass a
//! [`RecurrentMemory`] in and get the advanced one back, so the same network
//! can serve the interactive single-step path and the stateless batched path
//! used for training.
//!
//! # Example
//!
//! ```rust
//! use worm_dqn::rl::{RecurrentMemory, ValueNetworkConfig};
//! use burn::backend::ndarray::NdArrayDevice;
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = NdArrayDevice::default();
//! let config = ValueNetworkConfig::new();
//! let network = config.init::<Backend>(&device);
//!
//! // Batched, no temporal carry
//! let q = network.forward_batch(Tensor::zeros([8, 11], &device));
//! assert_eq!(q.dims(), [8, 4]);
//!
//! // Single step with carried memory
//! let memory = RecurrentMemory::zeros(1, config.recurrent_width, &device);
//! let (q, memory) = network.forward_step(Tensor::zeros([1, 11], &device), Some(memory));
//! assert_eq!(q.dims(), [1, 4]);
//! assert_eq!(memory.hidden().dims(), [1, 128]);
//! ```

use burn::{
    module::Module,
    nn::{Linear, LinearConfig, Lstm, LstmConfig, LstmState},
    tensor::{Tensor, activation::relu, backend::Backend},
};
use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;
use crate::game::Direction;

/// Configuration for the value network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueNetworkConfig {
    /// Number of input features (default: 11)
    pub input_size: usize,

    /// Number of actions (default: 4)
    pub num_actions: usize,

    /// Width of the first feed-forward layer (default: 128)
    pub feature_width: usize,

    /// Width of the LSTM hidden and cell state (default: 128)
    pub recurrent_width: usize,

    /// Width of the layer before the output head (default: 64)
    pub head_width: usize,
}

impl ValueNetworkConfig {
    /// Create a new configuration with default layer widths
    pub fn new() -> Self {
        Self {
            input_size: FEATURE_COUNT,
            num_actions: Direction::COUNT,
            feature_width: 128,
            recurrent_width: 128,
            head_width: 64,
        }
    }

    /// Initialize the value network from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNetwork<B> {
        ValueNetwork {
            fc1: LinearConfig::new(self.input_size, self.feature_width).init(device),
            fc2: LinearConfig::new(self.feature_width, self.recurrent_width).init(device),
            lstm: LstmConfig::new(self.recurrent_width, self.recurrent_width, true).init(device),
            fc3: LinearConfig::new(self.recurrent_width, self.head_width).init(device),
            fc4: LinearConfig::new(self.head_width, self.num_actions).init(device),
        }
    }
}

impl Default for ValueNetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Carried LSTM state for one episode
///
/// Both tensors have shape `[batch, recurrent_width]`.
#[derive(Debug, Clone)]
pub struct RecurrentMemory<B: Backend> {
    cell: Tensor<B, 2>,
    hidden: Tensor<B, 2>,
}

impl<B: Backend> RecurrentMemory<B> {
    /// Zeroed memory, the state at the start of every episode
    pub fn zeros(batch_size: usize, width: usize, device: &B::Device) -> Self {
        Self {
            cell: Tensor::zeros([batch_size, width], device),
            hidden: Tensor::zeros([batch_size, width], device),
        }
    }

    pub fn cell(&self) -> &Tensor<B, 2> {
        &self.cell
    }

    pub fn hidden(&self) -> &Tensor<B, 2> {
        &self.hidden
    }

    fn into_lstm_state(self) -> LstmState<B, 2> {
        LstmState::new(self.cell, self.hidden)
    }

    fn from_lstm_state(state: LstmState<B, 2>) -> Self {
        Self {
            cell: state.cell,
            hidden: state.hidden,
        }
    }
}

/// Recurrent Q-network
///
/// Generic over the backend so the same definition serves training
/// (`Autodiff<NdArray>`) and action selection (`NdArray`, via `valid()`).
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    lstm: Lstm<B>,
    fc3: Linear<B>,
    fc4: Linear<B>,
}

impl<B: Backend> ValueNetwork<B> {
    /// Forward one time step
    ///
    /// # Arguments
    ///
    /// * `features` - Tensor with shape `[batch, 11]`
    /// * `memory` - Carried memory, `None` means zero-initialized
    ///
    /// # Returns
    ///
    /// Q-values `[batch, 4]` and the memory after this step
    pub fn forward_step(
        &self,
        features: Tensor<B, 2>,
        memory: Option<RecurrentMemory<B>>,
    ) -> (Tensor<B, 2>, RecurrentMemory<B>) {
        let x = relu(self.fc1.forward(features));
        let x = relu(self.fc2.forward(x));

        // Sequence length of one: [batch, 1, width]
        let x: Tensor<B, 3> = x.unsqueeze_dim(1);
        let (x, state) = self
            .lstm
            .forward(x, memory.map(RecurrentMemory::into_lstm_state));
        let [batch_size, _, width] = x.dims();
        let x = x.reshape([batch_size, width]);

        let x = relu(self.fc3.forward(x));
        let q_values = self.fc4.forward(x);

        (q_values, RecurrentMemory::from_lstm_state(state))
    }

    /// Forward a batch with no temporal carry (training path)
    ///
    /// Every row starts from zero memory, matching what the single-step path
    /// produces at the start of an episode.
    pub fn forward_batch(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.forward_step(features, None).0
    }
}
