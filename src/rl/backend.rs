//! Backend type aliases and device management
//!
//! - **TrainingBackend**: Autodiff-enabled NdArray backend used by the trainer
//! - **InferenceBackend**: Plain NdArray backend used for action selection and
//!   target-network evaluation
//!
//! The value network is small enough that the CPU backend is all the agent
//! needs.
//!
//! # Example
//!
//! ```rust
//! use worm_dqn::rl::{TrainingBackend, ValueNetworkConfig, default_device};
//!
//! let device = default_device();
//! let network = ValueNetworkConfig::new().init::<TrainingBackend>(&device);
//! ```

use burn::backend::{
    Autodiff,
    ndarray::{NdArray, NdArrayDevice},
};

/// Backend type for training (with autodiff)
pub type TrainingBackend = Autodiff<NdArray<f32>>;

/// Backend type for inference (without autodiff)
///
/// This is `<TrainingBackend as AutodiffBackend>::InnerBackend`, so a policy
/// network's `valid()` copy lands here.
pub type InferenceBackend = NdArray<f32>;

/// Get the default device for computation
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::default()
}
