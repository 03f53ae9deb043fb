pub mod train;

pub use train::{EpisodeSummary, TrainConfig, TrainMode};
