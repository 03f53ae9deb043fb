pub mod telemetry;
pub mod training_stats;

pub use telemetry::AgentTelemetry;
pub use training_stats::TrainingStats;
