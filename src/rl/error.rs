use thiserror::Error;

/// Why a learning step was abandoned
///
/// Raised before any parameter, priority or counter changes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LearnError {
    #[error("loss is not finite ({0})")]
    NonFiniteLoss(f32),

    #[error("temporal-difference errors are not finite")]
    NonFiniteTdError,

    #[error("tensor conversion failed: {0}")]
    Tensor(String),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
