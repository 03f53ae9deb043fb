//! Optional capabilities, resolved once at startup
//!
//! Anything the process may run without (learning, the accelerated replay
//! memory, remote commentary) is requested up front and resolved here into a
//! [`Capabilities`] value that constructors take explicitly. A capability that
//! cannot be honored degrades to its documented fallback with a warning.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rl::ReplayKind;

/// Environment variable holding the commentary API key
pub const COMMENTARY_API_KEY_VAR: &str = "COMMENTARY_API_KEY";

/// Requested commentary source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentaryChoice {
    Off,
    #[default]
    Canned,
    Remote,
}

/// Resolved commentary source
#[derive(Clone, PartialEq, Eq)]
pub enum CommentaryMode {
    Off,
    Canned,
    Remote { api_key: String },
}

impl std::fmt::Debug for CommentaryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Canned => write!(f, "Canned"),
            Self::Remote { .. } => write!(f, "Remote {{ api_key: <redacted> }}"),
        }
    }
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityRequest {
    pub learning: bool,
    pub replay: ReplayKind,
    pub commentary: CommentaryChoice,
}

impl Default for CapabilityRequest {
    fn default() -> Self {
        Self {
            learning: true,
            replay: ReplayKind::Standard,
            commentary: CommentaryChoice::Canned,
        }
    }
}

/// What the process will actually run with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Policy backed by the value network and trained online; off means
    /// uniform random movement
    pub learning: bool,

    pub replay: ReplayKind,

    pub commentary: CommentaryMode,
}

impl Capabilities {
    /// Resolve a request against what is available
    ///
    /// `api_key` is the value of [`COMMENTARY_API_KEY_VAR`], if set.
    pub fn resolve(request: &CapabilityRequest, api_key: Option<String>) -> Self {
        let commentary = match request.commentary {
            CommentaryChoice::Off => CommentaryMode::Off,
            CommentaryChoice::Canned => CommentaryMode::Canned,
            CommentaryChoice::Remote => match api_key.filter(|key| !key.trim().is_empty()) {
                Some(api_key) => CommentaryMode::Remote { api_key },
                None => {
                    warn!(
                        "remote commentary requested but {COMMENTARY_API_KEY_VAR} is not set, using canned commentary"
                    );
                    CommentaryMode::Canned
                }
            },
        };

        if !request.learning {
            warn!("learning disabled, the agent will move at random");
        }

        let capabilities = Self {
            learning: request.learning,
            replay: request.replay,
            commentary,
        };
        info!(?capabilities, "capabilities resolved");
        capabilities
    }

    /// Read the API key from the process environment and resolve
    pub fn from_env(request: &CapabilityRequest) -> Self {
        Self::resolve(request, std::env::var(COMMENTARY_API_KEY_VAR).ok())
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            learning: true,
            replay: ReplayKind::Standard,
            commentary: CommentaryMode::Canned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_without_key_falls_back_to_canned() {
        let request = CapabilityRequest {
            commentary: CommentaryChoice::Remote,
            ..Default::default()
        };

        assert_eq!(
            Capabilities::resolve(&request, None).commentary,
            CommentaryMode::Canned
        );
        assert_eq!(
            Capabilities::resolve(&request, Some("  ".into())).commentary,
            CommentaryMode::Canned
        );
    }

    #[test]
    fn test_remote_with_key() {
        let request = CapabilityRequest {
            commentary: CommentaryChoice::Remote,
            replay: ReplayKind::SumTree,
            learning: false,
        };

        let capabilities = Capabilities::resolve(&request, Some("secret".into()));
        assert_eq!(
            capabilities.commentary,
            CommentaryMode::Remote {
                api_key: "secret".into()
            }
        );
        assert_eq!(capabilities.replay, ReplayKind::SumTree);
        assert!(!capabilities.learning);
    }

    #[test]
    fn test_debug_redacts_key() {
        let mode = CommentaryMode::Remote {
            api_key: "secret".into(),
        };
        assert!(!format!("{mode:?}").contains("secret"));
    }
}
