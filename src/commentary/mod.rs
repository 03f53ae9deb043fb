//! Flavor commentary on the agent's progress
//!
//! A [`CommentaryProvider`] produces one line of text per request. Providers
//! may be remote and slow, so the tick loop never calls them directly: the
//! [`Commentator`] rate-limits requests, bounds each call with a timeout and
//! substitutes a canned line whenever the provider fails or stalls.

mod canned;
mod commentator;
mod http;

pub use canned::CannedCommentary;
pub use commentator::Commentator;
pub use http::HttpCommentary;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the provider is asked to comment on
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryRequest {
    /// Short description of the game situation
    pub context: String,

    /// The agent's last justification string
    pub reasoning: String,

    /// The episode just ended
    pub is_terminal: bool,
}

/// Where a line of commentary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentarySource {
    /// Fresh answer from the provider
    Provider,
    /// Canned line substituted for a failed or stalled provider
    Fallback,
    /// Last line repeated between rate-limited calls
    Cached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commentary {
    pub text: String,
    pub source: CommentarySource,
}

#[derive(Debug, Error)]
pub enum CommentaryError {
    #[error("commentary request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed commentary response: {0}")]
    MalformedResponse(String),

    #[error("commentary runtime unavailable: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Source of commentary text
pub trait CommentaryProvider: Send + Sync {
    fn comment<'a>(
        &'a self,
        request: &'a CommentaryRequest,
    ) -> BoxFuture<'a, Result<String, CommentaryError>>;
}

/// Commentary settings shared by the CLI and the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentaryConfig {
    /// Provider is consulted once every `interval` events, and on every
    /// terminal event
    pub interval: u32,

    /// Upper bound on a single provider call
    pub timeout_ms: u64,

    /// OpenAI-compatible chat-completions endpoint
    pub endpoint: String,

    pub model: String,

    pub max_tokens: u32,
}

impl CommentaryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval == 0 {
            return Err("commentary interval must be at least 1".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("commentary timeout_ms must be at least 1".to_string());
        }
        if self.endpoint.is_empty() {
            return Err("commentary endpoint must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            interval: 30,
            timeout_ms: 5_000,
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            max_tokens: 150,
        }
    }
}
