use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use super::{
    CannedCommentary, Commentary, CommentaryConfig, CommentaryError, CommentaryProvider,
    CommentaryRequest, CommentarySource,
};

/// Rate-limited, time-bounded front end to a [`CommentaryProvider`]
///
/// Owns a current-thread tokio runtime and drives each provider call on it
/// under [`tokio::time::timeout`], so `comment` returns within the bound no
/// matter what the provider does. Must not be called from inside another
/// tokio runtime.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use worm_dqn::commentary::{CannedCommentary, Commentator, CommentaryRequest};
///
/// let mut commentator =
///     Commentator::new(Box::new(CannedCommentary), 30, Duration::from_millis(100)).unwrap();
/// let request = CommentaryRequest {
///     context: "score 0".into(),
///     reasoning: "Reasoning: Exploring".into(),
///     is_terminal: true,
/// };
/// let line = commentator.comment(&request);
/// assert!(!line.text.is_empty());
/// ```
pub struct Commentator {
    provider: Box<dyn CommentaryProvider>,
    runtime: Option<Runtime>,
    interval: u32,
    timeout: Duration,
    /// Events since the last provider call
    events: u32,
    last: String,
    rng: StdRng,
}

impl Commentator {
    pub fn new(
        provider: Box<dyn CommentaryProvider>,
        interval: u32,
        timeout: Duration,
    ) -> Result<Self, CommentaryError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let mut rng = StdRng::from_entropy();
        let last = CannedCommentary::pick(false, &mut rng).to_string();

        Ok(Self {
            provider,
            runtime: Some(runtime),
            interval: interval.max(1),
            timeout,
            events: 0,
            last,
            rng,
        })
    }

    /// Build from settings
    pub fn from_config(
        provider: Box<dyn CommentaryProvider>,
        config: &CommentaryConfig,
    ) -> Result<Self, CommentaryError> {
        Self::new(provider, config.interval, Duration::from_millis(config.timeout_ms))
    }

    /// Commentary for one event
    ///
    /// The provider is consulted on every `interval`-th event and on every
    /// terminal event; in between the last line is repeated. A provider error
    /// or timeout yields a canned line and leaves the cached line alone.
    pub fn comment(&mut self, request: &CommentaryRequest) -> Commentary {
        self.events += 1;
        if !request.is_terminal && self.events % self.interval != 0 {
            return Commentary {
                text: self.last.clone(),
                source: CommentarySource::Cached,
            };
        }
        self.events = 0;

        let Some(runtime) = self.runtime.as_ref() else {
            return self.fallback(request);
        };

        // The timer must be created inside the runtime or it has no reactor
        let call = self.provider.comment(request);
        let bound = self.timeout;
        match runtime.block_on(async move { tokio::time::timeout(bound, call).await }) {
            Ok(Ok(text)) => {
                debug!(%text, "commentary received");
                self.last.clone_from(&text);
                Commentary {
                    text,
                    source: CommentarySource::Provider,
                }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "commentary provider failed, using canned line");
                self.fallback(request)
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "commentary provider timed out, using canned line"
                );
                self.fallback(request)
            }
        }
    }

    /// Last line handed out by the provider (or the initial canned line)
    pub fn last(&self) -> &str {
        &self.last
    }

    fn fallback(&mut self, request: &CommentaryRequest) -> Commentary {
        Commentary {
            text: CannedCommentary::pick(request.is_terminal, &mut self.rng).to_string(),
            source: CommentarySource::Fallback,
        }
    }
}

impl Drop for Commentator {
    fn drop(&mut self) {
        // Abandon in-flight connection tasks instead of waiting on them
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
