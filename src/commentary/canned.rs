use futures::{FutureExt, future::BoxFuture};
use rand::{Rng, RngCore};

use super::{CommentaryError, CommentaryProvider, CommentaryRequest};

const ALIVE_LINES: &[&str] = &[
    "Another lap around the grid. The food is not going anywhere.",
    "Steady progress. Mostly steady.",
    "The worm is thinking very hard about that red square.",
    "Left, right, left. A bold strategy.",
    "Somewhere in there a Q-value just got slightly better.",
    "Still exploring. Or possibly lost.",
    "The grid is small but the ambition is large.",
    "Every step is a data point.",
];

const TERMINAL_LINES: &[&str] = &[
    "And that's a wall. Back to the centre we go.",
    "Episode over. The replay buffer will remember this one.",
    "A learning experience, in the most literal sense.",
    "Reset. Try not to do that again.",
];

/// Fixed pool of offline commentary lines
///
/// Used both as a provider in its own right and as the fallback for any
/// provider that fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedCommentary;

impl CannedCommentary {
    /// Pick a line suited to the request
    pub fn pick(is_terminal: bool, rng: &mut dyn RngCore) -> &'static str {
        let pool = if is_terminal { TERMINAL_LINES } else { ALIVE_LINES };
        pool[rng.gen_range(0..pool.len())]
    }

    /// Whether `text` is one of the canned lines
    pub fn contains(text: &str) -> bool {
        ALIVE_LINES.contains(&text) || TERMINAL_LINES.contains(&text)
    }
}

impl CommentaryProvider for CannedCommentary {
    fn comment<'a>(
        &'a self,
        request: &'a CommentaryRequest,
    ) -> BoxFuture<'a, Result<String, CommentaryError>> {
        let line = Self::pick(request.is_terminal, &mut rand::thread_rng());
        futures::future::ready(Ok(line.to_string())).boxed()
    }
}
