use std::time::Duration;

use futures::{FutureExt, future::BoxFuture};
use reqwest::Client;
use serde_json::{Value, json};

use super::{CommentaryConfig, CommentaryError, CommentaryProvider, CommentaryRequest};

const SYSTEM_PROMPT: &str = "You narrate a small worm that is learning to play a grid game \
    by trial and error. Be witty and brief. Keep responses under 150 characters.";

/// Chat-completions provider
///
/// Speaks the OpenAI-compatible `/chat/completions` protocol and returns the
/// first choice's message content.
pub struct HttpCommentary {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl HttpCommentary {
    pub fn new(config: &CommentaryConfig, api_key: String) -> Result<Self, CommentaryError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn payload(&self, request: &CommentaryRequest) -> Value {
        let status = if request.is_terminal {
            "The worm just died."
        } else {
            "The worm is still alive and playing."
        };
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Situation: {}. Its reasoning was: '{}'. {status} Comment on it.",
                        request.context, request.reasoning
                    ),
                },
            ],
            "max_tokens": self.max_tokens,
        })
    }
}

impl CommentaryProvider for HttpCommentary {
    fn comment<'a>(
        &'a self,
        request: &'a CommentaryRequest,
    ) -> BoxFuture<'a, Result<String, CommentaryError>> {
        async move {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&self.payload(request))
                .send()
                .await?
                .error_for_status()?;
            let value: Value = response.json().await?;
            parse_completion(&value)
        }
        .boxed()
    }
}

/// Extract `choices[0].message.content`, trimmed and non-empty
fn parse_completion(value: &Value) -> Result<String, CommentaryError> {
    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| CommentaryError::MalformedResponse("missing choices[0].message.content".into()))?;

    if content.is_empty() {
        return Err(CommentaryError::MalformedResponse("empty content".into()));
    }
    Ok(content.to_string())
}
