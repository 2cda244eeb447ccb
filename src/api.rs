//! Chat-completion API client with optional exponential backoff.
//!
//! # Architecture
//!
//! - [`Completion`]: core trait, one prompt in, the model's text out
//! - [`ChatClient`]: OpenAI-compatible `/chat/completions` client over `reqwest`
//! - [`Retrying`]: decorator that retries any [`Completion`] with backoff
//!
//! # Retry Strategy
//!
//! Retrying is off by default (`max_retries = 0`). When enabled the delay
//! between attempts is
//! ```text
//! delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..=250ms)
//! ```

use crate::config::CompletionConfig;
use crate::error::CompletionError;
use crate::utils::{char_len, truncate_for_log};
use rand::{Rng, rng};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Something that turns a prompt into generated text.
pub trait Completion {
    /// Send a single user-role prompt and return the first choice's content.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct ChatClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ChatClient {
    /// Create a client for the configured completion endpoint.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint URL, API key, model and sampling settings
    ///
    /// # Returns
    ///
    /// The client, or an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

impl Completion for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        info!(prompt_chars = char_len(prompt), "Requesting completion");
        let t0 = Instant::now();

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if status != StatusCode::OK {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let content = extract_content(&body)?;
        info!(elapsed_ms, reply_chars = char_len(&content), "Completion succeeded");
        Ok(content)
    }
}

/// Pull `choices[0].message.content` out of a completion response body.
fn extract_content(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        CompletionError::Shape(format!("{e}; body: {}", truncate_for_log(body, 300)))
    })?;

    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
        CompletionError::Shape(format!("no choices in response: {}", truncate_for_log(body, 300)))
    })?;
    choice.message.content.ok_or_else(|| {
        CompletionError::Shape(format!(
            "first choice has no message content: {}",
            truncate_for_log(body, 300)
        ))
    })
}

/// Wrapper that adds exponential backoff retry logic to any [`Completion`].
pub struct Retrying<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> Retrying<T>
where
    T: Completion,
{
    /// Wrap `inner` so failed calls are retried up to `max_retries` times,
    /// starting at `base_delay` and doubling.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for Retrying<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Completion for Retrying<T>
where
    T: Completion,
{
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_total = total_t0.elapsed().as_millis() as u64;

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total,
                                error = %e,
                                "complete() exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let mut delay = self
                        .base_delay
                        .saturating_mul(1u32 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "complete() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Run a completion, logging the outcome with the caller's purpose attached.
pub async fn complete_logged<C: Completion>(
    client: &C,
    purpose: &'static str,
    prompt: &str,
) -> Result<String, CompletionError> {
    let res = client.complete(prompt).await;
    match &res {
        Ok(text) => debug!(purpose, reply = %truncate_for_log(text, 200), "Completion reply"),
        Err(e) => error!(purpose, error = %e, "Completion failed"),
    }
    res
}
