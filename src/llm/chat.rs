//! OpenAI-compatible `chat/completions` client.
//!
//! Two entry points: `complete` for whole-response calls (segmentation,
//! batch translation) and `open_stream` for SSE responses. Neither retries;
//! retry policy belongs to the caller.

use super::types::{ChatCompletion, ChatMessage, ChatRequest};
use crate::config::Config;
use crate::error::{transport_error, truncate, Error, Result};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(config: &Config, model: &str) -> Result<Self> {
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        // No client-wide timeout: it would cap the length of a stream.
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.openai_base_url.trim_end_matches('/')),
            api_key: config.openai_key().map(str::to_string),
            model: model.to_string(),
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Per-request (and, for streams, per-chunk) timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, system: &str, user: String, max_tokens: u32, temperature: f32, stream: bool) -> Result<reqwest::RequestBuilder> {
        let api_key = self.api_key.as_deref().ok_or(Error::NotConfigured("OpenAI"))?;
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens,
            stream,
        };
        Ok(self.http.post(&self.endpoint).bearer_auth(api_key).json(&body))
    }

    /// Whole-response completion. Returns the first choice's content.
    pub async fn complete(&self, system: &str, user: String, max_tokens: u32, temperature: f32) -> Result<String> {
        let start = Instant::now();
        let response = self
            .request(system, user, max_tokens, temperature, false)?
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, "LLM"))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(e, "LLM"))?;
        if !status.is_success() {
            log::error!("[LLM] API returned {}: {}", status, truncate(&body, 200));
            return Err(Error::status(status, &body));
        }
        log::info!("[LLM] {} latency: {}ms", self.model, start.elapsed().as_millis());

        let completion: ChatCompletion = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("chat completion: {}", e)))?;
        if let Some(err) = completion.error.as_ref() {
            return Err(Error::Api(err.message.clone()));
        }
        completion
            .content()
            .map(str::to_string)
            .ok_or_else(|| Error::Parse("chat completion has no message content".to_string()))
    }

    /// Send a streaming request and return the response once headers arrive.
    pub async fn open_stream(&self, system: &str, user: String, max_tokens: u32, temperature: f32) -> Result<reqwest::Response> {
        let start = Instant::now();
        let send = self.request(system, user, max_tokens, temperature, true)?.send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| Error::Timeout("LLM"))?
            .map_err(|e| transport_error(e, "LLM"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("[LLM] API returned {}: {}", status, truncate(&body, 200));
            return Err(Error::status(status, &body));
        }
        log::info!("[LLM] TTFB: {}ms", start.elapsed().as_millis());
        Ok(response)
    }
}
