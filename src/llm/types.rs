//! Chat-completion wire types and decoded translation records.
//!
//! Requests serialize straight into the OpenAI-compatible body; responses
//! deserialize into narrow typed views with every field optional, so an
//! unexpected shape is a `None` rather than a panic.

use serde::{Deserialize, Serialize};

/// One decoded translation, correlated to its input by `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingProcessedSentence {
    /// The input text at `index`.
    pub chinese: String,
    pub pinyin: Vec<String>,
    pub english: String,
    pub index: usize,
}

/// The per-line JSON object the model is instructed to emit.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationRecord {
    pub pinyin: String,
    pub english: String,
}

impl TranslationRecord {
    /// Split pinyin on whitespace into syllables.
    pub fn syllables(&self) -> Vec<String> {
        self.pinyin.split_whitespace().map(str::to_string).collect()
    }
}

// ── Request ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

// ── Response ────────────────────────────────────────────────────────

/// Non-streaming `chat/completions` response.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionChoice {
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
}

impl ChatCompletion {
    pub fn content(&self) -> Option<&str> {
        self.choices.first()?.message.as_ref()?.content.as_deref()
    }
}

/// One `data:` payload of a streaming response.
#[derive(Debug, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

impl ChatChunk {
    pub fn delta(&self) -> Option<&str> {
        self.choices.first()?.delta.as_ref()?.content.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
}
