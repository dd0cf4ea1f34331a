//! LLM domain: streaming translation and cloud segmentation support.
//!
//! External code should only use the items exported here.
//!
//! Client:
//!   - chat.rs:      OpenAI-compatible chat/completions transport
//!   - translate.rs: batch translation, streamed record by record
//!
//! Shared:
//!   - streaming.rs: SSE framing + JSON-Lines record decoding
//!   - prompts.rs:   system prompts, user message builders, token budgets
//!   - types.rs:     wire types and decoded records

pub mod chat;
pub mod prompts;
pub mod streaming;
mod translate;
pub mod types;

pub use chat::ChatClient;
pub use streaming::{strip_code_fences, JsonlDecoder, SseLineBuffer, DONE_SENTINEL};
pub use translate::{TranslationClient, TranslationStreamDecoder, TranslationSummary};
pub use types::StreamingProcessedSentence;
