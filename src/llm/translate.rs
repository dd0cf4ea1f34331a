//! Streaming translation: one request per batch, one record per sentence.
//!
//! The model is asked for JSON Lines (see `prompts.rs`). Records are
//! decoded as soon as their line completes and handed to the caller in
//! input order. A malformed record is logged and skipped; only transport
//! failures end the stream with an error.

use super::chat::ChatClient;
use super::prompts::{
    build_translation_message, translation_max_tokens, TRANSLATION_SYSTEM_PROMPT,
    TRANSLATION_TEMPERATURE,
};
use super::streaming::{strip_code_fences, JsonlDecoder, SseLineBuffer, DONE_SENTINEL};
use super::types::{ChatChunk, StreamingProcessedSentence, TranslationRecord};
use crate::config::Config;
use crate::document::Script;
use crate::error::{transport_error, Error, Result};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a streaming batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationSummary {
    pub processed: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl TranslationSummary {
    /// Every input received a record.
    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// SSE bytes → content deltas → translation records.
#[derive(Debug)]
pub struct TranslationStreamDecoder {
    sse: SseLineBuffer,
    records: JsonlDecoder,
    done: bool,
}

impl TranslationStreamDecoder {
    pub fn new(inputs: Vec<String>) -> Self {
        Self {
            sse: SseLineBuffer::default(),
            records: JsonlDecoder::new(inputs),
            done: false,
        }
    }

    /// `[DONE]` was seen; no further bytes are read.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn processed(&self) -> usize {
        self.records.processed()
    }

    pub fn total(&self) -> usize {
        self.records.total()
    }

    /// Feed raw response bytes, returning records completed by them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamingProcessedSentence> {
        let payloads = self.sse.push(chunk);
        let mut out = Vec::new();
        for payload in payloads {
            self.handle_payload(&payload, &mut out);
        }
        out
    }

    /// End of stream: flush a trailing event and a final unterminated record.
    pub fn finish(&mut self) -> Vec<StreamingProcessedSentence> {
        let mut out = Vec::new();
        if let Some(payload) = self.sse.finish() {
            self.handle_payload(&payload, &mut out);
        }
        out.extend(self.records.finish());
        out
    }

    fn handle_payload(&mut self, payload: &str, out: &mut Vec<StreamingProcessedSentence>) {
        if self.done {
            return;
        }
        if payload == DONE_SENTINEL {
            self.done = true;
            return;
        }
        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => {
                if let Some(err) = chunk.error.as_ref() {
                    log::warn!("[LLM] Stream reported error: {}", err.message);
                }
                if let Some(delta) = chunk.delta() {
                    out.extend(self.records.push(delta));
                }
            }
            Err(e) => log::warn!("[LLM] Skipping unparseable stream event: {}", e),
        }
    }
}

/// Pinyin + English for batches of Chinese sentences.
#[derive(Clone)]
pub struct TranslationClient {
    chat: ChatClient,
    script: Script,
}

impl TranslationClient {
    pub fn new(config: &Config, script: Script) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(config, &config.chat_model)?,
            script,
        })
    }

    /// Same transport, different target script.
    pub fn with_script(&self, script: Script) -> Self {
        Self {
            chat: self.chat.clone(),
            script,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.chat.is_configured()
    }

    /// Stream translations for `texts`, calling `on_sentence` in input order
    /// as each record is decoded.
    ///
    /// The callback runs on the calling task. Returns how many inputs got a
    /// record; fewer than `texts.len()` is partial success, not an error.
    pub async fn translate_streaming<F>(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
        mut on_sentence: F,
    ) -> Result<TranslationSummary>
    where
        F: FnMut(StreamingProcessedSentence),
    {
        let total = texts.len();
        if total == 0 {
            return Ok(TranslationSummary { processed: 0, total, cancelled: false });
        }
        if !self.is_configured() {
            return Err(Error::NotConfigured("OpenAI"));
        }

        log::info!("[LLM] Streaming {} sentences via {}", total, self.chat.model());
        let start = Instant::now();
        let mut response = self
            .chat
            .open_stream(
                TRANSLATION_SYSTEM_PROMPT,
                build_translation_message(texts, self.script),
                translation_max_tokens(total),
                TRANSLATION_TEMPERATURE,
            )
            .await?;

        let mut decoder = TranslationStreamDecoder::new(texts.to_vec());
        let mut ttft_logged = false;
        let mut cancelled = false;

        while !decoder.is_done() {
            if cancel.is_cancelled() {
                log::info!("[LLM] Stream cancelled after {} records", decoder.processed());
                cancelled = true;
                break;
            }
            let chunk = tokio::time::timeout(self.chat.timeout(), response.chunk())
                .await
                .map_err(|_| Error::Timeout("LLM stream"))?
                .map_err(|e| {
                    log::error!("[LLM] Stream error after {} records: {}", decoder.processed(), e);
                    transport_error(e, "LLM stream")
                })?;
            let Some(chunk) = chunk else { break };

            for record in decoder.feed(&chunk) {
                if !ttft_logged {
                    log::info!("[LLM] First record: {}ms", start.elapsed().as_millis());
                    ttft_logged = true;
                }
                on_sentence(record);
            }
        }

        if !cancelled {
            for record in decoder.finish() {
                on_sentence(record);
            }
        }

        let summary = TranslationSummary {
            processed: decoder.processed(),
            total,
            cancelled,
        };
        log::info!(
            "[LLM] Stream complete: {}/{} records in {}ms",
            summary.processed,
            summary.total,
            start.elapsed().as_millis()
        );
        if !summary.is_complete() && !cancelled {
            log::warn!("[LLM] Partial stream: {} sentences without a record", total - summary.processed);
        }
        Ok(summary)
    }

    /// Run `translate_streaming` on a task and deliver records on a channel.
    ///
    /// The channel closes after the last record on normal completion; a
    /// transport failure arrives as a single final `Err`.
    pub fn spawn_stream(
        &self,
        texts: Vec<String>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<StreamingProcessedSentence>> {
        // One slot per possible record plus the terminal error: sends never block.
        let (tx, rx) = mpsc::channel(texts.len() + 1);
        let client = self.clone();
        tokio::spawn(async move {
            let records = tx.clone();
            let result = client
                .translate_streaming(&texts, &cancel, move |record| {
                    let _ = records.try_send(Ok(record));
                })
                .await;
            if let Err(e) = result {
                let _ = tx.send(Err(e)).await;
            }
        });
        rx
    }

    /// Non-streaming fallback: one request, whole response parsed at once.
    ///
    /// A reply that yields no records for a non-empty batch is an error.
    pub async fn translate_batch(&self, texts: &[String]) -> Result<Vec<StreamingProcessedSentence>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        log::info!("[LLM] Batch translating {} sentences via {}", texts.len(), self.chat.model());
        let content = self
            .chat
            .complete(
                TRANSLATION_SYSTEM_PROMPT,
                build_translation_message(texts, self.script),
                translation_max_tokens(texts.len()),
                TRANSLATION_TEMPERATURE,
            )
            .await?;

        let records = decode_batch_content(texts, &content);
        if records.is_empty() {
            return Err(Error::Parse(format!(
                "no translation records in reply: {}",
                crate::error::truncate(&content, 120)
            )));
        }
        log::info!("[LLM] Batch returned {}/{} records", records.len(), texts.len());
        Ok(records)
    }
}

/// Decode a whole reply: JSON Lines first, then a JSON array of records.
fn decode_batch_content(texts: &[String], content: &str) -> Vec<StreamingProcessedSentence> {
    let mut decoder = JsonlDecoder::new(texts.to_vec());
    let mut records = decoder.push(content);
    records.extend(decoder.finish());
    if !records.is_empty() {
        return records;
    }

    match serde_json::from_str::<Vec<TranslationRecord>>(&strip_code_fences(content)) {
        Ok(array) => array
            .into_iter()
            .zip(texts)
            .enumerate()
            .map(|(index, (record, text))| StreamingProcessedSentence {
                chinese: text.clone(),
                pinyin: record.syllables(),
                english: record.english,
                index,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}
