//! Streaming primitives: SSE line framing and JSON-Lines record decoding.
//!
//! Both buffers are byte/char accurate across arbitrary chunk splits,
//! including splits inside a multi-byte UTF-8 sequence or inside a JSON
//! object.

use super::types::{StreamingProcessedSentence, TranslationRecord};

/// Data payload that terminates a chat-completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates raw response bytes and yields `data:` payloads per line.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Append a chunk and return the payloads of every completed line.
    /// Lines without the `data:` prefix are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Payload of a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim().strip_prefix("data:")?.trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

/// Incremental JSON-Lines decoder mapping records onto an input batch.
///
/// Records are assigned to inputs strictly in arrival order. The index only
/// advances on a successful parse, so a malformed line is skipped without
/// shifting later records.
#[derive(Debug)]
pub struct JsonlDecoder {
    inputs: Vec<String>,
    buffer: String,
    current_line_index: usize,
}

impl JsonlDecoder {
    pub fn new(inputs: Vec<String>) -> Self {
        Self {
            inputs,
            buffer: String::new(),
            current_line_index: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.current_line_index
    }

    pub fn total(&self) -> usize {
        self.inputs.len()
    }

    /// Append a content delta and decode every completed line.
    pub fn push(&mut self, delta: &str) -> Vec<StreamingProcessedSentence> {
        self.buffer.push_str(delta);
        let mut decoded = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(record) = self.decode_line(&line) {
                decoded.push(record);
            }
        }
        decoded
    }

    /// Decode whatever is left in the buffer (a final record without `\n`).
    pub fn finish(&mut self) -> Option<StreamingProcessedSentence> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest)
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamingProcessedSentence> {
        let line = line.trim().trim_end_matches(',').trim();
        if line.is_empty() || line.starts_with("```") {
            return None;
        }

        let record: TranslationRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[LLM] Dropping malformed record ({}): {}", e, crate::error::truncate(line, 120));
                return None;
            }
        };

        let index = self.current_line_index;
        let Some(chinese) = self.inputs.get(index) else {
            log::warn!("[LLM] Extra record beyond {} inputs ignored", self.inputs.len());
            return None;
        };

        self.current_line_index += 1;
        Some(StreamingProcessedSentence {
            chinese: chinese.clone(),
            pinyin: record.syllables(),
            english: record.english,
            index,
        })
    }
}

/// Remove surrounding markdown code fences from a model reply.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn sse_lines_survive_utf8_splits() {
        let raw = "data: {\"x\":\"你好\"}\n\n".as_bytes();
        // Split inside the 3-byte encoding of 你.
        let split = raw.iter().position(|b| *b == 0xE4).unwrap() + 1;
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(&raw[..split]).is_empty());
        assert_eq!(buf.push(&raw[split..]), vec!["{\"x\":\"你好\"}".to_string()]);
    }

    #[test]
    fn sse_skips_non_data_lines() {
        let mut buf = SseLineBuffer::default();
        let out = buf.push(b": keep-alive\nevent: ping\ndata: [DONE]\n");
        assert_eq!(out, vec![DONE_SENTINEL.to_string()]);
        assert_eq!(buf.push(b"data: tail"), Vec::<String>::new());
        assert_eq!(buf.finish().as_deref(), Some("tail"));
    }

    #[test]
    fn jsonl_records_split_across_deltas() {
        let mut d = JsonlDecoder::new(inputs(&["你好", "再见"]));
        assert!(d.push("{\"pinyin\":\"nǐ h").is_empty());
        let first = d.push("ǎo\",\"english\":\"hello\"}\n{\"pinyin\":");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].index, 0);
        assert_eq!(first[0].chinese, "你好");
        assert_eq!(first[0].pinyin, vec!["nǐ", "hǎo"]);
        assert!(d.push("\"zài jiàn\",\"english\":\"goodbye\"}").is_empty());
        let last = d.finish().unwrap();
        assert_eq!((last.index, last.english.as_str()), (1, "goodbye"));
        assert_eq!(d.processed(), 2);
    }

    #[test]
    fn malformed_line_does_not_advance_index() {
        let mut d = JsonlDecoder::new(inputs(&["一", "二"]));
        let out = d.push("not json\n{\"pinyin\":\"yī\",\"english\":\"one\"}\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, 0);
        assert_eq!(out[0].chinese, "一");
    }

    #[test]
    fn records_beyond_inputs_are_ignored() {
        let mut d = JsonlDecoder::new(inputs(&["一"]));
        let out = d.push("{\"pinyin\":\"yī\",\"english\":\"one\"}\n{\"pinyin\":\"èr\",\"english\":\"two\"}\n");
        assert_eq!(out.len(), 1);
        assert_eq!(d.processed(), 1);
    }

    #[test]
    fn fences_and_trailing_commas_tolerated() {
        let mut d = JsonlDecoder::new(inputs(&["一"]));
        let out = d.push("```json\n{\"pinyin\":\"yī\",\"english\":\"one\"},\n```\n");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("```json\n[\"a\"]\n```"), "[\"a\"]");
        assert_eq!(strip_code_fences("  [\"a\"] "), "[\"a\"]");
        assert_eq!(strip_code_fences("```\n[1]```"), "[1]");
    }
}
