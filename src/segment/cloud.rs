//! Cloud-assisted segmentation: the model re-splits the joined OCR text.
//!
//! Sentence boxes are approximate: the lines' overall vertical span is
//! divided evenly by sentence index. On any request or parse failure the
//! lines are split locally on sentence punctuation instead.

use super::local::{split_on_terminators, tokenize};
use super::{SentenceCandidate, SentenceSegmenter};
use crate::error::{Error, Result};
use crate::llm::prompts::{
    build_segmentation_message, segmentation_max_tokens, SEGMENTATION_SYSTEM_PROMPT,
    SEGMENTATION_TEMPERATURE,
};
use crate::llm::{strip_code_fences, ChatClient};
use crate::ocr::{OcrLine, Rect};

#[derive(Clone)]
pub struct CloudSegmenter {
    chat: ChatClient,
}

impl CloudSegmenter {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    pub fn is_configured(&self) -> bool {
        self.chat.is_configured()
    }

    async fn request_sentences(&self, text: &str) -> Result<Vec<String>> {
        let content = self
            .chat
            .complete(
                SEGMENTATION_SYSTEM_PROMPT,
                build_segmentation_message(text),
                segmentation_max_tokens(text.chars().count()),
                SEGMENTATION_TEMPERATURE,
            )
            .await?;
        parse_sentence_array(&content)
    }
}

impl SentenceSegmenter for CloudSegmenter {
    async fn segment(&self, lines: &[OcrLine]) -> Vec<SentenceCandidate> {
        let lines: Vec<&OcrLine> = lines
            .iter()
            .filter(|l| !l.is_no_text() && !l.text.trim().is_empty())
            .collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let joined = lines.iter().map(|l| l.text.trim()).collect::<Vec<_>>().join("\n");
        match self.request_sentences(&joined).await {
            Ok(sentences) if !sentences.is_empty() => {
                log::info!("[SEGMENT] Model split {} lines into {} sentences", lines.len(), sentences.len());
                let span = Rect::enclosing(lines.iter().map(|l| &l.bbox)).unwrap_or_default();
                proportional_candidates(sentences, span)
            }
            Ok(_) => {
                log::warn!("[SEGMENT] Model returned no sentences, splitting locally");
                punctuation_fallback(&lines)
            }
            Err(e) => {
                log::warn!("[SEGMENT] Cloud segmentation failed ({}), splitting locally", e);
                punctuation_fallback(&lines)
            }
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}

/// Parse the reply as a JSON array of strings; blank entries are dropped.
pub fn parse_sentence_array(content: &str) -> Result<Vec<String>> {
    let sentences: Vec<String> = serde_json::from_str(&strip_code_fences(content))
        .map_err(|e| Error::Parse(format!("segmentation reply: {}", e)))?;
    Ok(sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Sentence `i` of `n` gets the `i`-th horizontal band of `span`.
pub fn proportional_candidates(sentences: Vec<String>, span: Rect) -> Vec<SentenceCandidate> {
    let n = sentences.len().max(1) as f64;
    let band = span.height() / n;
    sentences
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let top = span.min_y + band * i as f64;
            SentenceCandidate {
                text,
                bbox: Rect::new(span.min_x, top, span.max_x, top + band),
                tokens: Vec::new(),
            }
        })
        .collect()
}

/// Split each line on `。！？`; every fragment keeps its line's box.
fn punctuation_fallback(lines: &[&OcrLine]) -> Vec<SentenceCandidate> {
    lines
        .iter()
        .flat_map(|line| {
            split_on_terminators(&line.text)
                .into_iter()
                .map(move |text| SentenceCandidate {
                    text,
                    bbox: line.bbox,
                    tokens: Vec::new(),
                })
        })
        .collect()
}
