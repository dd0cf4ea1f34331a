//! Sentence segmentation: OCR lines → sentence candidates with boxes.
//!
//! Strategies:
//!   - local.rs: line passthrough, offline tokenizer
//!   - cloud.rs: model re-splits the joined text, local punctuation fallback

mod cloud;
mod local;

pub use cloud::{parse_sentence_array, proportional_candidates, CloudSegmenter};
pub use local::{lines_as_sentences, split_on_terminators, tokenize, LocalSegmenter};

use crate::config::{Config, SegmentationMode};
use crate::error::Result;
use crate::llm::ChatClient;
use crate::ocr::{OcrLine, Rect, Token};

/// One sentence-to-be, in reading order, with a box for tap-to-select.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceCandidate {
    pub text: String,
    pub bbox: Rect,
    /// Source tokens when the strategy keeps them; empty otherwise.
    pub tokens: Vec<Token>,
}

/// Segment lines into sentences; tokenize a sentence into sub-word units.
///
/// Segmentation never fails: strategies degrade to a local split and the
/// "No text detected" line never produces a candidate.
#[allow(async_fn_in_trait)]
pub trait SentenceSegmenter {
    async fn segment(&self, lines: &[OcrLine]) -> Vec<SentenceCandidate>;
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Strategy selected by `Config::segmentation`.
#[derive(Clone)]
pub enum Segmenter {
    Local(LocalSegmenter),
    Cloud(CloudSegmenter),
}

impl Segmenter {
    /// Cloud mode without a usable OpenAI key falls back to local.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.segmentation {
            SegmentationMode::Cloud if config.is_openai_configured() => {
                let chat = ChatClient::new(config, &config.segmentation_model)?;
                Ok(Segmenter::Cloud(CloudSegmenter::new(chat)))
            }
            SegmentationMode::Cloud => {
                log::warn!("[SEGMENT] Cloud segmentation requested without an OpenAI key, using local");
                Ok(Segmenter::Local(LocalSegmenter::new()))
            }
            SegmentationMode::Local => Ok(Segmenter::Local(LocalSegmenter::new())),
        }
    }
}

impl SentenceSegmenter for Segmenter {
    async fn segment(&self, lines: &[OcrLine]) -> Vec<SentenceCandidate> {
        match self {
            Segmenter::Local(s) => s.segment(lines).await,
            Segmenter::Cloud(s) => s.segment(lines).await,
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        match self {
            Segmenter::Local(s) => s.tokenize(text),
            Segmenter::Cloud(s) => s.tokenize(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_mode_without_key_is_local() {
        let config = Config {
            segmentation: SegmentationMode::Cloud,
            openai_key: None,
            ..Config::default()
        };
        assert!(matches!(Segmenter::from_config(&config).unwrap(), Segmenter::Local(_)));
    }

    #[test]
    fn cloud_mode_with_key_is_cloud() {
        let config = Config {
            segmentation: SegmentationMode::Cloud,
            openai_key: Some("sk-test-0123456789".into()),
            ..Config::default()
        };
        assert!(matches!(Segmenter::from_config(&config).unwrap(), Segmenter::Cloud(_)));
    }
}
