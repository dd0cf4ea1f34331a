//! Document aggregate: a capture and the sentences extracted from it.
//!
//! A Document owns its sentences exclusively and is persisted whole.
//! Sentences are created once (segmentation or video dedup) and then
//! mutated in place as translations stream in.

use crate::ocr::{Rect, Token};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// English placeholder shown while a translation request is in flight.
pub const GENERATING: &str = "Generating...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSource {
    Camera,
    Photos,
    Imported,
    ShareExtension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Script {
    #[default]
    Simplified,
    Traditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SentenceStatus {
    #[default]
    Pending,
    Translated,
}

/// One sighting of a sentence's text in a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameAppearance {
    /// Seconds into the video.
    pub timestamp: f64,
    pub bbox: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub pinyin: Vec<String>,
    pub english: Option<String>,
    pub range_in_image: Option<Rect>,
    pub frame_appearances: Option<Vec<FrameAppearance>>,
    /// OCR geometry the sentence was built from.
    #[serde(default)]
    pub tokens: Vec<Token>,
    /// Word-level split of `text`, used for per-word lookup.
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub status: SentenceStatus,
    #[serde(default)]
    pub is_saved: bool,
}

impl Sentence {
    /// A still-image sentence awaiting translation.
    pub fn new(text: impl Into<String>, range_in_image: Option<Rect>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            pinyin: Vec::new(),
            english: None,
            range_in_image,
            frame_appearances: None,
            tokens: Vec::new(),
            words: Vec::new(),
            status: SentenceStatus::Pending,
            is_saved: false,
        }
    }

    /// A video sentence carrying every frame where its text appeared.
    pub fn from_appearances(text: impl Into<String>, mut appearances: Vec<FrameAppearance>) -> Self {
        appearances.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self {
            frame_appearances: Some(appearances),
            ..Self::new(text, None)
        }
    }

    pub fn is_translated(&self) -> bool {
        self.status == SentenceStatus::Translated
    }

    /// Show the in-flight placeholder unless a translation already exists.
    pub fn mark_generating(&mut self) {
        if !self.is_translated() {
            self.english = Some(GENERATING.to_string());
        }
    }

    /// Drop the placeholder if no translation arrived.
    pub fn clear_generating(&mut self) {
        if !self.is_translated() && self.english.as_deref() == Some(GENERATING) {
            self.english = None;
        }
    }

    pub fn apply_translation(&mut self, pinyin: Vec<String>, english: String) {
        self.pinyin = pinyin;
        self.english = Some(english);
        self.status = SentenceStatus::Translated;
    }

    /// First appearance timestamp, or 0 for still images.
    pub fn first_seen(&self) -> f64 {
        self.frame_appearances
            .as_ref()
            .and_then(|a| a.first())
            .map(|a| a.timestamp)
            .unwrap_or(0.0)
    }

    /// The appearance closest in time to `timestamp`.
    pub fn appearance_near(&self, timestamp: f64) -> Option<&FrameAppearance> {
        self.frame_appearances.as_ref()?.iter().min_by(|a, b| {
            (a.timestamp - timestamp)
                .abs()
                .total_cmp(&(b.timestamp - timestamp).abs())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub source: DocumentSource,
    pub script: Script,
    pub sentences: Vec<Sentence>,
    pub media_path: Option<PathBuf>,
    pub thumbnail_path: Option<PathBuf>,
    pub is_video: bool,
    #[serde(default)]
    pub is_saved: bool,
    pub custom_name: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: u64,
}

impl Document {
    pub fn new(source: DocumentSource, script: Script, is_video: bool, sentences: Vec<Sentence>) -> Self {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            source,
            script,
            sentences,
            media_path: None,
            thumbnail_path: None,
            is_video,
            is_saved: false,
            custom_name: None,
            created_at,
        }
    }

    pub fn translated_count(&self) -> usize {
        self.sentences.iter().filter(|s| s.is_translated()).count()
    }

    /// Indices of sentences still waiting for a translation.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_translated())
            .map(|(i, _)| i)
            .collect()
    }

    /// Custom name, else the first sentence, else a generic label.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.custom_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match self.sentences.first() {
            Some(s) => s.text.chars().take(20).collect(),
            None if self.is_video => "Video".to_string(),
            None => "Image".to_string(),
        }
    }

    /// Sentences visible in a video at `timestamp`, within `tolerance` seconds.
    pub fn sentences_at(&self, timestamp: f64, tolerance: f64) -> Vec<(&Sentence, Rect)> {
        self.sentences
            .iter()
            .filter_map(|s| {
                let a = s.appearance_near(timestamp)?;
                ((a.timestamp - timestamp).abs() <= tolerance).then_some((s, a.bbox))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appearance(t: f64) -> FrameAppearance {
        FrameAppearance { timestamp: t, bbox: Rect::new(0.0, t, 10.0, t + 1.0) }
    }

    #[test]
    fn appearances_are_sorted_and_searchable() {
        let s = Sentence::from_appearances("你好", vec![appearance(1.0), appearance(0.0), appearance(0.2)]);
        let times: Vec<f64> = s.frame_appearances.as_ref().unwrap().iter().map(|a| a.timestamp).collect();
        assert_eq!(times, vec![0.0, 0.2, 1.0]);
        assert_eq!(s.appearance_near(0.7).unwrap().timestamp, 1.0);
        assert_eq!(s.first_seen(), 0.0);
    }

    #[test]
    fn generating_placeholder_lifecycle() {
        let mut s = Sentence::new("再见", None);
        s.mark_generating();
        assert_eq!(s.english.as_deref(), Some(GENERATING));
        s.clear_generating();
        assert_eq!(s.english, None);

        s.mark_generating();
        s.apply_translation(vec!["zài".into(), "jiàn".into()], "goodbye".into());
        s.clear_generating();
        assert_eq!(s.english.as_deref(), Some("goodbye"));
        assert!(s.is_translated());
    }

    #[test]
    fn document_counts_and_names() {
        let mut doc = Document::new(
            DocumentSource::Camera,
            Script::Simplified,
            false,
            vec![Sentence::new("今天天气很好", None), Sentence::new("是的", None)],
        );
        doc.sentences[1].apply_translation(vec!["shì".into(), "de".into()], "yes".into());
        assert_eq!(doc.translated_count(), 1);
        assert_eq!(doc.pending_indices(), vec![0]);
        assert_eq!(doc.display_name(), "今天天气很好");
        doc.custom_name = Some("Menu".into());
        assert_eq!(doc.display_name(), "Menu");
    }

    #[test]
    fn sentences_at_respects_tolerance() {
        let doc = Document::new(
            DocumentSource::Imported,
            Script::Simplified,
            true,
            vec![Sentence::from_appearances("你好", vec![appearance(2.0)])],
        );
        assert_eq!(doc.sentences_at(2.1, 0.25).len(), 1);
        assert!(doc.sentences_at(3.0, 0.25).is_empty());
    }
}
