//! Capture-to-document orchestration.
//!
//! - process_image: OCR → line reconstruction → segmentation → Document
//! - process_video: frame sampling → per-frame OCR → dedup → Document
//! - translate_document: stream pinyin + English into pending sentences,
//!   falling back to one batch request when the stream fails outright
//! - save_document / persist_media: hand-off to the storage collaborators

use crate::config::Config;
use crate::document::{Document, DocumentSource, Script, Sentence};
use crate::error::{Error, Result};
use crate::llm::{TranslationClient, TranslationSummary};
use crate::ocr::VisionClient;
use crate::segment::{Segmenter, SentenceSegmenter};
use crate::store::{DocumentStore, MediaStore};
use crate::video::{FrameSource, VideoSampler, VideoScan};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Share of a video's progress bar spent on frame extraction; translation
/// gets the rest.
pub const VIDEO_EXTRACTION_SHARE: f64 = 0.3;

/// Map a translation fraction onto the document's whole progress bar.
///
/// Video documents already spent `VIDEO_EXTRACTION_SHARE` on extraction,
/// so translation fills the remainder; images translate over 0.0..=1.0.
pub fn translation_progress(is_video: bool, fraction: f64) -> f64 {
    if is_video {
        VIDEO_EXTRACTION_SHARE + fraction * (1.0 - VIDEO_EXTRACTION_SHARE)
    } else {
        fraction
    }
}

/// Longest edge of saved thumbnails, in pixels.
pub const THUMBNAIL_SIZE: u32 = 320;

pub struct Pipeline {
    config: Config,
    vision: VisionClient,
    translator: TranslationClient,
    segmenter: Segmenter,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            vision: VisionClient::new(&config)?,
            translator: TranslationClient::new(&config, Script::default())?,
            segmenter: Segmenter::from_config(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Still image → document with one sentence per segmented candidate.
    ///
    /// An image without text yields a document with no sentences.
    pub async fn process_image(&self, bytes: &[u8], source: DocumentSource, script: Script) -> Result<Document> {
        if !self.vision.is_configured() {
            return Err(Error::NotConfigured("Google Cloud Vision"));
        }
        let start = Instant::now();
        let lines = self.vision.recognize_image(bytes).await?;
        let candidates = self.segmenter.segment(&lines).await;

        let sentences: Vec<Sentence> = candidates
            .into_iter()
            .map(|c| {
                let mut sentence = Sentence::new(c.text, Some(c.bbox));
                sentence.words = self.segmenter.tokenize(&sentence.text);
                sentence.tokens = c.tokens;
                sentence
            })
            .collect();
        log::info!(
            "[PIPELINE] Image: {} lines → {} sentences in {}ms",
            lines.len(),
            sentences.len(),
            start.elapsed().as_millis()
        );
        Ok(Document::new(source, script, false, sentences))
    }

    /// Video → document of deduplicated sentences with frame appearances.
    ///
    /// `progress` receives 0.0..=`VIDEO_EXTRACTION_SHARE`. Returns `None`
    /// when cancelled.
    pub async fn process_video<S, P>(
        &self,
        frames: &S,
        source: DocumentSource,
        script: Script,
        cancel: &CancellationToken,
        mut progress: P,
    ) -> Result<Option<Document>>
    where
        S: FrameSource,
        P: FnMut(f64),
    {
        if !self.vision.is_configured() {
            return Err(Error::NotConfigured("Google Cloud Vision"));
        }
        let sampler = VideoSampler::new(&self.vision, self.config.video);
        let scan = sampler
            .scan(frames, cancel, |fraction| progress(fraction * VIDEO_EXTRACTION_SHARE))
            .await?;

        match scan {
            VideoScan::Cancelled => {
                log::info!("[PIPELINE] Video processing cancelled");
                Ok(None)
            }
            VideoScan::Completed(mut sentences) => {
                for sentence in &mut sentences {
                    sentence.words = self.segmenter.tokenize(&sentence.text);
                }
                Ok(Some(Document::new(source, script, true, sentences)))
            }
        }
    }

    /// Translate every pending sentence of `document` in place.
    ///
    /// Pending sentences show `"Generating..."` while the request runs and
    /// revert to no English if nothing arrived for them. `progress` receives
    /// the fraction of pending sentences translated so far, mapped through
    /// `translation_progress` so a video continues where extraction stopped.
    pub async fn translate_document<P>(
        &self,
        document: &mut Document,
        cancel: &CancellationToken,
        mut progress: P,
    ) -> Result<TranslationSummary>
    where
        P: FnMut(f64),
    {
        let pending = document.pending_indices();
        let total = pending.len();
        if total == 0 {
            return Ok(TranslationSummary { processed: 0, total, cancelled: false });
        }
        if !self.translator.is_configured() {
            return Err(Error::NotConfigured("OpenAI"));
        }

        let is_video = document.is_video;
        let translator = self.translator.with_script(document.script);
        let texts: Vec<String> = pending.iter().map(|&i| document.sentences[i].text.clone()).collect();
        for &i in &pending {
            document.sentences[i].mark_generating();
        }

        let mut applied = 0usize;
        let streamed = {
            let sentences = &mut document.sentences;
            translator
                .translate_streaming(&texts, cancel, |record| {
                    let Some(&i) = pending.get(record.index) else { return };
                    let Some(sentence) = sentences.get_mut(i) else { return };
                    if sentence.text != record.chinese {
                        log::warn!("[PIPELINE] Record {} does not match its sentence, skipped", record.index);
                        return;
                    }
                    sentence.apply_translation(record.pinyin, record.english);
                    applied += 1;
                    progress(translation_progress(is_video, applied as f64 / total as f64));
                })
                .await
        };

        let result = match streamed {
            Ok(summary) => Ok(summary),
            Err(e) if e.is_configuration() => Err(e),
            Err(e) => {
                log::warn!("[PIPELINE] Streaming failed after {} records ({}), falling back to batch", applied, e);
                self.translate_remaining(&translator, document, &pending).await.map(|batch| {
                    applied += batch;
                    progress(translation_progress(is_video, applied as f64 / total as f64));
                    TranslationSummary { processed: applied, total, cancelled: false }
                })
            }
        };

        for &i in &pending {
            document.sentences[i].clear_generating();
        }
        if let Ok(summary) = &result {
            log::info!("[PIPELINE] Translated {}/{} sentences", summary.processed, summary.total);
        }
        result
    }

    /// Batch-translate the pending sentences the stream did not reach.
    async fn translate_remaining(
        &self,
        translator: &TranslationClient,
        document: &mut Document,
        pending: &[usize],
    ) -> Result<usize> {
        let remaining: Vec<usize> = pending
            .iter()
            .copied()
            .filter(|&i| !document.sentences[i].is_translated())
            .collect();
        if remaining.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = remaining.iter().map(|&i| document.sentences[i].text.clone()).collect();
        let records = translator.translate_batch(&texts).await?;

        let mut applied = 0;
        for record in records {
            if let Some(&i) = remaining.get(record.index) {
                document.sentences[i].apply_translation(record.pinyin, record.english);
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Persist the whole document and mark it saved.
    pub fn save_document<D: DocumentStore>(&self, store: &D, document: &mut Document) -> Result<()> {
        document.is_saved = true;
        if let Err(e) = store.save(document) {
            document.is_saved = false;
            log::error!("[PIPELINE] Failed to save document {}: {}", document.id, e);
            return Err(e);
        }
        log::info!("[PIPELINE] Saved document {} ({} sentences)", document.id, document.sentences.len());
        Ok(())
    }

    /// Store the captured media and a thumbnail, recording both paths.
    ///
    /// Still images use the media bytes for the thumbnail; videos need a
    /// `poster` frame, and get no thumbnail without one.
    pub fn persist_media<M: MediaStore>(
        &self,
        store: &M,
        document: &mut Document,
        media: &[u8],
        poster: Option<&[u8]>,
    ) -> Result<()> {
        document.media_path = Some(store.save_media(media, document.id, document.is_video)?);

        let poster = match poster {
            Some(p) => Some(p),
            None if !document.is_video => Some(media),
            None => None,
        };
        if let Some(bytes) = poster {
            let image = image::load_from_memory(bytes)?;
            let thumbnail = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
            document.thumbnail_path = Some(store.save_thumbnail(&thumbnail, document.id)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_translation_continues_after_extraction() {
        assert_eq!(translation_progress(true, 0.0), VIDEO_EXTRACTION_SHARE);
        assert!((translation_progress(true, 1.0) - 1.0).abs() < 1e-9);
        assert!((translation_progress(true, 0.5) - 0.65).abs() < 1e-9);
        assert_eq!(translation_progress(false, 0.5), 0.5);
    }
}
