//! Frame sampling and text deduplication across frames.
//!
//! Frames are taken at a fixed interval up to a cap, OCR'd in chunks
//! (concurrent within a chunk, chunks in sequence), and every distinct
//! line text becomes one sentence carrying all of its appearances.

use super::frames::FrameSource;
use crate::config::{SamplerSettings, FRAME_INTERVAL_SECS};
use crate::document::{FrameAppearance, Sentence};
use crate::error::Result;
use crate::ocr::{OcrLine, TextRecognizer};
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of a scan. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoScan {
    Completed(Vec<Sentence>),
    Cancelled,
}

/// Shared state mutated by the frames of a chunk.
#[derive(Default)]
struct ScanState {
    /// Sentence identity is the exact line text.
    appearances: Mutex<HashMap<String, Vec<FrameAppearance>>>,
    /// SHA-256 of frame bytes → lines, so repeated frames skip the OCR call.
    ocr_cache: Mutex<HashMap<String, Vec<OcrLine>>>,
    frames_processed: Mutex<usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct VideoSampler<R> {
    recognizer: R,
    settings: SamplerSettings,
}

impl<R: TextRecognizer> VideoSampler<R> {
    pub fn new(recognizer: R, settings: SamplerSettings) -> Self {
        Self { recognizer, settings }
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    fn interval(&self) -> f64 {
        let i = self.settings.interval_secs;
        if i.is_finite() && i > 0.0 {
            i
        } else {
            FRAME_INTERVAL_SECS
        }
    }

    /// `min(ceil(duration / interval), max_frames)`.
    pub fn frame_count(&self, duration: f64) -> usize {
        if !duration.is_finite() || duration <= 0.0 {
            return 0;
        }
        let wanted = (duration / self.interval()).ceil();
        (wanted as usize).min(self.settings.max_frames)
    }

    pub fn timestamps(&self, duration: f64) -> Vec<f64> {
        let interval = self.interval();
        (0..self.frame_count(duration)).map(|i| i as f64 * interval).collect()
    }

    /// Sample, OCR and deduplicate a whole video.
    ///
    /// `progress` receives the fraction of chunks done (0.0..=1.0) after
    /// each chunk. Cancellation is checked before every chunk.
    pub async fn scan<S, P>(&self, source: &S, cancel: &CancellationToken, mut progress: P) -> Result<VideoScan>
    where
        S: FrameSource,
        P: FnMut(f64),
    {
        let start = Instant::now();
        let duration = source.duration().await?;
        let timestamps = self.timestamps(duration);
        let chunk_size = self.settings.chunk_size.max(1);
        let chunk_total = timestamps.len().div_ceil(chunk_size);
        log::info!(
            "[VIDEO] {:.1}s video: {} frames in {} chunks",
            duration,
            timestamps.len(),
            chunk_total
        );

        let state = ScanState::default();
        for (chunk_index, chunk) in timestamps.chunks(chunk_size).enumerate() {
            if cancel.is_cancelled() {
                log::info!("[VIDEO] Cancelled before chunk {}/{}", chunk_index + 1, chunk_total);
                return Ok(VideoScan::Cancelled);
            }
            join_all(chunk.iter().map(|&t| self.process_frame(source, t, &state))).await;
            progress((chunk_index + 1) as f64 / chunk_total as f64);
        }

        let sentences = into_sentences(std::mem::take(&mut *lock(&state.appearances)));
        log::info!(
            "[VIDEO] {} frames OCR'd, {} distinct sentences in {}ms",
            *lock(&state.frames_processed),
            sentences.len(),
            start.elapsed().as_millis()
        );
        Ok(VideoScan::Completed(sentences))
    }

    /// One frame: extract, OCR (or reuse a cached result), record lines.
    /// Failures are logged and swallowed.
    async fn process_frame<S: FrameSource>(&self, source: &S, timestamp: f64, state: &ScanState) {
        let bytes = match source.frame_at(timestamp).await {
            Ok(b) => b,
            Err(e) => {
                log::warn!("[VIDEO] Frame at {:.2}s unavailable: {}", timestamp, e);
                return;
            }
        };

        let digest = format!("{:x}", Sha256::digest(&bytes));
        let cached = lock(&state.ocr_cache).get(&digest).cloned();
        let lines = match cached {
            Some(lines) => {
                log::debug!("[VIDEO] Frame at {:.2}s identical to an earlier frame", timestamp);
                lines
            }
            None => match self.recognizer.recognize(&bytes).await {
                Ok(lines) => {
                    *lock(&state.frames_processed) += 1;
                    lock(&state.ocr_cache).insert(digest, lines.clone());
                    lines
                }
                Err(e) => {
                    log::warn!("[VIDEO] OCR failed for frame at {:.2}s: {}", timestamp, e);
                    return;
                }
            },
        };

        record_appearances(&state.appearances, timestamp, &lines);
    }
}

/// Add one appearance per distinct real line text in a frame.
fn record_appearances(map: &Mutex<HashMap<String, Vec<FrameAppearance>>>, timestamp: f64, lines: &[OcrLine]) {
    let mut seen = HashSet::new();
    let mut map = lock(map);
    for line in lines.iter().filter(|l| !l.is_no_text()) {
        let text = line.text.trim();
        if text.is_empty() || !seen.insert(text) {
            continue;
        }
        map.entry(text.to_string())
            .or_default()
            .push(FrameAppearance { timestamp, bbox: line.bbox });
    }
}

/// One sentence per text, ordered by first appearance, then top edge, then text.
fn into_sentences(appearances: HashMap<String, Vec<FrameAppearance>>) -> Vec<Sentence> {
    let mut sentences: Vec<Sentence> = appearances
        .into_iter()
        .map(|(text, list)| Sentence::from_appearances(text, list))
        .collect();
    sentences.sort_by(|a, b| {
        let top = |s: &Sentence| {
            s.frame_appearances
                .as_ref()
                .and_then(|list| list.first())
                .map(|app| app.bbox.min_y)
                .unwrap_or(0.0)
        };
        a.first_seen()
            .total_cmp(&b.first_seen())
            .then(top(a).total_cmp(&top(b)))
            .then_with(|| a.text.cmp(&b.text))
    });
    sentences
}
