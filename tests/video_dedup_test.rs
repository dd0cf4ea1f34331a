//! Video sampling and cross-frame dedup with scripted frames and OCR.

use hanzi_snap::config::SamplerSettings;
use hanzi_snap::ocr::{OcrLine, Rect, TextRecognizer};
use hanzi_snap::video::{FrameSource, VideoSampler, VideoScan};
use hanzi_snap::{Error, Sentence};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Frames are the timestamp rendered as text, so OCR can be scripted.
struct ScriptedVideo {
    duration: f64,
    frame_requests: AtomicUsize,
    failing_frame: Option<&'static str>,
}

impl ScriptedVideo {
    fn new(duration: f64) -> Self {
        Self { duration, frame_requests: AtomicUsize::new(0), failing_frame: None }
    }
}

impl FrameSource for ScriptedVideo {
    async fn duration(&self) -> hanzi_snap::Result<f64> {
        Ok(self.duration)
    }

    async fn frame_at(&self, timestamp: f64) -> hanzi_snap::Result<Vec<u8>> {
        self.frame_requests.fetch_add(1, Ordering::SeqCst);
        let label = format!("{:.1}", timestamp);
        if self.failing_frame == Some(label.as_str()) {
            return Err(Error::Media("decode failed".into()));
        }
        Ok(label.into_bytes())
    }
}

/// "你好" at 0.0, 0.2 and 1.0; "再见" and "你" at 0.4; OCR fails at 0.8.
#[derive(Default)]
struct ScriptedOcr {
    calls: AtomicUsize,
}

impl TextRecognizer for ScriptedOcr {
    async fn recognize(&self, image: &[u8]) -> hanzi_snap::Result<Vec<OcrLine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let line = |text: &str, y: f64| OcrLine::new(text, Rect::new(10.0, y, 60.0, y + 20.0));
        Ok(match std::str::from_utf8(image).unwrap_or_default() {
            "0.0" => vec![line("你好", 10.0)],
            "0.2" => vec![line("你好", 12.0)],
            "1.0" => vec![line("你好", 14.0)],
            "0.4" => vec![line("再见", 80.0), line("你", 120.0)],
            "0.8" => return Err(Error::Api("quota".into())),
            _ => vec![OcrLine::no_text(640.0, 360.0)],
        })
    }
}

fn settings(interval_secs: f64, max_frames: usize, chunk_size: usize) -> SamplerSettings {
    SamplerSettings { interval_secs, max_frames, chunk_size }
}

fn completed(scan: VideoScan) -> Vec<Sentence> {
    match scan {
        VideoScan::Completed(sentences) => sentences,
        VideoScan::Cancelled => panic!("scan was cancelled"),
    }
}

fn shape(sentences: &[Sentence]) -> Vec<(String, Vec<f64>)> {
    sentences
        .iter()
        .map(|s| {
            let times = s.frame_appearances.as_ref().unwrap().iter().map(|a| a.timestamp).collect();
            (s.text.clone(), times)
        })
        .collect()
}

#[tokio::test]
async fn identical_text_becomes_one_sentence_with_all_appearances() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.2, 120, 2));
    let video = ScriptedVideo::new(1.1);

    let mut progress = Vec::new();
    let sentences = completed(
        sampler
            .scan(&video, &CancellationToken::new(), |p| progress.push(p))
            .await
            .unwrap(),
    );

    let texts: Vec<&str> = sentences.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["你好", "再见", "你"]);

    let ni_hao = &sentences[0];
    let appearances = ni_hao.frame_appearances.as_ref().unwrap();
    assert_eq!(appearances.len(), 3);
    let times: Vec<f64> = appearances.iter().map(|a| a.timestamp).collect();
    for (got, want) in times.iter().zip([0.0, 0.2, 1.0]) {
        assert!((got - want).abs() < 1e-9, "{:?}", times);
    }
    assert_eq!(appearances[1].bbox.min_y, 12.0);
    assert!(ni_hao.range_in_image.is_none());

    // 6 frames in chunks of 2.
    assert_eq!(progress.len(), 3);
    assert_eq!(progress.last().copied(), Some(1.0));
}

#[tokio::test]
async fn rescanning_gives_pointwise_equal_results() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.2, 120, 4));
    let first = completed(sampler.scan(&ScriptedVideo::new(1.1), &CancellationToken::new(), |_| {}).await.unwrap());
    let second = completed(sampler.scan(&ScriptedVideo::new(1.1), &CancellationToken::new(), |_| {}).await.unwrap());

    assert_eq!(shape(&first), shape(&second));
    assert_ne!(first[0].id, second[0].id);
}

#[tokio::test]
async fn frame_count_never_exceeds_cap() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.5, 12, 5));
    let video = ScriptedVideo::new(36_000.0);
    completed(sampler.scan(&video, &CancellationToken::new(), |_| {}).await.unwrap());
    assert_eq!(video.frame_requests.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn failed_frames_are_skipped() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.2, 120, 3));
    let mut video = ScriptedVideo::new(1.1);
    video.failing_frame = Some("0.2");

    let sentences = completed(sampler.scan(&video, &CancellationToken::new(), |_| {}).await.unwrap());
    // Frame 0.2 failed to decode and OCR failed on 0.8; the rest still count.
    assert_eq!(sentences[0].text, "你好");
    assert_eq!(sentences[0].frame_appearances.as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn byte_identical_frames_reuse_ocr() {
    struct FrozenVideo;
    impl FrameSource for FrozenVideo {
        async fn duration(&self) -> hanzi_snap::Result<f64> {
            Ok(3.0)
        }
        async fn frame_at(&self, _timestamp: f64) -> hanzi_snap::Result<Vec<u8>> {
            Ok(b"0.0".to_vec())
        }
    }

    let ocr = ScriptedOcr::default();
    let sampler = VideoSampler::new(&ocr, settings(0.5, 120, 1));
    let sentences = completed(sampler.scan(&FrozenVideo, &CancellationToken::new(), |_| {}).await.unwrap());
    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].frame_appearances.as_ref().unwrap().len(), 6);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_is_checked_between_chunks() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.5, 120, 4));
    let video = ScriptedVideo::new(60.0);
    let cancel = CancellationToken::new();

    let scan = sampler.scan(&video, &cancel, |_| cancel.cancel()).await.unwrap();
    assert_eq!(scan, VideoScan::Cancelled);
    // The first chunk ran to completion, nothing after it started.
    assert_eq!(video.frame_requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn empty_video_completes_with_no_sentences() {
    let sampler = VideoSampler::new(ScriptedOcr::default(), settings(0.5, 120, 4));
    let sentences = completed(sampler.scan(&ScriptedVideo::new(0.0), &CancellationToken::new(), |_| {}).await.unwrap());
    assert!(sentences.is_empty());
}
