//! Line reconstruction: raw Vision geometry → ordered `OcrLine`s.
//!
//! Tokens are clustered into lines by vertical overlap against the open
//! line's running Y span, then each line is walked left-to-right and cut
//! into segments on explicit breaks, sentence punctuation and wide gaps.
//!
//! Nothing here fails. Absent or malformed geometry degrades to the
//! "No text detected" line covering the whole image.

use super::heuristics::{ends_segment, is_explicit_break};
use super::response::{AnnotateImageResponse, ImageSize, Paragraph};
use super::types::{OcrLine, Rect, Token};

/// Minimum overlap ratio for a token to join the open line.
pub const LINE_OVERLAP_THRESHOLD: f64 = 0.35;
/// Gaps wider than this many average widths start a new segment.
pub const SEGMENT_GAP_FACTOR: f64 = 1.5;
/// Gaps wider than this many average widths get a separating space.
pub const SPACE_GAP_FACTOR: f64 = 0.25;

/// Vertical overlap of two Y ranges relative to the taller of the two.
pub fn vertical_overlap(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    let span = (a_max - a_min).max(b_max - b_min);
    if span <= 0.0 {
        // Two zero-height ranges only overlap when they sit on the same row.
        return if a_min == b_min { 1.0 } else { 0.0 };
    }
    let intersection = (a_max.min(b_max) - a_min.max(b_min)).max(0.0);
    intersection / span
}

/// A line under construction: tokens plus the running Y span.
#[derive(Debug)]
struct LineBucket {
    min_y: f64,
    max_y: f64,
    tokens: Vec<Token>,
}

impl LineBucket {
    fn new(token: Token) -> Self {
        Self {
            min_y: token.min_y,
            max_y: token.max_y,
            tokens: vec![token],
        }
    }

    fn accepts(&self, token: &Token) -> bool {
        vertical_overlap(self.min_y, self.max_y, token.min_y, token.max_y)
            >= LINE_OVERLAP_THRESHOLD
    }

    fn push(&mut self, token: Token) {
        self.min_y = self.min_y.min(token.min_y);
        self.max_y = self.max_y.max(token.max_y);
        self.tokens.push(token);
    }
}

/// Total order on tokens so clustering never depends on input order.
fn reading_order(a: &Token, b: &Token) -> std::cmp::Ordering {
    a.mid_y()
        .total_cmp(&b.mid_y())
        .then(a.min_x.total_cmp(&b.min_x))
        .then(a.max_x.total_cmp(&b.max_x))
        .then_with(|| a.text.cmp(&b.text))
}

/// Group tokens into lines, top to bottom.
pub fn cluster_into_lines(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut sorted = tokens.to_vec();
    sorted.sort_by(reading_order);

    let mut buckets: Vec<LineBucket> = Vec::new();
    for token in sorted {
        match buckets.last_mut() {
            Some(open) if open.accepts(&token) => open.push(token),
            _ => buckets.push(LineBucket::new(token)),
        }
    }
    buckets.into_iter().map(|b| b.tokens).collect()
}

/// Text buffer for the segment currently being built.
#[derive(Debug, Default)]
struct Segment {
    text: String,
    words: Vec<Token>,
}

impl Segment {
    fn append(&mut self, part: &str, token: &Token) {
        self.text.push_str(part);
        if self.words.last() != Some(token) {
            self.words.push(token.clone());
        }
    }

    fn needs_space(&self) -> bool {
        !self.text.is_empty() && !self.text.ends_with(char::is_whitespace)
    }

    fn flush_into(&mut self, out: &mut Vec<OcrLine>) {
        let segment = std::mem::take(self);
        let text = segment.text.trim();
        if text.is_empty() {
            return;
        }
        let rects: Vec<Rect> = segment.words.iter().map(Token::rect).collect();
        let bbox = Rect::enclosing(&rects).unwrap_or_default();
        out.push(OcrLine {
            text: text.to_string(),
            bbox,
            words: segment.words,
        });
    }
}

/// Walk one line's tokens left-to-right and cut it into segments.
pub fn split_line(mut tokens: Vec<Token>) -> Vec<OcrLine> {
    if tokens.is_empty() {
        return Vec::new();
    }
    tokens.sort_by(|a, b| {
        a.min_x
            .total_cmp(&b.min_x)
            .then(a.max_x.total_cmp(&b.max_x))
            .then_with(|| a.text.cmp(&b.text))
    });

    let avg_width = (tokens.iter().map(Token::width).sum::<f64>() / tokens.len() as f64).max(1.0);
    let mut out = Vec::new();
    let mut segment = Segment::default();
    let mut prev_max_x: Option<f64> = None;

    for token in &tokens {
        if let Some(prev) = prev_max_x {
            let gap = token.min_x - prev;
            if gap > SEGMENT_GAP_FACTOR * avg_width {
                segment.flush_into(&mut out);
            } else if gap > SPACE_GAP_FACTOR * avg_width && segment.needs_space() {
                segment.text.push(' ');
            }
        }

        for (i, part) in token.text.split(is_explicit_break).enumerate() {
            if i > 0 {
                segment.flush_into(&mut out);
            }
            if !part.is_empty() {
                segment.append(part, token);
            }
        }
        if ends_segment(&segment.text) {
            segment.flush_into(&mut out);
        }

        prev_max_x = Some(token.max_x);
    }
    segment.flush_into(&mut out);
    out
}

/// Cluster a flat token collection and split every line into segments.
pub fn reconstruct_lines(tokens: &[Token]) -> Vec<OcrLine> {
    cluster_into_lines(tokens)
        .into_iter()
        .flat_map(split_line)
        .collect()
}

/// Replace an empty result with the full-image "No text detected" line.
pub fn or_no_text(lines: Vec<OcrLine>, size: ImageSize) -> Vec<OcrLine> {
    if lines.is_empty() {
        let bounds = size.bounds();
        vec![OcrLine::no_text(bounds.width(), bounds.height())]
    } else {
        lines
    }
}

fn paragraph_tokens(paragraph: &Paragraph, size: ImageSize) -> Vec<Token> {
    let words: Vec<(String, Option<Rect>)> = paragraph
        .words
        .iter()
        .map(|w| (w.text(), w.bounding_box.as_ref().and_then(|b| b.to_rect(size))))
        .filter(|(text, _)| !text.trim().is_empty() || text.contains(is_explicit_break))
        .collect();
    let extent = paragraph
        .bounding_box
        .as_ref()
        .and_then(|b| b.to_rect(size))
        .or_else(|| Rect::enclosing(words.iter().filter_map(|(_, r)| r.as_ref())));

    let mut tokens = Vec::with_capacity(words.len());
    for (i, (text, rect)) in words.iter().enumerate() {
        let rect = match rect {
            Some(rect) => Some(*rect),
            None => {
                let estimate = estimate_word_box(&words, i, extent);
                log::debug!("[LAYOUT] Word {:?} has no usable geometry, estimated {:?}", text, estimate);
                estimate
            }
        };
        match rect {
            Some(rect) => tokens.push(Token::new(text.as_str(), rect)),
            None => log::debug!("[LAYOUT] Skipping word without any geometry: {:?}", text),
        }
    }
    tokens
}

/// Box for a word whose own vertices are unusable.
///
/// Vision omits zero coordinates, so these are words on the image edge. The
/// word is pinned against its nearest positioned neighbour in the paragraph
/// (next first, since edge words usually start a row) and stretched to the
/// paragraph extent on the open side.
fn estimate_word_box(words: &[(String, Option<Rect>)], index: usize, extent: Option<Rect>) -> Option<Rect> {
    let next = words[index + 1..].iter().find_map(|(_, r)| *r);
    let prev = words[..index].iter().rev().find_map(|(_, r)| *r);
    match (next, prev) {
        (Some(anchor), _) => {
            let min_x = extent.map_or(anchor.min_x, |e| e.min_x.min(anchor.min_x));
            Some(Rect::new(min_x, anchor.min_y, anchor.min_x, anchor.max_y))
        }
        (None, Some(anchor)) => {
            let max_x = extent.map_or(anchor.max_x, |e| e.max_x.max(anchor.max_x));
            Some(Rect::new(anchor.max_x, anchor.min_y, max_x, anchor.max_y))
        }
        (None, None) => extent,
    }
}

/// Lines from the structured page → block → paragraph → word hierarchy.
fn structured_lines(response: &AnnotateImageResponse, size: ImageSize) -> Vec<OcrLine> {
    let Some(annotation) = response.full_text_annotation.as_ref() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for page in &annotation.pages {
        // Page dimensions describe pixel vertices; the decoded image size wins.
        let page_size = if size.is_known() {
            size
        } else {
            ImageSize {
                width: page.width.unwrap_or(0.0),
                height: page.height.unwrap_or(0.0),
            }
        };
        for block in &page.blocks {
            for paragraph in &block.paragraphs {
                let tokens = paragraph_tokens(paragraph, page_size);
                if tokens.is_empty() {
                    continue;
                }
                let mut paragraph_lines = reconstruct_lines(&tokens);
                if let Some(para_box) = paragraph
                    .bounding_box
                    .as_ref()
                    .and_then(|b| b.to_rect(page_size))
                {
                    for line in paragraph_lines.iter_mut().filter(|l| l.bbox.is_degenerate()) {
                        line.bbox = para_box;
                    }
                }
                lines.extend(paragraph_lines);
            }
        }
    }
    lines
}

/// Lines from the flat full-text string, each given an even vertical slice.
fn flat_lines(response: &AnnotateImageResponse, size: ImageSize) -> Vec<OcrLine> {
    let text = response
        .text_annotations
        .first()
        .map(|a| a.description.as_str())
        .filter(|t| !t.trim().is_empty())
        .or_else(|| response.full_text_annotation.as_ref().map(|a| a.text.as_str()))
        .unwrap_or_default();

    let texts: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if texts.is_empty() {
        return Vec::new();
    }

    let bounds = size.bounds();
    let slice = bounds.height() / texts.len() as f64;
    texts
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let top = bounds.min_y + slice * i as f64;
            OcrLine::new(t, Rect::new(bounds.min_x, top, bounds.max_x, top + slice))
        })
        .collect()
}

/// Full reconstruction for one image response. Never empty.
pub fn lines_from_response(response: &AnnotateImageResponse, size: ImageSize) -> Vec<OcrLine> {
    let mut lines = structured_lines(response, size);
    if lines.is_empty() {
        lines = flat_lines(response, size);
        if !lines.is_empty() {
            log::info!("[LAYOUT] Structured geometry absent, used flat text ({} lines)", lines.len());
        }
    }
    log::debug!("[LAYOUT] Reconstructed {} lines", lines.len());
    or_no_text(lines, size)
}
