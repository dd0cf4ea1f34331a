//! Typed schema for the Vision `images:annotate` request and response.
//!
//! Only the fields the layout engine reads are modelled. Every field is
//! optional or defaulted: the API omits empty collections, and a missing
//! coordinate must stay missing rather than silently become 0.

use super::types::Rect;
use serde::{Deserialize, Serialize};

/// Coordinate space used for normalized vertices when the image size is unknown.
pub const NORMALIZED_FALLBACK_SPACE: f64 = 1000.0;

// ── Request ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnnotateRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
    pub image_context: ImageContext,
}

#[derive(Debug, Serialize)]
pub struct ImageContent {
    /// Base64-encoded JPEG.
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub max_results: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContext {
    pub language_hints: Vec<&'static str>,
}

impl AnnotateRequest {
    /// Document text detection with Chinese-first language hints.
    pub fn document_text(base64_jpeg: String) -> Self {
        Self {
            requests: vec![AnnotateImageRequest {
                image: ImageContent { content: base64_jpeg },
                features: vec![Feature {
                    feature_type: "DOCUMENT_TEXT_DETECTION",
                    max_results: 50,
                }],
                image_context: ImageContext {
                    language_hints: vec!["zh", "zh-Hans", "zh-Hant", "en"],
                },
            }],
        }
    }
}

// ── Response ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    pub full_text_annotation: Option<TextAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    pub error: Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub bounding_box: Option<BoundingPoly>,
    pub property: Option<TextProperty>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Symbol {
    #[serde(default)]
    pub text: String,
    pub property: Option<TextProperty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    pub detected_break: Option<DetectedBreak>,
}

#[derive(Debug, Deserialize)]
pub struct DetectedBreak {
    #[serde(rename = "type", default)]
    pub kind: BreakKind,
}

/// Break detected after a symbol or word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakKind {
    #[default]
    Unknown,
    Space,
    SureSpace,
    EolSureSpace,
    Hyphen,
    #[serde(alias = "EOL_SURE_BREAK")]
    LineBreak,
    #[serde(other)]
    Other,
}

impl BreakKind {
    /// Text appended to a word when this break follows it.
    pub fn marker(self) -> Option<char> {
        match self {
            BreakKind::Space | BreakKind::SureSpace | BreakKind::EolSureSpace => Some(' '),
            BreakKind::LineBreak => Some('\n'),
            BreakKind::Unknown | BreakKind::Hyphen | BreakKind::Other => None,
        }
    }
}

impl TextProperty {
    fn break_kind(&self) -> Option<BreakKind> {
        self.detected_break.as_ref().map(|b| b.kind)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub normalized_vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Vertex {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Image size used to scale normalized coordinates. Zero means unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }

    pub fn is_known(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Bounds of the coordinate space lines are reported in.
    pub fn bounds(&self) -> Rect {
        if self.is_known() {
            Rect::full(self.width, self.height)
        } else {
            Rect::full(NORMALIZED_FALLBACK_SPACE, NORMALIZED_FALLBACK_SPACE)
        }
    }
}

impl BoundingPoly {
    /// Convert to a pixel-space rect.
    ///
    /// Normalized vertices win when present. Any vertex missing a coordinate
    /// disqualifies the whole set; `None` means "no box".
    pub fn to_rect(&self, size: ImageSize) -> Option<Rect> {
        let (sx, sy) = if size.is_known() {
            (size.width, size.height)
        } else {
            (NORMALIZED_FALLBACK_SPACE, NORMALIZED_FALLBACK_SPACE)
        };
        rect_from_vertices(&self.normalized_vertices, sx, sy)
            .or_else(|| rect_from_vertices(&self.vertices, 1.0, 1.0))
    }
}

fn rect_from_vertices(vertices: &[Vertex], scale_x: f64, scale_y: f64) -> Option<Rect> {
    if vertices.is_empty() {
        return None;
    }
    let mut points = Vec::with_capacity(vertices.len());
    for v in vertices {
        let (x, y) = (v.x?, v.y?);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        points.push((x * scale_x, y * scale_y));
    }
    let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    Some(Rect::new(min_x, min_y, max_x, max_y))
}

impl Word {
    /// Concatenate symbols, inserting a space or newline wherever a break
    /// was detected on a symbol or on the word itself.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for symbol in &self.symbols {
            out.push_str(&symbol.text);
            if let Some(marker) = symbol
                .property
                .as_ref()
                .and_then(TextProperty::break_kind)
                .and_then(BreakKind::marker)
            {
                out.push(marker);
            }
        }
        if let Some(marker) = self
            .property
            .as_ref()
            .and_then(TextProperty::break_kind)
            .and_then(BreakKind::marker)
        {
            if !out.ends_with(marker) {
                out.push(marker);
            }
        }
        out
    }
}
