//! Geometry and token model shared by every layout step.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Box anchored at the origin covering a whole image.
    pub fn full(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn mid_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Union of many boxes, `None` for an empty iterator.
    pub fn enclosing<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(a) => Some(a.union(r)),
        })
    }
}

/// A recognized word-level unit with its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub text: String,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            min_x: rect.min_x,
            max_x: rect.max_x,
            min_y: rect.min_y,
            max_y: rect.max_y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn mid_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }
}

/// Text emitted when a page yields no lines at all.
pub const NO_TEXT_DETECTED: &str = "No text detected";

/// One reconstructed line segment of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrLine {
    pub text: String,
    pub bbox: Rect,
    #[serde(default)]
    pub words: Vec<Token>,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
            words: Vec::new(),
        }
    }

    /// The single-line result used when nothing was recognized.
    pub fn no_text(width: f64, height: f64) -> Self {
        Self::new(NO_TEXT_DETECTED, Rect::full(width, height))
    }

    pub fn is_no_text(&self) -> bool {
        self.text == NO_TEXT_DETECTED && self.words.is_empty()
    }
}

/// Drop the "No text detected" sentinel, leaving only real lines.
pub fn real_lines(lines: Vec<OcrLine>) -> Vec<OcrLine> {
    lines.into_iter().filter(|l| !l.is_no_text()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_inverted_corners() {
        let r = Rect::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(r, Rect { min_x: 0.0, min_y: 5.0, max_x: 10.0, max_y: 20.0 });
    }

    #[test]
    fn enclosing_unions_all_boxes() {
        let boxes = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, -2.0, 6.0, 0.5)];
        assert_eq!(Rect::enclosing(&boxes), Some(Rect::new(0.0, -2.0, 6.0, 1.0)));
        assert_eq!(Rect::enclosing(std::iter::empty::<&Rect>()), None);
    }

    #[test]
    fn sentinel_is_recognized_and_filtered() {
        let lines = vec![OcrLine::no_text(100.0, 50.0)];
        assert!(lines[0].is_no_text());
        assert_eq!(lines[0].bbox, Rect::full(100.0, 50.0));
        assert!(real_lines(lines).is_empty());
    }
}
