//! OCR domain: cloud Vision recognition plus line reconstruction.
//!
//! External code should only use the items re-exported here.

pub mod heuristics;
pub mod lines;
pub mod response;
pub mod types;
mod vision;

pub use lines::{cluster_into_lines, reconstruct_lines, split_line, vertical_overlap};
pub use response::ImageSize;
pub use types::{real_lines, OcrLine, Rect, Token, NO_TEXT_DETECTED};
pub use vision::{parse_annotate_body, prepare_jpeg, VisionClient};

use crate::error::Result;

/// Anything that turns an encoded image into reconstructed lines.
///
/// `VisionClient` is the production implementation; the video sampler is
/// generic over this so frames can be recognized by any backend.
#[allow(async_fn_in_trait)]
pub trait TextRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrLine>>;
}

impl<T: TextRecognizer> TextRecognizer for &T {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrLine>> {
        (**self).recognize(image).await
    }
}
