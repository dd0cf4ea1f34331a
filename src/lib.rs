//! hanzi-snap: Chinese text from photos and videos, as sentences with
//! pinyin and English.
//!
//! Pipeline: image/video → Cloud Vision OCR → line reconstruction →
//! sentence segmentation → streamed translation. The library never installs
//! a logger; binaries choose the `log` backend.

pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod segment;
pub mod store;
pub mod video;

pub use config::Config;
pub use document::{Document, DocumentSource, FrameAppearance, Script, Sentence, SentenceStatus};
pub use error::{Error, Result};
pub use pipeline::Pipeline;
