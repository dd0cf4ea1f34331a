//! Persistence collaborators. Implementations live with the host app;
//! the pipeline only talks to these traits.

use crate::document::Document;
use crate::error::Result;
use image::DynamicImage;
use std::path::PathBuf;
use uuid::Uuid;

/// Whole-document persistence. There is no sentence-level save.
pub trait DocumentStore {
    fn save(&self, document: &Document) -> Result<()>;
    fn fetch(&self, id: Uuid) -> Result<Option<Document>>;
    fn fetch_all(&self) -> Result<Vec<Document>>;
    fn delete(&self, id: Uuid) -> Result<()>;
}

/// Captured media and thumbnails, addressed by document id.
pub trait MediaStore {
    fn save_media(&self, bytes: &[u8], id: Uuid, is_video: bool) -> Result<PathBuf>;
    fn save_thumbnail(&self, image: &DynamicImage, id: Uuid) -> Result<PathBuf>;
}
