//! Cloud Vision client: JPEG upload → `DOCUMENT_TEXT_DETECTION` → lines.
//!
//! The only network call in the OCR domain. Transport failures and
//! timeouts surface as errors; a response that parses to nothing (or
//! does not parse at all) is the "No text detected" line, not an error.

use super::lines::{lines_from_response, or_no_text};
use super::response::{AnnotateRequest, AnnotateResponse, ImageSize};
use super::types::OcrLine;
use super::TextRecognizer;
use crate::config::Config;
use crate::error::{transport_error, truncate, Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::time::Duration;

const JPEG_QUALITY: u8 = 85;

#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl VisionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.vision_endpoint.clone(),
            api_key: config.vision_key().map(str::to_string),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run OCR on an encoded image of any format the `image` crate reads.
    pub async fn recognize_image(&self, bytes: &[u8]) -> Result<Vec<OcrLine>> {
        let api_key = self.api_key.as_deref().ok_or(Error::NotConfigured("Google Cloud Vision"))?;
        let (jpeg, size) = prepare_jpeg(bytes)?;
        log::info!(
            "[OCR] Uploading {}x{} JPEG ({} bytes)",
            size.width,
            size.height,
            jpeg.len()
        );

        let start = std::time::Instant::now();
        let body = AnnotateRequest::document_text(BASE64.encode(&jpeg));
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, "OCR"))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(e, "OCR"))?;
        if !status.is_success() {
            log::error!("[OCR] Vision API returned {}: {}", status, truncate(&text, 200));
            return Err(Error::status(status, &text));
        }
        log::info!("[OCR] Vision latency: {}ms", start.elapsed().as_millis());

        parse_annotate_body(&text, size)
    }
}

impl TextRecognizer for VisionClient {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<OcrLine>> {
        self.recognize_image(image).await
    }
}

/// Decode dimensions and make sure the payload is JPEG.
///
/// JPEG input is passed through untouched; anything else is decoded and
/// re-encoded.
pub fn prepare_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, ImageSize)> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format() == Some(ImageFormat::Jpeg) {
        let (w, h) = reader.into_dimensions()?;
        return Ok((bytes.to_vec(), ImageSize::new(w, h)));
    }

    let image = reader.decode()?;
    let size = ImageSize::new(image.width(), image.height());
    let rgb = image.to_rgb8();
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok((jpeg, size))
}

/// Parse an `images:annotate` response body into lines.
///
/// Only a provider error object is an `Err`; malformed bodies degrade to
/// the "No text detected" line.
pub fn parse_annotate_body(body: &str, size: ImageSize) -> Result<Vec<OcrLine>> {
    let parsed: AnnotateResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("[OCR] Unexpected response shape ({}), treating as no text", e);
            return Ok(or_no_text(Vec::new(), size));
        }
    };

    let Some(first) = parsed.responses.into_iter().next() else {
        log::info!("[OCR] Empty responses array");
        return Ok(or_no_text(Vec::new(), size));
    };

    if let Some(err) = first.error.as_ref() {
        if err.code != 0 || !err.message.is_empty() {
            log::error!("[OCR] Vision error {}: {}", err.code, err.message);
            return Err(Error::Api(format!("{} ({})", err.message, err.code)));
        }
    }

    let lines = lines_from_response(&first, size);
    log::info!("[OCR] Extracted {} lines", lines.len());
    Ok(lines)
}
