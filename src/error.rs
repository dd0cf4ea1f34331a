//! Error taxonomy for the capture → OCR → translate pipeline.
//!
//! Only unrecoverable conditions live here. "No text detected", empty
//! sentence lists, partially delivered streams and cancellation are all
//! represented as values by the components that produce them.

/// Errors surfaced to the orchestrating caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required credential is missing or still a placeholder.
    #[error("{0} API key is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0} request timed out")]
    Timeout(&'static str),

    /// Whole-response parse failure. Per-record stream failures never get here.
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// Error object reported by the provider inside a successful response.
    #[error("provider error: {0}")]
    Api(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("media error: {0}")]
    Media(String),
}

impl Error {
    /// True for errors the UI should answer with a setup prompt.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::NotConfigured(_))
    }

    /// Build a `Status` error, keeping only the head of the body.
    pub(crate) fn status(status: reqwest::StatusCode, body: &str) -> Self {
        Error::Status {
            status: status.as_u16(),
            body: truncate(body, 500).to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Map reqwest failures, keeping timeouts distinguishable.
pub(crate) fn transport_error(e: reqwest::Error, what: &'static str) -> Error {
    if e.is_timeout() {
        Error::Timeout(what)
    } else {
        Error::Transport(e)
    }
}

/// Truncate on a char boundary so log lines never split a UTF-8 sequence.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
