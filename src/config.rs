//! Configuration: API keys, model names, endpoints and timeouts.
//!
//! Resolution order:
//! 1. Built-in defaults
//! 2. `<config_dir>/hanzi-snap/settings.json` (missing or invalid → defaults)
//! 3. Environment variables (the binary loads `.env.local` / `.env` first)
//! 4. OS keychain, for keys still missing after 1-3
//!
//! The resulting `Config` is passed explicitly into every component.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Seconds between sampled video frames.
pub const FRAME_INTERVAL_SECS: f64 = 0.5;
/// Hard cap on OCR calls per video, regardless of duration.
pub const MAX_VIDEO_FRAMES: usize = 120;
/// Frames decoded and recognized concurrently; chunks run one after another.
pub const FRAME_CHUNK_SIZE: usize = 10;

const KEYCHAIN_SERVICE: &str = "hanzi-snap";

/// How OCR lines are turned into sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    #[default]
    Local,
    Cloud,
}

impl SegmentationMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "cloud" | "ai" => Some(Self::Cloud),
            _ => None,
        }
    }
}

/// Video sampling constants. Fixed by the app, not exposed to users.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplerSettings {
    pub interval_secs: f64,
    pub max_frames: usize,
    pub chunk_size: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval_secs: FRAME_INTERVAL_SECS,
            max_frames: MAX_VIDEO_FRAMES,
            chunk_size: FRAME_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub openai_key: Option<String>,
    pub google_cloud_vision_key: Option<String>,
    pub chat_model: String,
    pub segmentation_model: String,
    pub openai_base_url: String,
    pub vision_endpoint: String,
    pub segmentation: SegmentationMode,
    pub ocr_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub video: SamplerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: None,
            google_cloud_vision_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            segmentation_model: DEFAULT_CHAT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            segmentation: SegmentationMode::Local,
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            video: SamplerSettings::default(),
        }
    }
}

impl Config {
    /// Full resolution: settings file, then env, then keychain.
    pub fn load() -> Self {
        let mut config = load_settings_file().unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config.fill_from_keychain();
        log::info!(
            "[CONFIG] openai={} vision={} model={} segmentation={:?}",
            config.is_openai_configured(),
            config.is_vision_configured(),
            config.chat_model,
            config.segmentation
        );
        config
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_key = Some(key);
        }
        if let Some(key) = get("GOOGLE_CLOUD_VISION_API_KEY") {
            self.google_cloud_vision_key = Some(key);
        }
        if let Some(model) = get("HANZI_SNAP_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Some(model) = get("HANZI_SNAP_SEGMENTATION_MODEL") {
            self.segmentation_model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("HANZI_SNAP_VISION_ENDPOINT") {
            self.vision_endpoint = url;
        }
        if let Some(mode) = get("HANZI_SNAP_SEGMENTATION") {
            match SegmentationMode::parse(&mode) {
                Some(m) => self.segmentation = m,
                None => log::warn!("[CONFIG] Ignoring unknown segmentation mode: {}", mode),
            }
        }
    }

    /// Both credentials are present and not placeholders.
    pub fn is_configured(&self) -> bool {
        self.is_openai_configured() && self.is_vision_configured()
    }

    pub fn is_openai_configured(&self) -> bool {
        usable_key(self.openai_key.as_deref()).is_some()
    }

    pub fn is_vision_configured(&self) -> bool {
        usable_key(self.google_cloud_vision_key.as_deref()).is_some()
    }

    pub(crate) fn openai_key(&self) -> Option<&str> {
        usable_key(self.openai_key.as_deref())
    }

    pub(crate) fn vision_key(&self) -> Option<&str> {
        usable_key(self.google_cloud_vision_key.as_deref())
    }

    fn fill_from_keychain(&mut self) {
        if !self.is_openai_configured() {
            if let Some(key) = keychain_key("openai") {
                self.openai_key = Some(key);
            }
        }
        if !self.is_vision_configured() {
            if let Some(key) = keychain_key("google-vision") {
                self.google_cloud_vision_key = Some(key);
            }
        }
    }
}

/// Returns the key if it looks real.
fn usable_key(key: Option<&str>) -> Option<&str> {
    let key = key?.trim();
    if key.is_empty() || is_placeholder(key) {
        None
    } else {
        Some(key)
    }
}

/// Detects template values such as `YOUR_API_KEY` or `<openai-key>`.
pub fn is_placeholder(key: &str) -> bool {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"(?i)^(your[_\-]|replace|<.*>$|x{4,}$|placeholder)").ok())
        .as_ref()
        .map(|re| re.is_match(key.trim()))
        .unwrap_or(false)
}

fn keychain_key(account: &str) -> Option<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, account).ok()?;
    match entry.get_password() {
        Ok(key) if !key.is_empty() => {
            log::info!("[CONFIG] Loaded {} key from OS keychain", account);
            Some(key)
        }
        _ => None,
    }
}

/// Location of the optional settings file.
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hanzi-snap")
        .join("settings.json")
}

fn load_settings_file() -> Option<Config> {
    let path = settings_path();
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(config) => {
            log::info!("[CONFIG] Loaded {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("[CONFIG] Ignoring invalid {}: {}", path.display(), e);
            None
        }
    }
}
