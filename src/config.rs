//! Configuration for exam-paper analysis.
//!
//! Everything a session needs lives in [`AnalysisConfig`], built through
//! [`AnalysisConfigBuilder`]. The API key is the only secret and the only
//! value read from the process environment; the CLI maps its own flags onto
//! the builder.

use crate::error::ExamQuestError;
use crate::progress::{NoopObserver, ObserverHandle};
use std::fmt;
use std::sync::Arc;

/// Default maximum output width of the compression step, in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1200;

/// Default JPEG quality (0.8 on a 0–1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Default Gemini REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Configuration for an analysis session.
///
/// # Example
/// ```rust
/// use examquest::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .max_width(1000)
///     .jpeg_quality(75)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_width, 1000);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Maximum width after compression. Narrower images are never upscaled. Default: 1200.
    pub max_width: u32,

    /// JPEG quality used for the re-encode, 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Gemini model identifier. Default: `gemini-3-flash-preview`.
    pub model: String,

    /// API key. `None` means "read from the environment when the analyzer is built".
    pub api_key: Option<String>,

    /// Base URL of the `generateContent` API.
    pub base_url: String,

    /// Sampling temperature. `None` leaves the service default in place.
    pub temperature: Option<f32>,

    /// Timeout for the single remote call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for fetching URL inputs, in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Receives session transitions.
    pub observer: ObserverHandle,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            api_timeout_secs: 60,
            download_timeout_secs: 60,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("max_width", &self.max_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("observer", &"<dyn SessionObserver>")
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the API key: explicit value first, then [`API_KEY_ENV_VARS`].
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn max_width(mut self, px: u32) -> Self {
        self.config.max_width = px;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.config.observer = observer;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ExamQuestError> {
        let c = &self.config;
        if c.max_width < 100 {
            return Err(ExamQuestError::InvalidConfig(format!(
                "max width must be ≥ 100 px, got {}",
                c.max_width
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ExamQuestError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExamQuestError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(ExamQuestError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(t) = c.temperature.filter(|t| t.is_nan()) {
            return Err(ExamQuestError::InvalidConfig(format!(
                "temperature must be a number in 0.0–2.0, got {t}"
            )));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ExamQuestError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}
