//! Configuration types for course generation and rendering.
//!
//! Generation behaviour is controlled through [`GenerationConfig`], built via
//! its [`GenerationConfigBuilder`]. Page geometry for rendering lives in
//! [`LayoutConfig`], which defaults to A4 with 2 cm margins.

use crate::error::CourseError;
use crate::pipeline::layout::CM;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_SOURCE_CHAR_BUDGET;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default model used when the Gemini provider is selected without a model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Configuration for a course generation.
///
/// # Example
/// ```rust
/// use personallearn::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .provider_name("gemini")
///     .model("gemini-2.5-flash")
///     .temperature(0.3)
///     .build()
///     .unwrap();
/// assert_eq!(config.source_char_budget, 25_000);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.4.
    ///
    /// Course writing needs some freedom of phrasing, but the reply must
    /// still follow a strict JSON schema; low-to-mid values keep both.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 16384.
    ///
    /// A ten-unit course with quizzes is a long JSON document. A low limit
    /// truncates the reply mid-object, which then fails to parse.
    pub max_tokens: usize,

    /// Number of source characters forwarded to the model. Default: 25 000.
    pub source_char_budget: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional stage events (extract, generate, render).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 16384,
            source_char_budget: DEFAULT_SOURCE_CHAR_BUDGET,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("source_char_budget", &self.source_char_budget)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn source_char_budget(mut self, chars: usize) -> Self {
        self.config.source_char_budget = chars;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, CourseError> {
        let c = &self.config;
        if c.source_char_budget == 0 {
            return Err(CourseError::InvalidConfig(
                "source_char_budget must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(CourseError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Page geometry for the course renderer, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    /// Same margin on all four sides.
    pub margin: f32,
}

impl Default for LayoutConfig {
    /// A4 portrait, 2 cm margins.
    fn default() -> Self {
        Self {
            page_width: 21.0 * CM,
            page_height: 29.7 * CM,
            margin: 2.0 * CM,
        }
    }
}

impl LayoutConfig {
    /// Width available to text.
    pub fn frame_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Height available to text.
    pub fn frame_height(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }
}
