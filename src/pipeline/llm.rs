//! Completion-service port and its `edgequake-llm` adapter.
//!
//! The pipeline only needs "send one prompt, get one reply back", so that is
//! all [`CompletionService`] promises. [`ProviderCompletion`] implements it
//! on top of any `edgequake_llm::LLMProvider`; tests implement it with a
//! scripted reply and never touch the network.
//!
//! The call is made exactly once. There is no retry here: a transport or
//! provider error becomes [`CourseError::GenerationUnavailable`] and goes
//! straight back to the caller.

use crate::config::{GenerationConfig, DEFAULT_GEMINI_MODEL};
use crate::error::CourseError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A model reply plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl Completion {
    /// A reply with no token accounting.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// An opaque text-completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Send `prompt` as the sole user turn and return the reply.
    async fn complete(&self, prompt: &str) -> Result<Completion, CourseError>;
}

/// [`CompletionService`] backed by an `edgequake-llm` provider.
pub struct ProviderCompletion {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
}

impl ProviderCompletion {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        label: impl Into<String>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            provider,
            label: label.into(),
            options: build_options(config),
        }
    }

    /// Resolve the provider described by `config` and wrap it.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, CourseError> {
        let (provider, label) = resolve_provider(config)?;
        Ok(Self::new(provider, label, config))
    }
}

#[async_trait]
impl CompletionService for ProviderCompletion {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, CourseError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| CourseError::GenerationUnavailable {
                provider: self.label.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Completion {
            content: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build `CompletionOptions` from the generation config.
fn build_options(config: &GenerationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Default model for a named provider when none is configured.
fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" | "google" => DEFAULT_GEMINI_MODEL,
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.2",
        _ => "gpt-4.1-mini",
    }
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<(Arc<dyn LLMProvider>, String), CourseError> {
    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        CourseError::GenerationUnavailable {
            provider: provider_name.to_string(),
            detail: format!("{e}"),
        }
    })?;
    Ok((provider, format!("{provider_name}/{model}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, `config.model`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **Gemini key** (`GEMINI_API_KEY`) with `gemini-2.5-flash` unless a
///    model is configured.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
///
/// This runs once per [`crate::generate::CourseGenerator`]; the resolved
/// client is reused for every call.
pub fn resolve_provider(
    config: &GenerationConfig,
) -> Result<(Arc<dyn LLMProvider>, String), CourseError> {
    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok((Arc::clone(provider), label));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| CourseError::GenerationUnavailable {
            provider: "auto".to_string(),
            detail: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    info!("Auto-detected LLM provider from environment");
    Ok((llm_provider, "auto".to_string()))
}
