//! Course generation entry points.
//!
//! [`CourseGenerator`] owns one completion service for its whole lifetime.
//! It is built once (from a [`GenerationConfig`], or around any
//! [`CompletionService`]) and can then serve any number of independent
//! generations, concurrently if the caller wants.
//!
//! ```text
//! source text ─▶ build_prompt ─▶ complete ─▶ normalize ─▶ Course::from_value
//! ```
//!
//! The `generate_from_*` methods wrap that core with the surrounding steps a
//! front-end needs: reading the PDF, extracting text, and optionally
//! rendering the result.

use crate::config::GenerationConfig;
use crate::course::Course;
use crate::error::CourseError;
use crate::output::{CourseOutput, GenerationStats};
use crate::pipeline::llm::{CompletionService, ProviderCompletion};
use crate::pipeline::{extract, input, normalize, render};
use crate::profile::Profile;
use crate::progress::{ProgressCallback, Stage};
use crate::prompts::build_prompt_with_budget;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to generate: the course parameters a front-end collects.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRequest {
    pub title: String,
    pub level: String,
    pub unit_count: usize,
    /// Render the course and attach the PDF to the output.
    pub include_pdf: bool,
}

impl CourseRequest {
    pub fn new(title: impl Into<String>, level: impl Into<String>, unit_count: usize) -> Self {
        Self {
            title: title.into(),
            level: level.into(),
            unit_count,
            include_pdf: false,
        }
    }

    /// Level and unit count taken from a calibration profile.
    pub fn from_profile(title: impl Into<String>, profile: &Profile) -> Self {
        Self::new(title, profile.level.as_str(), profile.units)
    }

    pub fn with_pdf(mut self, include_pdf: bool) -> Self {
        self.include_pdf = include_pdf;
        self
    }
}

/// Generates courses through one completion service.
pub struct CourseGenerator {
    service: Arc<dyn CompletionService>,
    config: GenerationConfig,
}

impl CourseGenerator {
    /// Wrap an existing completion service.
    pub fn new(service: Arc<dyn CompletionService>, config: GenerationConfig) -> Self {
        Self { service, config }
    }

    /// Resolve the provider described by `config` and wrap it.
    ///
    /// Fails with [`CourseError::GenerationUnavailable`] when no provider can
    /// be configured (missing key, unknown provider name).
    pub fn from_config(config: GenerationConfig) -> Result<Self, CourseError> {
        let service = ProviderCompletion::from_config(&config)?;
        info!("Using completion service: {}", service.name());
        Ok(Self::new(Arc::new(service), config))
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate a course from source text.
    ///
    /// The reply must be one JSON course with exactly `unit_count` units,
    /// four choices per question and in-range answer indices; anything else
    /// is [`CourseError::MalformedModelOutput`].
    pub async fn generate(
        &self,
        source_text: &str,
        title: &str,
        level: &str,
        unit_count: usize,
    ) -> Result<Course, CourseError> {
        let (course, _) = self
            .generate_with_stats(source_text, title, level, unit_count)
            .await?;
        Ok(course)
    }

    /// [`generate`](Self::generate), plus token and timing accounting.
    pub async fn generate_with_stats(
        &self,
        source_text: &str,
        title: &str,
        level: &str,
        unit_count: usize,
    ) -> Result<(Course, GenerationStats), CourseError> {
        if unit_count == 0 {
            return Err(CourseError::InvalidConfig("unit_count must be ≥ 1".into()));
        }

        let stage = StageTimer::start(self.config.progress_callback.as_ref(), Stage::Generate);
        let result = self
            .run_generation(source_text, title, level, unit_count)
            .await;
        stage.finish(result)
    }

    async fn run_generation(
        &self,
        source_text: &str,
        title: &str,
        level: &str,
        unit_count: usize,
    ) -> Result<(Course, GenerationStats), CourseError> {
        let start = Instant::now();
        let budget = self.config.source_char_budget;
        let source_chars = source_text.chars().count();
        let truncated = source_chars > budget;
        if truncated {
            warn!(
                "Source text has {} characters; only the first {} are sent",
                source_chars, budget
            );
        }

        let prompt = build_prompt_with_budget(source_text, title, level, unit_count, budget);
        info!(
            "Generating '{}' ({}, {} units) via {}",
            title,
            level,
            unit_count,
            self.service.name()
        );

        let completion = self.service.complete(&prompt).await?;
        debug!("Reply: {} characters", completion.content.len());

        let value = normalize::normalize(&completion.content)?;
        let course = Course::from_value(value, unit_count, &completion.content)?;

        let stats = GenerationStats {
            source_chars,
            truncated,
            prompt_chars: prompt.chars().count(),
            input_tokens: completion.prompt_tokens,
            output_tokens: completion.completion_tokens,
            generation_ms: start.elapsed().as_millis() as u64,
            render_ms: 0,
        };
        info!(
            "Generated '{}': {} units in {}ms",
            course.title,
            course.units.len(),
            stats.generation_ms
        );
        Ok((course, stats))
    }

    /// Blocking wrapper around [`generate`](Self::generate).
    ///
    /// Creates a temporary tokio runtime internally; do not call it from
    /// inside an async context.
    pub fn generate_sync(
        &self,
        source_text: &str,
        title: &str,
        level: &str,
        unit_count: usize,
    ) -> Result<Course, CourseError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| CourseError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(source_text, title, level, unit_count))
    }

    /// Read a local PDF or download one, extract its text, and generate.
    pub async fn generate_from_pdf(
        &self,
        input_str: &str,
        request: &CourseRequest,
    ) -> Result<CourseOutput, CourseError> {
        let resolved =
            input::resolve_input(input_str, self.config.download_timeout_secs).await?;
        self.generate_from_bytes(resolved.bytes, request).await
    }

    /// Extract text from in-memory PDF bytes and generate.
    pub async fn generate_from_bytes(
        &self,
        pdf_bytes: Vec<u8>,
        request: &CourseRequest,
    ) -> Result<CourseOutput, CourseError> {
        if pdf_bytes.is_empty() {
            return Err(CourseError::EmptyDocument);
        }

        let stage = StageTimer::start(self.config.progress_callback.as_ref(), Stage::Extract);
        let extracted = tokio::task::spawn_blocking(move || extract::extract_text(&pdf_bytes))
            .await
            .map_err(|e| CourseError::Internal(format!("Extraction task panicked: {}", e)))
            .and_then(|r| r);
        let text = stage.finish(extracted)?;
        info!("Extracted {} characters of text", text.len());

        self.generate_from_text(&text, request).await
    }

    /// Generate from already-extracted text.
    pub async fn generate_from_text(
        &self,
        source_text: &str,
        request: &CourseRequest,
    ) -> Result<CourseOutput, CourseError> {
        let (course, mut stats) = self
            .generate_with_stats(source_text, &request.title, &request.level, request.unit_count)
            .await?;

        let mut output = CourseOutput {
            course,
            course_pdf_base64: None,
            stats: GenerationStats::default(),
        };

        if request.include_pdf {
            let stage = StageTimer::start(self.config.progress_callback.as_ref(), Stage::Render);
            let start = Instant::now();
            let pdf = stage.finish(render::render(&output.course))?;
            stats.render_ms = start.elapsed().as_millis() as u64;
            output = output.with_pdf(&pdf);
        }

        output.stats = stats;
        Ok(output)
    }
}

impl std::fmt::Debug for CourseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourseGenerator")
            .field("service", &self.service.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Generate a course from a PDF path or URL with a provider resolved from
/// `config`.
///
/// # Example
///
/// ```rust,no_run
/// use personallearn::{generate_course, CourseRequest, GenerationConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Provider from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
///     let config = GenerationConfig::default();
///     let request = CourseRequest::new("Neural Networks", "Intermediate", 7).with_pdf(true);
///     let output = generate_course("lecture.pdf", &request, config).await?;
///     println!("{}", output.course.title);
///     Ok(())
/// }
/// ```
pub async fn generate_course(
    input_str: &str,
    request: &CourseRequest,
    config: GenerationConfig,
) -> Result<CourseOutput, CourseError> {
    CourseGenerator::from_config(config)?
        .generate_from_pdf(input_str, request)
        .await
}

/// Synchronous wrapper around [`generate_course`].
pub fn generate_course_sync(
    input_str: &str,
    request: &CourseRequest,
    config: GenerationConfig,
) -> Result<CourseOutput, CourseError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CourseError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_course(input_str, request, config))
}

/// Reports one stage to the progress callback.
struct StageTimer<'a> {
    callback: Option<&'a ProgressCallback>,
    stage: Stage,
    start: Instant,
}

impl<'a> StageTimer<'a> {
    fn start(callback: Option<&'a ProgressCallback>, stage: Stage) -> Self {
        if let Some(cb) = callback {
            cb.on_stage_start(stage);
        }
        Self {
            callback,
            stage,
            start: Instant::now(),
        }
    }

    fn finish<T>(self, result: Result<T, CourseError>) -> Result<T, CourseError> {
        if let Some(cb) = self.callback {
            match &result {
                Ok(_) => cb.on_stage_complete(self.stage, self.start.elapsed().as_millis() as u64),
                Err(e) => cb.on_stage_error(self.stage, &e.to_string()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::sample_course;
    use crate::pipeline::extract::tests::make_test_pdf;
    use crate::pipeline::llm::Completion;
    use crate::progress::PipelineProgressCallback;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed text and records every prompt it receives.
    struct ScriptedService {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn replying(reply: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(detail: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(detail.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<Completion, CourseError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(Completion {
                    content: text.clone(),
                    prompt_tokens: 120,
                    completion_tokens: 480,
                }),
                Err(detail) => Err(CourseError::GenerationUnavailable {
                    provider: "scripted".into(),
                    detail: detail.clone(),
                }),
            }
        }
    }

    fn fenced(units: usize) -> String {
        let json = serde_json::to_string_pretty(&sample_course(units)).unwrap();
        format!("```json\n{json}\n```")
    }

    fn generator(service: Arc<ScriptedService>) -> CourseGenerator {
        CourseGenerator::new(service, GenerationConfig::default())
    }

    #[tokio::test]
    async fn fenced_reply_becomes_a_course() {
        let gen = generator(ScriptedService::replying(fenced(2)));
        let course = gen
            .generate("Attention and memory.", "Cognitive Science 101", "Intermediate", 2)
            .await
            .unwrap();
        assert_eq!(course, sample_course(2));
    }

    #[tokio::test]
    async fn prose_reply_is_malformed() {
        let gen = generator(ScriptedService::replying("Sure! Here is your course."));
        let err = gen.generate("text", "T", "Beginner", 2).await.unwrap_err();
        assert!(matches!(err, CourseError::MalformedModelOutput { .. }));
        assert_eq!(err.raw_reply(), Some("Sure! Here is your course."));
    }

    #[tokio::test]
    async fn wrong_unit_count_is_malformed() {
        let gen = generator(ScriptedService::replying(fenced(3)));
        let err = gen.generate("text", "T", "Beginner", 4).await.unwrap_err();
        match err {
            CourseError::MalformedModelOutput { reason, .. } => {
                assert!(reason.contains("expected exactly 4 units"), "{reason}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn three_choices_is_malformed() {
        let mut course = sample_course(1);
        course.units[0].quiz_questions[0].choices.pop();
        let reply = serde_json::to_string(&course).unwrap();
        let gen = generator(ScriptedService::replying(reply));
        assert!(matches!(
            gen.generate("text", "T", "Beginner", 1).await,
            Err(CourseError::MalformedModelOutput { .. })
        ));
    }

    #[tokio::test]
    async fn service_failure_is_unavailable() {
        let gen = generator(ScriptedService::failing("401 Unauthorized"));
        let err = gen.generate("text", "T", "Beginner", 1).await.unwrap_err();
        assert!(matches!(err, CourseError::GenerationUnavailable { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn prompt_carries_parameters_and_truncated_source() {
        let service = ScriptedService::replying(fenced(1));
        let config = GenerationConfig::builder()
            .source_char_budget(10)
            .build()
            .unwrap();
        let gen = CourseGenerator::new(service.clone(), config);
        let (_, stats) = gen
            .generate_with_stats("0123456789ABCDEF", "Cognitive Science 101", "Advanced", 1)
            .await
            .unwrap();

        let prompts = service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title: Cognitive Science 101"));
        assert!(prompts[0].contains("Level: Advanced"));
        assert!(prompts[0].contains("0123456789\n"));
        assert!(!prompts[0].contains("ABCDEF"));

        assert!(stats.truncated);
        assert_eq!(stats.source_chars, 16);
        assert_eq!(stats.input_tokens, 120);
        assert_eq!(stats.output_tokens, 480);
        assert_eq!(stats.prompt_chars, prompts[0].chars().count());
    }

    #[tokio::test]
    async fn zero_units_is_rejected_before_calling_the_service() {
        let service = ScriptedService::replying(fenced(0));
        let gen = CourseGenerator::new(service.clone(), GenerationConfig::default());
        assert!(matches!(
            gen.generate("text", "T", "Beginner", 0).await,
            Err(CourseError::InvalidConfig(_))
        ));
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn from_text_with_pdf_attaches_base64() {
        let gen = generator(ScriptedService::replying(fenced(2)));
        let request = CourseRequest::new("Cognitive Science 101", "Intermediate", 2).with_pdf(true);
        let output = gen.generate_from_text("source", &request).await.unwrap();
        let pdf = output.pdf_bytes().unwrap().unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(output.stats.input_tokens, 120);
    }

    #[tokio::test]
    async fn from_text_without_pdf_has_no_attachment() {
        let gen = generator(ScriptedService::replying(fenced(1)));
        let request = CourseRequest::new("T", "Beginner", 1);
        let output = gen.generate_from_text("source", &request).await.unwrap();
        assert!(output.course_pdf_base64.is_none());
        assert_eq!(output.stats.render_ms, 0);
    }

    #[tokio::test]
    async fn from_bytes_extracts_before_prompting() {
        let service = ScriptedService::replying(fenced(1));
        let gen = CourseGenerator::new(service.clone(), GenerationConfig::default());
        let pdf = make_test_pdf(&["Synaptic plasticity"]);
        gen.generate_from_bytes(pdf, &CourseRequest::new("T", "Beginner", 1))
            .await
            .unwrap();
        assert!(service.prompts.lock().unwrap()[0].contains("Synaptic plasticity"));
    }

    #[tokio::test]
    async fn empty_bytes_are_rejected() {
        let gen = generator(ScriptedService::replying(fenced(1)));
        assert!(matches!(
            gen.generate_from_bytes(Vec::new(), &CourseRequest::new("T", "Beginner", 1))
                .await,
            Err(CourseError::EmptyDocument)
        ));
    }

    #[test]
    fn request_from_profile() {
        let profile = crate::profile::estimate(0, 0.0);
        let request = CourseRequest::from_profile("Intro", &profile);
        assert_eq!(request.level, "Beginner");
        assert_eq!(request.unit_count, 10);
        assert!(!request.include_pdf);
    }

    #[derive(Default)]
    struct Events(Mutex<Vec<String>>);

    impl PipelineProgressCallback for Events {
        fn on_stage_start(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.0.lock().unwrap().push(format!("done:{stage}"));
        }
        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.0.lock().unwrap().push(format!("error:{stage}"));
        }
    }

    #[tokio::test]
    async fn stage_events_wrap_each_step() {
        let events = Arc::new(Events::default());
        let config = GenerationConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let gen = CourseGenerator::new(ScriptedService::replying(fenced(1)), config);
        let request = CourseRequest::new("T", "Beginner", 1).with_pdf(true);
        gen.generate_from_bytes(make_test_pdf(&["text"]), &request)
            .await
            .unwrap();
        assert_eq!(
            *events.0.lock().unwrap(),
            vec![
                "start:extract",
                "done:extract",
                "start:generate",
                "done:generate",
                "start:render",
                "done:render"
            ]
        );
    }

    #[tokio::test]
    async fn failed_stage_reports_error() {
        let events = Arc::new(Events::default());
        let config = GenerationConfig::builder()
            .progress_callback(events.clone())
            .build()
            .unwrap();
        let gen = CourseGenerator::new(ScriptedService::replying("nope"), config);
        let _ = gen.generate("text", "T", "Beginner", 1).await;
        assert_eq!(
            *events.0.lock().unwrap(),
            vec!["start:generate", "error:generate"]
        );
    }

    #[test]
    fn sync_wrapper_runs_outside_a_runtime() {
        let gen = generator(ScriptedService::replying(fenced(1)));
        let course = gen.generate_sync("text", "T", "Beginner", 1).unwrap();
        assert_eq!(course.units.len(), 1);
    }
}
