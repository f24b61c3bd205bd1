//! # personallearn
//!
//! Turn a PDF (or plain text) into a structured, level-adapted course with
//! review quizzes, using a generative language model, then render that course
//! into a paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! calibration quiz ──▶ Profile { level, units }
//!                              │
//! PDF                          ▼
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   plain text of every page (lopdf)
//!  ├─ 3. Prompt    fixed instruction + title/level/units + first 25 000 chars
//!  ├─ 4. Model     one completion call (gemini / openai / anthropic / …)
//!  ├─ 5. Normalize strip code fences, parse JSON, validate the course shape
//!  └─ 6. Render    A4 layout, one page per unit, written with lopdf
//! ```
//!
//! Profiles, prompts, normalisation, layout and rendering are pure and
//! deterministic. Only the model call touches the network, behind the
//! [`CompletionService`] trait, so every other step can be tested offline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use personallearn::{estimate, CourseGenerator, CourseRequest, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 2 of 3 calibration answers right in 20 seconds
//!     let profile = estimate(2, 20.0);
//!
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let generator = CourseGenerator::from_config(GenerationConfig::default())?;
//!     let request = CourseRequest::from_profile("Neural Networks", &profile).with_pdf(true);
//!     let output = generator.generate_from_pdf("lecture.pdf", &request).await?;
//!
//!     println!("{} ({} units)", output.course.title, output.course.units.len());
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.input_tokens,
//!         output.stats.output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `plearn` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! personallearn = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod course;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, LayoutConfig};
pub use course::{safe_filename, Course, Language, QuizQuestion, Unit};
pub use error::{CourseError, ErrorClass};
pub use generate::{generate_course, generate_course_sync, CourseGenerator, CourseRequest};
pub use output::{CourseOutput, GenerationStats};
pub use pipeline::extract::{extract_pages, extract_text};
pub use pipeline::input::resolve_input;
pub use pipeline::llm::{Completion, CompletionService, ProviderCompletion};
pub use pipeline::normalize::normalize;
pub use pipeline::render::{
    render, render_json, render_json_to_file, render_to_file, render_with_layout,
};
pub use profile::{
    calibration_questions, estimate, score_answers, CalibrationQuestion, CalibrationSession,
    Level, Profile,
};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use prompts::build_prompt;
