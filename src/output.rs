//! Output types returned by the generation entry points.

use crate::course::Course;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A generated course plus, optionally, its rendered PDF.
///
/// Serialises as `{ "course": …, "course_pdf_base64": …, "stats": … }`.
/// `course_pdf_base64` is omitted when the PDF was not requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutput {
    pub course: Course,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_pdf_base64: Option<String>,

    pub stats: GenerationStats,
}

impl CourseOutput {
    /// Attach rendered PDF bytes as standard base64.
    pub fn with_pdf(mut self, pdf: &[u8]) -> Self {
        self.course_pdf_base64 = Some(STANDARD.encode(pdf));
        self
    }

    /// Decode the attached PDF, if any.
    pub fn pdf_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.course_pdf_base64.as_ref().map(|b64| STANDARD.decode(b64))
    }

    /// Suggested attachment name for the PDF.
    pub fn download_filename(&self) -> String {
        self.course.download_filename()
    }
}

/// Accounting for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Characters of source text before truncation.
    pub source_chars: usize,
    /// Whether the source exceeded the character budget.
    pub truncated: bool,
    /// Characters in the prompt actually sent.
    pub prompt_chars: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Wall-clock time of the model call, normalisation and validation.
    pub generation_ms: u64,
    /// Wall-clock time of rendering; 0 when no PDF was produced.
    pub render_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::sample_course;

    #[test]
    fn pdf_field_is_omitted_when_absent() {
        let out = CourseOutput {
            course: sample_course(1),
            course_pdf_base64: None,
            stats: GenerationStats::default(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("course_pdf_base64").is_none());
        assert_eq!(json["course"]["title"], "Cognitive Science 101");
        assert_eq!(json["stats"]["truncated"], false);
    }

    #[test]
    fn pdf_bytes_round_trip_through_base64() {
        let out = CourseOutput {
            course: sample_course(0),
            course_pdf_base64: None,
            stats: GenerationStats::default(),
        }
        .with_pdf(b"%PDF-1.5 fake");
        assert_eq!(out.course_pdf_base64.as_deref(), Some("JVBERi0xLjUgZmFrZQ=="));
        assert_eq!(out.pdf_bytes().unwrap().unwrap(), b"%PDF-1.5 fake");
        assert_eq!(out.download_filename(), "Cognitive_Science_101.pdf");
    }
}
