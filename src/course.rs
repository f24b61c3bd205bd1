//! The course document produced by generation and consumed by rendering.
//!
//! Field names match the JSON schema the model is asked to emit, so a reply
//! deserialises straight into [`Course`]. Shape problems that serde cannot
//! express (unit count, four choices, answer index in range) are checked by
//! [`Course::validate`].

use crate::error::CourseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of choices every quiz question must offer.
pub const CHOICES_PER_QUESTION: usize = 4;

/// Language the course is written in, as detected by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    En,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Fr => f.write_str("fr"),
            Language::En => f.write_str("en"),
        }
    }
}

/// A complete generated course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub level: String,
    #[serde(default)]
    pub description: String,
    pub language: Language,
    pub units: Vec<Unit>,
}

/// One unit of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub title: String,
    /// Newline-delimited paragraphs.
    pub content: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub quiz_questions: Vec<QuizQuestion>,
}

/// A multiple-choice review question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub choices: Vec<String>,
    /// Index into `choices`.
    pub correct_choice: i64,
    #[serde(default)]
    pub explanation: String,
}

impl QuizQuestion {
    /// The text of the correct choice, when the index is in range.
    pub fn correct_answer(&self) -> Option<&str> {
        usize::try_from(self.correct_choice)
            .ok()
            .and_then(|i| self.choices.get(i))
            .map(String::as_str)
    }
}

static RE_UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid regex"));

impl Course {
    /// Check the structural contract the generation prompt asks for.
    ///
    /// Returns a human-readable reason on the first violation.
    pub fn validate(&self, expected_units: usize) -> Result<(), String> {
        if self.units.len() != expected_units {
            return Err(format!(
                "expected exactly {expected_units} units, got {}",
                self.units.len()
            ));
        }
        for (u, unit) in self.units.iter().enumerate() {
            for (q, question) in unit.quiz_questions.iter().enumerate() {
                let at = format!("unit {} question {}", u + 1, q + 1);
                if question.choices.len() != CHOICES_PER_QUESTION {
                    return Err(format!(
                        "{at}: expected {CHOICES_PER_QUESTION} choices, got {}",
                        question.choices.len()
                    ));
                }
                if question.correct_answer().is_none() {
                    return Err(format!(
                        "{at}: correct_choice {} is out of range 0..{CHOICES_PER_QUESTION}",
                        question.correct_choice
                    ));
                }
            }
        }
        Ok(())
    }

    /// Interpret a structured value as a course, enforcing `expected_units`.
    ///
    /// `raw` is the reply the value was parsed from; it is attached to the
    /// error so callers can see what the model actually said.
    pub fn from_value(
        value: serde_json::Value,
        expected_units: usize,
        raw: &str,
    ) -> Result<Self, CourseError> {
        let course: Course =
            serde_json::from_value(value).map_err(|e| CourseError::MalformedModelOutput {
                reason: format!("reply does not match the course schema: {e}"),
                raw: raw.to_string(),
            })?;
        course
            .validate(expected_units)
            .map_err(|reason| CourseError::MalformedModelOutput {
                reason,
                raw: raw.to_string(),
            })?;
        Ok(course)
    }

    /// Attachment filename for the rendered PDF.
    ///
    /// Every run of characters outside `[A-Za-z0-9_.-]` becomes a single `_`;
    /// an empty result falls back to `course`.
    pub fn download_filename(&self) -> String {
        safe_filename(&self.title)
    }
}

/// `<safe stem>.pdf` for an arbitrary title.
pub fn safe_filename(title: &str) -> String {
    let stem = RE_UNSAFE_FILENAME.replace_all(title, "_");
    if stem.is_empty() {
        "course.pdf".to_string()
    } else {
        format!("{stem}.pdf")
    }
}
