//! Learner profiling from a short, timed calibration quiz.
//!
//! The profile is a pure function of two numbers: how many calibration
//! tasks were answered correctly and how long the whole quiz took. Both feed
//! an *efficiency* figure, `score / (seconds + 1) * 100`, which is bucketed
//! into one of three levels. Each level fixes how many units the generated
//! course is split into: fast, accurate learners get a few dense units,
//! slower ones get many short ones.
//!
//! | Efficiency      | Level        | Units | Description      |
//! |-----------------|--------------|-------|------------------|
//! | `> 12`          | Advanced     | 4     | High Density     |
//! | `> 6`, `<= 12`  | Intermediate | 7     | Balanced         |
//! | `<= 6`          | Beginner     | 10    | Micro-Learning   |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Efficiency strictly above this is Advanced.
pub const ADVANCED_THRESHOLD: f64 = 12.0;

/// Efficiency strictly above this (and not Advanced) is Intermediate.
pub const INTERMEDIATE_THRESHOLD: f64 = 6.0;

/// Difficulty level of a generated course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        }
    }

    /// Number of units a course at this level is split into.
    pub fn unit_count(self) -> usize {
        match self {
            Level::Beginner => 10,
            Level::Intermediate => 7,
            Level::Advanced => 4,
        }
    }

    /// Short label shown to the learner.
    pub fn description(self) -> &'static str {
        match self {
            Level::Beginner => "Micro-Learning",
            Level::Intermediate => "Balanced",
            Level::Advanced => "High Density",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learner profile derived from one calibration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub level: Level,
    pub units: usize,
    #[serde(rename = "desc")]
    pub description: String,
    pub efficiency: f64,
}

/// Estimate a profile from a calibration score and the elapsed time.
///
/// Total over its domain: negative or non-finite durations are treated as
/// zero seconds.
pub fn estimate(score: u32, duration_seconds: f64) -> Profile {
    let duration = if duration_seconds.is_finite() {
        duration_seconds.max(0.0)
    } else {
        0.0
    };
    let efficiency = (f64::from(score) / (duration + 1.0)) * 100.0;
    let level = classify(efficiency);

    Profile {
        level,
        units: level.unit_count(),
        description: level.description().to_string(),
        efficiency,
    }
}

/// Bucket an efficiency value. Both bounds are strict.
pub fn classify(efficiency: f64) -> Level {
    if efficiency > ADVANCED_THRESHOLD {
        Level::Advanced
    } else if efficiency > INTERMEDIATE_THRESHOLD {
        Level::Intermediate
    } else {
        Level::Beginner
    }
}

// ── Calibration quiz ─────────────────────────────────────────────────────

/// One calibration task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationQuestion {
    #[serde(rename = "q")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: String,
}

impl CalibrationQuestion {
    fn new(prompt: &str, options: [&str; 4], correct: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: correct.to_string(),
        }
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct
    }
}

/// The bundled calibration tasks, in the order they are asked.
pub fn calibration_questions() -> Vec<CalibrationQuestion> {
    vec![
        CalibrationQuestion::new(
            "Sequence: 2, 4, 8, 16... Next?",
            ["18", "24", "30", "32"],
            "32",
        ),
        CalibrationQuestion::new(
            "Choose the pair that best completes the analogy: Neuron is to brain as pixel is to ___",
            ["Monitor", "Image", "Color", "Cable"],
            "Image",
        ),
        CalibrationQuestion::new(
            "Pick the strongest indicator of focused study habits:",
            [
                "Long sessions without breaks",
                "Regular spaced reviews",
                "All-night cramming",
                "Reading without notes",
            ],
            "Regular spaced reviews",
        ),
    ]
}

/// Count correct answers, position by position.
///
/// Answers beyond the last question are ignored; unanswered questions count
/// as wrong.
pub fn score_answers<S: AsRef<str>>(questions: &[CalibrationQuestion], answers: &[S]) -> u32 {
    questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| q.is_correct(a.as_ref()))
        .count() as u32
}

/// A timed calibration run.
///
/// The clock starts when the session is created, i.e. when the learner
/// presses "Start".
#[derive(Debug)]
pub struct CalibrationSession {
    questions: Vec<CalibrationQuestion>,
    answers: Vec<String>,
    started: Instant,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::with_questions(calibration_questions())
    }

    pub fn with_questions(questions: Vec<CalibrationQuestion>) -> Self {
        Self {
            questions,
            answers: Vec::new(),
            started: Instant::now(),
        }
    }

    /// The next unanswered question, if any.
    pub fn current(&self) -> Option<&CalibrationQuestion> {
        self.questions.get(self.answers.len())
    }

    /// Record an answer to the current question. Returns whether it was correct.
    pub fn answer(&mut self, answer: impl Into<String>) -> bool {
        let answer = answer.into();
        let correct = self
            .current()
            .map(|q| q.is_correct(&answer))
            .unwrap_or(false);
        if self.current().is_some() {
            self.answers.push(answer);
        }
        correct
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub fn score(&self) -> u32 {
        score_answers(&self.questions, &self.answers)
    }

    /// Close the session and derive the profile from score and elapsed time.
    pub fn finish(self) -> Profile {
        let elapsed = self.started.elapsed().as_secs_f64();
        estimate(self.score(), elapsed)
    }
}
