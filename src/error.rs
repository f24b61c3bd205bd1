//! Error types for the personallearn library.
//!
//! Every pipeline stage returns [`CourseError`]. The variants fall into three
//! classes (see [`ErrorClass`]) so a front-end can translate a failure into
//! the right transport outcome without string matching:
//!
//! * **Client**: the caller supplied something unusable (an unreadable or
//!   empty PDF, a course with missing fields, a bad flag).
//! * **Service**: the completion service could not be reached or refused
//!   the request, or the local machine failed (disk, runtime).
//! * **Upstream**: the completion service answered, but the answer is not a
//!   course. Callers may choose to run the generation again.
//!
//! Nothing in the library retries on its own.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the personallearn library.
#[derive(Debug, Error)]
pub enum CourseError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but could not be read as a file (a directory, an I/O
    /// failure).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they do not start with the PDF magic.
    #[error("Input is not a PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    /// Zero-byte input. Rejected before any parsing is attempted.
    #[error("Uploaded PDF was empty.")]
    EmptyDocument,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The byte stream is not a parseable PDF container.
    #[error("Unreadable PDF document: {detail}")]
    UnreadableDocument { detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The completion service is not configured, unreachable, or refused
    /// the request (missing key, auth failure, transport error).
    #[error("Completion service '{provider}' is unavailable: {detail}")]
    GenerationUnavailable { provider: String, detail: String },

    /// The completion service replied, but the reply is not a valid course.
    ///
    /// `raw` holds the reply exactly as received.
    #[error("Model output is not a valid course: {reason}")]
    MalformedModelOutput { reason: String, raw: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The course handed to the renderer is structurally incomplete, or the
    /// PDF writer rejected the generated document.
    #[error("Cannot render course: {detail}")]
    RenderFailure { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Who is responsible for a failure.
///
/// | Class | Original HTTP status |
/// |-------|----------------------|
/// | `Client`   | 400 |
/// | `Service`  | 500 |
/// | `Upstream` | 502 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Service,
    Upstream,
}

impl ErrorClass {
    /// The HTTP status a transport adapter should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorClass::Client => 400,
            ErrorClass::Service => 500,
            ErrorClass::Upstream => 502,
        }
    }
}

impl CourseError {
    /// Classify the error for front-ends.
    pub fn class(&self) -> ErrorClass {
        match self {
            CourseError::FileNotFound { .. }
            | CourseError::PermissionDenied { .. }
            | CourseError::ReadFailed { .. }
            | CourseError::InvalidInput { .. }
            | CourseError::DownloadFailed { .. }
            | CourseError::DownloadTimeout { .. }
            | CourseError::NotAPdf { .. }
            | CourseError::EmptyDocument
            | CourseError::UnreadableDocument { .. }
            | CourseError::RenderFailure { .. }
            | CourseError::InvalidConfig(_) => ErrorClass::Client,
            CourseError::GenerationUnavailable { .. }
            | CourseError::OutputWriteFailed { .. }
            | CourseError::Internal(_) => ErrorClass::Service,
            CourseError::MalformedModelOutput { .. } => ErrorClass::Upstream,
        }
    }

    /// Whether running the same request again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CourseError::MalformedModelOutput { .. } | CourseError::DownloadTimeout { .. }
        )
    }

    /// The untouched model reply, for [`CourseError::MalformedModelOutput`].
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            CourseError::MalformedModelOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_output_keeps_raw_reply() {
        let e = CourseError::MalformedModelOutput {
            reason: "expected value at line 1 column 1".into(),
            raw: "Sure! Here is your course.".into(),
        };
        assert_eq!(e.raw_reply(), Some("Sure! Here is your course."));
        assert!(e.to_string().contains("line 1 column 1"));
        assert_eq!(e.class(), ErrorClass::Upstream);
        assert!(e.is_retryable());
    }

    #[test]
    fn unavailable_is_a_service_error() {
        let e = CourseError::GenerationUnavailable {
            provider: "gemini".into(),
            detail: "GEMINI_API_KEY environment variable is required.".into(),
        };
        assert_eq!(e.class(), ErrorClass::Service);
        assert_eq!(e.class().http_status(), 500);
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn client_side_rejections() {
        let unreadable = CourseError::UnreadableDocument {
            detail: "invalid file header".into(),
        };
        assert_eq!(unreadable.class().http_status(), 400);
        assert_eq!(CourseError::EmptyDocument.class(), ErrorClass::Client);
        assert_eq!(
            CourseError::RenderFailure {
                detail: "missing field `title`".into()
            }
            .class(),
            ErrorClass::Client
        );
        assert_eq!(unreadable.raw_reply(), None);
    }

    #[test]
    fn not_a_pdf_display() {
        let e = CourseError::NotAPdf {
            source_name: "notes.txt".into(),
            magic: *b"Hell",
        };
        assert!(e.to_string().contains("notes.txt"));
    }
}
