//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! Extraction works on an in-memory buffer, so a URL is downloaded straight
//! into memory. The `%PDF` magic is checked before returning so callers get
//! a meaningful error instead of a parser failure, and zero-byte inputs are
//! rejected here rather than handed to the extractor.

use crate::error::CourseError;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF bytes plus a display name for messages.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, CourseError> {
    if input.trim().is_empty() {
        return Err(CourseError::InvalidInput {
            input: input.to_string(),
        });
    }
    let resolved = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    check_pdf_bytes(&resolved.name, &resolved.bytes)?;
    Ok(resolved)
}

/// Reject empty buffers and buffers without the `%PDF` magic.
pub fn check_pdf_bytes(name: &str, bytes: &[u8]) -> Result<(), CourseError> {
    if bytes.is_empty() {
        return Err(CourseError::EmptyDocument);
    }
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(CourseError::NotAPdf {
            source_name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, CourseError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => CourseError::FileNotFound { path: path.clone() },
        ErrorKind::PermissionDenied => CourseError::PermissionDenied { path: path.clone() },
        _ => CourseError::ReadFailed {
            path: path.clone(),
            source: e,
        },
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput {
        name: path.display().to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, CourseError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CourseError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CourseError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CourseError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CourseError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CourseError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ResolvedInput {
        name: url.to_string(),
        bytes: bytes.to_vec(),
    })
}
