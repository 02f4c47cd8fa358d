//! PDF text extraction for uploaded contracts.
//!
//! A single call into `pdf-extract` plus validation. No custom parsing: a
//! contract either yields usable text or the pipeline stops here.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

/// A contract shorter than this (in non-whitespace characters) is treated
/// as empty or unreadable rather than analysed.
const MIN_TEXT_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("invalid PDF file: {0}")]
    Unreadable(String),

    #[error("PDF appears to be empty or unreadable")]
    Empty,
}

/// Extract all text from a PDF contract file.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }

    let text =
        pdf_extract::extract_text(path).map_err(|e| ExtractError::Unreadable(e.to_string()))?;

    let visible_chars = text.chars().filter(|c| !c.is_whitespace()).count();
    if visible_chars < MIN_TEXT_CHARS {
        return Err(ExtractError::Empty);
    }

    info!(
        path = %path.display(),
        chars = text.len(),
        words = text.split_whitespace().count(),
        "extracted contract text"
    );
    Ok(text)
}

/// Whether a file is a readable PDF with extractable text. Never errors —
/// safe to call before [`extract_text`].
pub fn is_valid_pdf(path: &Path) -> bool {
    match pdf_extract::extract_text(path) {
        Ok(_) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "PDF validation failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let err = extract_text(Path::new("/nonexistent/contract.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn non_pdf_content_is_unreadable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("not_a_contract.pdf");
        std::fs::write(&path, "plain text, not a PDF").unwrap();

        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
        assert!(!is_valid_pdf(&path));
    }

    #[test]
    fn validation_never_errors_on_missing_file() {
        assert!(!is_valid_pdf(Path::new("/nonexistent/contract.pdf")));
    }
}
