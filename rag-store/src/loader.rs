//! Document loading: PDF text extraction or plain UTF-8 files.

use std::path::Path;

use tracing::{debug, info};

use crate::errors::RagError;
use crate::normalize::normalize_document_text;

/// Extracted and normalized text of one source document.
#[derive(Clone, Debug)]
pub struct RawDocument {
    /// Path as given by the caller; stored in every chunk payload.
    pub source: String,
    pub text: String,
}

/// Loads `path`. Files ending in `.pdf` (any case) go through PDF text
/// extraction, everything else is read as UTF-8 text.
///
/// # Errors
/// - [`RagError::Loader`] when the file is missing or cannot be decoded.
/// - [`RagError::EmptyDocument`] when no text remains after normalization.
pub async fn load_document(path: impl AsRef<Path>) -> Result<RawDocument, RagError> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let loader_err = |reason: String| RagError::Loader {
        path: source.clone(),
        reason,
    };

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let raw = if is_pdf {
        let bytes = tokio::fs::read(path).await.map_err(|e| loader_err(e.to_string()))?;
        debug!(path = %source, bytes = bytes.len(), "extracting pdf text");
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| loader_err(format!("extraction task failed: {e}")))?
            .map_err(|e| loader_err(e.to_string()))?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| loader_err(e.to_string()))?
    };

    let text = normalize_document_text(&raw);
    if text.is_empty() {
        return Err(RagError::EmptyDocument(source));
    }

    info!(path = %source, chars = text.chars().count(), pdf = is_pdf, "document loaded");
    Ok(RawDocument { source, text })
}
