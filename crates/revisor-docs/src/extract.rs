use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use revisor_core::RevisorError;

/// Extracts plain text from one reference document.
pub trait TextExtractor: Send + Sync {
    /// Return the document's text.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Document`] or [`RevisorError::Io`] when the
    /// document cannot be read or parsed.
    fn extract(&self, path: &Path) -> Result<String, RevisorError>;
}

/// PDF text extraction backed by `pdf-extract`.
///
/// Pages are concatenated in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, RevisorError> {
        let bytes = std::fs::read(path)?;
        // Malformed PDFs can panic deep inside the parser instead of erroring.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        }));
        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RevisorError::Document(format!(
                "{}: {e}",
                path.display()
            ))),
            Err(_) => Err(RevisorError::Document(format!(
                "{}: PDF parser aborted",
                path.display()
            ))),
        }
    }
}

/// Reads documents that already are UTF-8 text (`.txt`, `.md`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, RevisorError> {
        let bytes = std::fs::read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| RevisorError::Document(format!("{}: {e}", path.display())))
    }
}

/// Pick the extractor for a configured document extension.
///
/// # Examples
///
/// ```
/// use revisor_docs::extract::extractor_for;
///
/// let _pdf = extractor_for("PDF");
/// let _txt = extractor_for("txt");
/// ```
pub fn extractor_for(extension: &str) -> Box<dyn TextExtractor> {
    if extension.eq_ignore_ascii_case("pdf") {
        Box::new(PdfTextExtractor)
    } else {
        Box::new(PlainTextExtractor)
    }
}
