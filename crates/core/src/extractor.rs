use crate::error::IngestError;
use lopdf::Document as PdfDocument;
use std::fs;
use std::path::Path;

/// Extracts raw text from a document file. PDFs go through lopdf; anything
/// else is read as UTF-8 text.
pub fn extract_text(path: &Path) -> Result<String, IngestError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        extract_pdf_text(path)
    } else {
        fs::read_to_string(path).map_err(IngestError::Io)
    }
}

fn extract_pdf_text(path: &Path) -> Result<String, IngestError> {
    let document =
        PdfDocument::load(path).map_err(|error| IngestError::Extract(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _object_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::Extract(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    if pages.is_empty() {
        return Err(IngestError::Extract(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages.join("\n\n"))
}
