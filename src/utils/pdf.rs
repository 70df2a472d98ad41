// PDF utilities behind the pdf_reader tool.
// Parsing is delegated to lopdf, with pdf-extract as a whole-document fallback.

use std::collections::BTreeMap;
use std::panic;

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, info, warn};

use crate::error::PdfReaderError;

/// Info dictionary entries keyed by field name. `None` marks values that
/// have no textual form (arrays, dictionaries, streams, null).
pub type Metadata = BTreeMap<String, Option<String>>;

/// Extracts the text of every page, in document order, from a PDF held in memory.
///
/// Pages are joined with a single newline and the result is trimmed. A
/// page that fails to extract contributes an empty line; only a document
/// that cannot be loaded at all is an error.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> Result<String, PdfReaderError> {
    extract_text_with_fallback(bytes, extract_with_pdf_extract)
}

fn extract_text_with_fallback<F>(bytes: &[u8], fallback: F) -> Result<String, PdfReaderError>
where
    F: FnOnce(&[u8]) -> Option<String>,
{
    let doc = Document::load_mem(bytes).map_err(|e| PdfReaderError::Parse(e.to_string()))?;

    let page_count = doc.get_pages().len();
    let mut text = aggregate_page_text(&doc);

    if page_count > 0 && text.trim().is_empty() {
        info!(pages = page_count, "Per-page extraction produced no text; trying pdf-extract");
        if let Some(recovered) = fallback(bytes) {
            text = recovered;
        }
    }

    Ok(text.trim().to_string())
}

fn aggregate_page_text(doc: &Document) -> String {
    let mut text = String::new();
    for (page_num, _page_id) in doc.get_pages() {
        let page_text = doc.extract_text(&[page_num]).unwrap_or_else(|e| {
            debug!(page = page_num, "Page text extraction failed: {}", e);
            String::new()
        });
        // lopdf closes every text object with a newline of its own
        text.push_str(page_text.trim_end_matches(|c: char| c == '\n' || c == '\r'));
        text.push('\n');
    }
    text
}

/// pdf-extract can panic on malformed content streams, so the call is fenced.
fn extract_with_pdf_extract(bytes: &[u8]) -> Option<String> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            debug!("pdf-extract fallback failed: {}", e);
            None
        }
        Err(_) => {
            warn!("pdf-extract panicked during fallback extraction");
            None
        }
    }
}

/// Reads the document Info dictionary from a PDF held in memory.
///
/// Keys with empty names are dropped. A document without an Info
/// dictionary yields an empty map.
pub fn extract_metadata_from_pdf_mem(bytes: &[u8]) -> Result<Metadata, PdfReaderError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfReaderError::Metadata(e.to_string()))?;

    let info = match doc.trailer.get(b"Info") {
        Ok(info) => info,
        Err(_) => return Ok(Metadata::new()),
    };
    let (_, info) = doc
        .dereference(info)
        .map_err(|e| PdfReaderError::Metadata(e.to_string()))?;
    let dict = info
        .as_dict()
        .map_err(|e| PdfReaderError::Metadata(e.to_string()))?;

    Ok(collect_metadata(&doc, dict))
}

fn collect_metadata(doc: &Document, dict: &Dictionary) -> Metadata {
    dict.iter()
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| {
            (
                String::from_utf8_lossy(key).into_owned(),
                metadata_value(doc, value),
            )
        })
        .collect()
}

fn metadata_value(doc: &Document, value: &Object) -> Option<String> {
    let value = match value {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match value {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(r) => Some(r.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE/UTF-8 when a BOM is present,
/// otherwise PDFDocEncoding, approximated by Windows-1252.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some((enc, offset)) = encoding_rs::Encoding::for_bom(bytes) {
        let (cow, _had_errors) = enc.decode_without_bom_handling(&bytes[offset..]);
        return cow.into_owned();
    }
    let (cow, _had_errors) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    cow.into_owned()
}

/// Returns true if given content-type or head indicates a PDF file.
/// - Content-Type: application/pdf (case-insensitive, substring match)
/// - Magic bytes: %PDF-
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}
