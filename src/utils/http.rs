use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::error::PdfReaderError;
use crate::utils::pdf::is_pdf;

/// Downloads the document at `url` with a single blocking GET.
///
/// A fresh client is built per call so nothing outlives the request.
/// No retries, no timeout override: the client defaults apply.
pub fn download_pdf(url: &url::Url, config: &ReaderConfig) -> Result<Vec<u8>, PdfReaderError> {
    info!(target: "pdf_fetch", url = %url, "Starting HTTP fetch");

    let mut builder = Client::builder().user_agent(config.user_agent.as_str());
    if config.no_proxy {
        builder = builder.no_proxy();
    }
    let client = builder.build()?;

    let response = client
        .get(url.as_str())
        .send()
        .map_err(|e| {
            warn!(target: "pdf_fetch", url = %url, "HTTP transport error: {}", e);
            e
        })?
        .error_for_status()
        .map_err(|e| {
            warn!(target: "pdf_fetch", url = %url, status = ?e.status(), "HTTP non-success status");
            e
        })?;

    if let Some(declared) = response.content_length() {
        if declared > config.max_pdf_bytes {
            info!(target: "pdf_fetch", url = %url, size = declared, limit = config.max_pdf_bytes, "Declared length over limit; refusing");
            return Err(PdfReaderError::TooLarge {
                size: declared,
                limit: config.max_pdf_bytes,
            });
        }
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|s| s.to_string());

    let body = response.bytes().map_err(|e| {
        warn!(target: "pdf_fetch", url = %url, "Body read failed: {}", e);
        e
    })?;

    let size = body.len() as u64;
    if size > config.max_pdf_bytes {
        info!(target: "pdf_fetch", url = %url, size = size, limit = config.max_pdf_bytes, "PDF too large; refusing");
        return Err(PdfReaderError::TooLarge {
            size,
            limit: config.max_pdf_bytes,
        });
    }

    info!(target: "pdf_fetch", url = %url, size = size, ct = ?content_type, "HTTP fetch completed");

    let head = &body[..body.len().min(512)];
    if !body.is_empty() && !is_pdf(content_type.as_deref(), head) {
        warn!(target: "pdf_fetch", url = %url, ct = ?content_type, "Response does not look like a PDF; parsing anyway");
    }

    Ok(body.to_vec())
}
