use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::ReaderConfig;
use crate::error::PdfReaderError;
use crate::mcp::types::{CallToolResult, ToolAnnotations, ToolDefinition};
use crate::utils::http::download_pdf;
use crate::utils::pdf::{extract_metadata_from_pdf_mem, extract_text_from_pdf_mem, Metadata};

pub const PDF_READER_TOOL_NAME: &str = "pdf_reader";

pub static PDF_READER_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: PDF_READER_TOOL_NAME.to_string(),
    description: "Fetches a PDF file from a provided URL and extracts its text and metadata. \
                  Input should be the URL of the PDF file."
        .to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "URL of the PDF file"
            }
        },
        "required": ["url"]
    }),
    annotations: Some(ToolAnnotations {
        title: Some("PDF Reader".to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    }),
});

#[derive(Debug, Deserialize)]
pub struct PdfReaderArgs {
    pub url: String,
}

impl PdfReaderArgs {
    pub fn validate(&self) -> Result<url::Url, PdfReaderError> {
        validate_url(&self.url)
    }
}

/// Non-empty and parseable; scheme checks are left to the HTTP client.
fn validate_url(raw: &str) -> Result<url::Url, PdfReaderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PdfReaderError::InvalidParams(
            "url must not be empty".to_string(),
        ));
    }
    Ok(url::Url::parse(raw)?)
}

/// Fetches a PDF by URL and turns it into plain text.
///
/// Every call is independent: one request, one buffer, dropped on return.
#[derive(Debug, Clone, Default)]
pub struct PdfReaderTool {
    config: ReaderConfig,
}

impl PdfReaderTool {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// String-only entry point. Never fails: every error, including a panic
    /// in a parsing library, comes back as descriptive text.
    pub fn run(&self, url: &str) -> String {
        render_guarded(url, || self.read(url))
    }

    /// Downloads the PDF at `url` and returns its trimmed page text.
    pub fn read(&self, url: &str) -> Result<String, PdfReaderError> {
        let (url, bytes) = self.fetch_document(url)?;
        self.extract_text(&url, &bytes)
    }

    /// Like [`read`](Self::read), but also returns the Info dictionary of the
    /// same downloaded buffer. The document is fetched once.
    pub fn read_with_metadata(&self, url: &str) -> Result<(String, Metadata), PdfReaderError> {
        let (url, bytes) = self.fetch_document(url)?;
        let text = self.extract_text(&url, &bytes)?;
        Ok((text, self.retrieve_pdf_metadata(&bytes)))
    }

    fn fetch_document(&self, url: &str) -> Result<(url::Url, Vec<u8>), PdfReaderError> {
        let url = validate_url(url)?;
        let bytes = download_pdf(&url, &self.config)?;
        if bytes.is_empty() {
            warn!(target: "pdf_fetch", url = %url, "Empty response body");
            return Err(PdfReaderError::EmptyBody);
        }
        Ok((url, bytes))
    }

    fn extract_text(&self, url: &url::Url, bytes: &[u8]) -> Result<String, PdfReaderError> {
        info!(url = %url, size = bytes.len(), "Starting PDF text extraction");
        let started = Instant::now();
        match extract_text_from_pdf_mem(bytes) {
            Ok(text) => {
                info!(url = %url, elapsed_ms = started.elapsed().as_millis() as u64, len = text.len(), "PDF extraction succeeded");
                Ok(text)
            }
            Err(err) => {
                warn!(url = %url, "PDF extraction failed: {}", err);
                Err(err)
            }
        }
    }

    /// Info dictionary of an already downloaded document. Failures come
    /// back as a single `error` entry.
    pub fn retrieve_pdf_metadata(&self, bytes: &[u8]) -> Metadata {
        match extract_metadata_from_pdf_mem(bytes) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Metadata extraction failed: {}", err);
                Metadata::from([("error".to_string(), Some(err.to_string()))])
            }
        }
    }

    /// Asynchronous entry point. Not supported; the MCP layer runs the
    /// blocking path on a worker thread instead.
    pub async fn arun(&self, _url: &str) -> Result<String, PdfReaderError> {
        Err(PdfReaderError::Unsupported)
    }

    pub async fn execute(&self, arguments: Option<serde_json::Value>) -> CallToolResult {
        let params = match arguments {
            Some(args) => match serde_json::from_value::<PdfReaderArgs>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid pdf_reader parameters: {}", e);
                    return CallToolResult::error(format!("Invalid parameters: {}", e));
                }
            },
            None => {
                return CallToolResult::error("Missing required parameters");
            }
        };

        if let Err(e) = params.validate() {
            return CallToolResult::error(e.to_string());
        }

        info!("Reading PDF from URL: {}", params.url);

        let tool = self.clone();
        let url = params.url;
        worker_result(tokio::task::spawn_blocking(move || tool.read(&url)).await)
    }
}

/// Runs `read` and renders its outcome as text, turning a panic into
/// `PdfReaderError::Unexpected`.
pub(crate) fn render_guarded<F>(url: &str, read: F) -> String
where
    F: FnOnce() -> Result<String, PdfReaderError>,
{
    match panic::catch_unwind(AssertUnwindSafe(read)) {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => {
            let err = PdfReaderError::Unexpected(panic_message(payload.as_ref()));
            error!("pdf_reader panicked for {}: {}", url, err);
            err.to_string()
        }
    }
}

fn worker_result(
    joined: Result<Result<String, PdfReaderError>, tokio::task::JoinError>,
) -> CallToolResult {
    match joined {
        Ok(Ok(text)) => CallToolResult::success(text),
        Ok(Err(err)) => CallToolResult::error(err.to_string()),
        Err(join_err) => {
            error!("pdf_reader worker failed: {}", join_err);
            CallToolResult::error(PdfReaderError::Unexpected(join_err.to_string()).to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while reading PDF".to_string()
    }
}
