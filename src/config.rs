/// Default ceiling on downloaded document size: 500 MiB.
pub const DEFAULT_MAX_PDF_BYTES: u64 = 500 * 1024 * 1024;

// Firefox ESR User-Agent string; some document hosts refuse unknown clients
pub const FIREFOX_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:115.0) Gecko/20100101 Firefox/115.0";

/// Runtime settings for the pdf_reader tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Responses larger than this are refused before parsing.
    pub max_pdf_bytes: u64,
    pub user_agent: String,
    /// Skip system proxy detection (HTTP_PROXY and friends).
    pub no_proxy: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_pdf_bytes: DEFAULT_MAX_PDF_BYTES,
            user_agent: FIREFOX_UA.to_string(),
            no_proxy: false,
        }
    }
}
