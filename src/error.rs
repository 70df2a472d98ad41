use thiserror::Error;

/// Everything that can go wrong while turning a URL into PDF text.
///
/// The `Display` output of each variant is the exact text handed back to
/// agents, so the wording here is part of the tool contract.
#[derive(Debug, Error)]
pub enum PdfReaderError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Error fetching the PDF: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Error fetching the PDF: response of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to fetch PDF.")]
    EmptyBody,

    #[error("Error extracting text from PDF: {0}")]
    Parse(String),

    #[error("Failed to extract metadata: {0}")]
    Metadata(String),

    #[error("Unexpected error occurred: {0}")]
    Unexpected(String),

    #[error("Asynchronous execution is not supported by pdf_reader")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use super::PdfReaderError;

    #[test]
    fn empty_body_renders_sentinel() {
        assert_eq!(PdfReaderError::EmptyBody.to_string(), "Failed to fetch PDF.");
    }

    #[test]
    fn parse_error_carries_prefix() {
        let err = PdfReaderError::Parse("invalid file header".to_string());
        assert_eq!(
            err.to_string(),
            "Error extracting text from PDF: invalid file header"
        );
    }

    #[test]
    fn too_large_is_reported_as_fetch_failure() {
        let err = PdfReaderError::TooLarge {
            size: 2048,
            limit: 1024,
        };
        assert!(err.to_string().starts_with("Error fetching the PDF:"));
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn unexpected_failures_keep_their_detail() {
        assert_eq!(
            PdfReaderError::Unexpected("worker crashed".into()).to_string(),
            "Unexpected error occurred: worker crashed"
        );
    }
}
