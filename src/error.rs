use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    /// Raised when no HTML document could be obtained. The message is kept
    /// for logs; Display stays generic.
    #[error("Could not produce preview for this URL")]
    FetchFailure(String),

    #[error("Failed to extract {field}: {message}")]
    FieldExtraction { field: &'static str, message: String },

    #[error("Resource probe failed for {url}: {message}")]
    ResourceProbe { url: String, message: String },

    #[error("Access denied{}", .0.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    AccessDenied(Option<String>),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl PreviewError {
    /// Collapses stage-internal failures into the single caller-visible kind.
    pub(crate) fn into_fetch_failure(self) -> Self {
        match self {
            PreviewError::Browser(msg) | PreviewError::Timeout(msg) => {
                PreviewError::FetchFailure(msg)
            }
            other => other,
        }
    }

    pub fn log(&self) {
        match self {
            PreviewError::MalformedUrl(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::FetchFailure(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::FieldExtraction { field, message } => {
                debug!(field = %field, error = %message, "Field extraction failed, field left empty");
            }
            PreviewError::ResourceProbe { url, message } => {
                debug!(url = %url, error = %message, "Resource probe failed, candidate rejected");
            }
            PreviewError::AccessDenied(reason) => {
                warn!(reason = ?reason, "Access gate denied request");
            }
            PreviewError::Browser(e) => {
                error!(error = %e, "Browser session failed");
            }
            PreviewError::Timeout(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::InvalidConfiguration(e) => {
                error!(error = %e, "Invalid configuration");
            }
        }
    }
}

impl From<url::ParseError> for PreviewError {
    fn from(e: url::ParseError) -> Self {
        PreviewError::MalformedUrl(e.to_string())
    }
}
