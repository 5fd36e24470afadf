use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod access;
#[cfg(feature = "browser")]
mod browser_fetcher;
mod config;
mod document;
mod error;
mod extractor;
mod fetcher;
#[cfg(feature = "logging")]
mod logging;
mod preview_service;
mod resolver;
mod utils;
mod validator;

pub use access::{AccessDecision, AccessGate, AllowedDomainsGate};
#[cfg(feature = "browser")]
pub use browser_fetcher::{BrowserFetcher, BrowserSession};
pub use config::{
    PreviewConfig, DEFAULT_MAX_CONTENT_SIZE, MAX_CONCURRENT_RENDERS, MAX_CONCURRENT_REQUESTS,
};
pub use document::Document;
pub use error::PreviewError;
pub use extractor::{MetadataExtractor, ScannedFields};
pub use fetcher::{FetchResult, Fetcher, FetcherConfig};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_preview_card, setup_logging, LogConfig, LogLevelGuard};
pub use preview_service::{needs_rendering, FetchStage, PreviewService};
pub use resolver::{
    resolve, CandidateRule, FieldRules, DESCRIPTION_RULES, DOMAIN_RULES, FAVICON_RULES,
    IMAGE_RULES, TITLE_RULES,
};
pub use validator::{extract_urls, is_well_formed_url, HttpProbe, ResourceProbe};

/// Normalized link card for one requested URL.
///
/// `url` is always the string the caller asked for. Every other field is
/// either a non-empty string or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub url: String,
    pub domain: Option<String>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl PreviewRecord {
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            domain: None,
            title: None,
            image: None,
            description: None,
        }
    }
}

/// A way of obtaining the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<FetchResult, PreviewError>;
}
