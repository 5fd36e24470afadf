use crate::config::DEFAULT_MAX_CONTENT_SIZE;
use crate::{PageSource, PreviewConfig, PreviewError};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Raw page content plus the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub html: String,
    pub final_url: String,
}

/// Static fetch strategy: one plain GET, no script execution.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_content_size: usize,
}

impl Fetcher {
    pub fn new(config: &PreviewConfig) -> Result<Self, PreviewError> {
        debug!("Fetcher initialized from preview configuration");
        Self::new_with_config(FetcherConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout,
            max_content_size: config.max_content_size,
            ..FetcherConfig::default()
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }

    pub fn with_max_content_size(mut self, max_content_size: usize) -> Self {
        self.max_content_size = max_content_size;
        self
    }

    /// Creates a Fetcher with custom configuration
    pub fn new_with_config(config: FetcherConfig) -> Result<Self, PreviewError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(10);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if let Some(redirect_policy) = config.redirect_policy {
            client_builder = client_builder.redirect(redirect_policy);
        }

        let client = client_builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            PreviewError::InvalidConfiguration(e.to_string())
        })?;

        Ok(Self {
            client,
            max_content_size: config.max_content_size,
        })
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, PreviewError> {
        debug!(url = %url, "Starting fetch request");

        let mut response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to send request");
            if e.is_timeout() {
                PreviewError::Timeout(e.to_string())
            } else {
                PreviewError::FetchFailure(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Non-success response");
            return Err(PreviewError::FetchFailure(format!("{url} returned {status}")));
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_content_size as u64 {
                error!(url = %url, content_length = declared, "Response body too large");
                return Err(self.too_large(url));
            }
        }

        let final_url = response.url().to_string();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            error!(error = %e, url = %url, "Failed to read response body");
            PreviewError::FetchFailure(e.to_string())
        })? {
            if body.len() + chunk.len() > self.max_content_size {
                error!(url = %url, "Response body too large");
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();

        debug!(url = %url, final_url = %final_url, content_length = html.len(), "Successfully fetched webpage");
        Ok(FetchResult { html, final_url })
    }

    fn too_large(&self, url: &str) -> PreviewError {
        PreviewError::FetchFailure(format!(
            "{url} exceeds the {} byte content limit",
            self.max_content_size
        ))
    }
}

#[async_trait]
impl PageSource for Fetcher {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, url: &str) -> Result<FetchResult, PreviewError> {
        Fetcher::fetch(self, url).await.map_err(PreviewError::into_fetch_failure)
    }
}

/// Client options for the static strategy.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-custom-agent/1.0".to_string(),
///     timeout: Duration::from_secs(20),
///     headers: Some(my_custom_headers),
///     redirect_policy: Some(reqwest::redirect::Policy::limited(5)),
///     max_content_size: 2 * 1024 * 1024,
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
    /// Bodies larger than this many bytes are rejected
    pub max_content_size: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "link_preview/0.1.0".to_string(),
            timeout: Duration::from_secs(10),
            headers: None,
            redirect_policy: None,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }
}
