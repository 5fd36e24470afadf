//! Rendered fetch strategy backed by a headless Chromium.
//!
//! Each fetch launches its own browser process and tears it down before
//! returning. Nothing is pooled between requests.

use crate::{FetchResult, PageSource, PreviewConfig, PreviewError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// Owns one browser process and its CDP event loop.
///
/// Call [`BrowserSession::close`] on the normal path. If the session is
/// dropped instead (early return, panic, cancelled future) the same
/// shutdown is spawned onto the runtime captured at launch.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    runtime_handle: Handle,
}

impl BrowserSession {
    #[instrument(level = "debug", skip(args))]
    pub async fn launch(args: &[String], request_timeout: Duration) -> Result<Self, PreviewError> {
        let config = BrowserConfig::builder()
            .args(args.iter().cloned())
            .request_timeout(request_timeout)
            .build()
            .map_err(|e| PreviewError::Browser(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PreviewError::Browser(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });
        debug!("Browser session started");

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            runtime_handle: Handle::current(),
        })
    }

    /// Loads `url`, waits for navigation to settle and returns the live DOM
    /// serialized as HTML together with the final URL.
    pub async fn render(&self, url: &str) -> Result<(String, String), PreviewError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| PreviewError::Browser("session already closed".into()))?;

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| PreviewError::Browser(format!("failed to open page: {e}")))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| PreviewError::Browser(format!("navigation failed: {e}")))?;

        let html = page
            .content()
            .await
            .map_err(|e| PreviewError::Browser(format!("failed to read page content: {e}")))?;
        let final_url = page.url().await.ok().flatten().unwrap_or_else(|| url.to_string());

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close page");
        }

        Ok((html, final_url))
    }

    pub async fn close(mut self) {
        if let Some(browser) = self.browser.take() {
            shutdown(browser, self.handler.take()).await;
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        match self.browser.take() {
            Some(browser) => {
                let handler = self.handler.take();
                self.runtime_handle.spawn(shutdown(browser, handler));
            }
            None => {
                if let Some(handler) = self.handler.take() {
                    handler.abort();
                }
            }
        }
    }
}

async fn shutdown(mut browser: Browser, handler: Option<JoinHandle<()>>) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser");
    }
    if let Err(e) = browser.wait().await {
        warn!(error = %e, "Failed to reap browser process");
    }
    if let Some(handler) = handler {
        handler.abort();
    }
    debug!("Browser session closed");
}

/// Rendered fetch strategy: full page load in a fresh headless browser.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    args: Vec<String>,
    render_timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            args: config.headless_browser_args.clone(),
            render_timeout: config.render_timeout,
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    pub async fn fetch_with_browser(&self, url: &str) -> Result<FetchResult, PreviewError> {
        let session = BrowserSession::launch(&self.args, self.render_timeout).await?;

        let rendered = match tokio::time::timeout(self.render_timeout, session.render(url)).await {
            Ok(result) => result,
            Err(_) => Err(PreviewError::Timeout(format!(
                "rendering {url} exceeded {:?}",
                self.render_timeout
            ))),
        };
        session.close().await;

        let (html, final_url) = rendered?;
        debug!(url = %url, content_length = html.len(), "Successfully rendered webpage");
        Ok(FetchResult { html, final_url })
    }
}

#[async_trait]
impl PageSource for BrowserFetcher {
    fn name(&self) -> &'static str {
        "rendered"
    }

    async fn fetch(&self, url: &str) -> Result<FetchResult, PreviewError> {
        self.fetch_with_browser(url)
            .await
            .map_err(PreviewError::into_fetch_failure)
    }
}
