#[cfg(feature = "browser")]
use crate::{BrowserFetcher, Fetcher, HttpProbe};
use crate::{
    is_well_formed_url, AccessGate, AllowedDomainsGate, MetadataExtractor, PageSource,
    PreviewConfig, PreviewError, PreviewRecord, ResourceProbe,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

/// Which strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Static,
    Rendered,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Static => f.write_str("static"),
            FetchStage::Rendered => f.write_str("rendered"),
        }
    }
}

/// Escalation predicate: only a missing image or title justifies a browser.
pub fn needs_rendering(record: &PreviewRecord) -> bool {
    record.image.is_none() || record.title.is_none()
}

/// Runs the static strategy, and the rendered one only when the static
/// record is incomplete. The rendered record replaces the static one
/// unconditionally.
#[derive(Clone)]
pub struct PreviewService {
    static_source: Arc<dyn PageSource>,
    rendered_source: Arc<dyn PageSource>,
    extractor: MetadataExtractor,
    gate: Arc<dyn AccessGate>,
    // Max Concurrent Requests
    semaphore: Arc<Semaphore>,
    // Browser processes alive at once
    render_semaphore: Arc<Semaphore>,
}

impl PreviewService {
    /// Service wired with the reqwest static fetcher, a headless Chromium
    /// for rendering and real network probes.
    #[cfg(feature = "browser")]
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        debug!("Initializing PreviewService with configuration: {:?}", config);

        let static_source = Arc::new(Fetcher::new(&config)?);
        let rendered_source = Arc::new(BrowserFetcher::new(&config));
        let probe = Arc::new(HttpProbe::new(&config)?);

        Ok(Self::with_sources(&config, static_source, rendered_source, probe))
    }

    pub fn with_sources(
        config: &PreviewConfig,
        static_source: Arc<dyn PageSource>,
        rendered_source: Arc<dyn PageSource>,
        probe: Arc<dyn ResourceProbe>,
    ) -> Self {
        Self {
            static_source,
            rendered_source,
            extractor: MetadataExtractor::new(probe),
            gate: Arc::new(AllowedDomainsGate::new(config.allowed_domains.clone())),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            render_semaphore: Arc::new(Semaphore::new(config.max_concurrent_renders.max(1))),
        }
    }

    pub fn with_access_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Checks `subject` against the access gate, then generates the preview.
    #[instrument(level = "debug", skip(self))]
    pub async fn authorized_preview(
        &self,
        subject: Option<&str>,
        url: &str,
    ) -> Result<PreviewRecord, PreviewError> {
        let decision = self.gate.check(subject);
        if !decision.allowed {
            let err = PreviewError::AccessDenied(decision.reason);
            err.log();
            return Err(err);
        }
        self.generate_preview(url).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn generate_preview(&self, url: &str) -> Result<PreviewRecord, PreviewError> {
        if !is_well_formed_url(url) {
            let err = PreviewError::MalformedUrl(url.to_string());
            err.log();
            return Err(err);
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| PreviewError::FetchFailure(format!("request limiter closed: {e}")))?;

        let record = self
            .run_stage(FetchStage::Static, self.static_source.as_ref(), url)
            .await?;

        if !needs_rendering(&record) {
            return Ok(record);
        }

        info!(
            url = %url,
            has_title = record.title.is_some(),
            has_image = record.image.is_some(),
            "Static record incomplete, escalating to rendered fetch"
        );

        let _render_permit = self
            .render_semaphore
            .acquire()
            .await
            .map_err(|e| PreviewError::FetchFailure(format!("render limiter closed: {e}")))?;

        self.run_stage(FetchStage::Rendered, self.rendered_source.as_ref(), url)
            .await
    }

    async fn run_stage(
        &self,
        stage: FetchStage,
        source: &dyn PageSource,
        url: &str,
    ) -> Result<PreviewRecord, PreviewError> {
        debug!(stage = %stage, source = source.name(), url = %url, "Fetching document");

        let fetched = source.fetch(url).await.map_err(|e| {
            let err = e.into_fetch_failure();
            err.log();
            err
        })?;

        let mut record = self.extractor.extract(&fetched.html, url).await;
        record.url = url.to_string();

        debug!(
            stage = %stage,
            final_url = %fetched.final_url,
            "Document extracted"
        );
        Ok(record)
    }
}
