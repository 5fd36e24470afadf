use crate::document::Document;
use crate::resolver::{
    resolve, DESCRIPTION_RULES, DOMAIN_RULES, FAVICON_RULES, IMAGE_RULES, TITLE_RULES,
};
use crate::utils::{display_host, origin_of};
use crate::validator::{is_well_formed_url, ResourceProbe};
use crate::PreviewRecord;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

/// Candidate values read from a parsed page before any probing.
///
/// Holds owned strings only so it can cross await points; the parsed
/// `Document` itself is not `Send`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFields {
    pub title: Option<String>,
    pub domain: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub description: Option<String>,
}

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Clone)]
pub struct MetadataExtractor {
    probe: Arc<dyn ResourceProbe>,
}

impl MetadataExtractor {
    pub fn new(probe: Arc<dyn ResourceProbe>) -> Self {
        Self { probe }
    }

    /// Parses `html` and runs every field extractor against it. Never fails:
    /// fields that cannot be determined are left as `None`.
    #[instrument(level = "debug", skip(self, html), fields(html_len = html.len()))]
    pub async fn extract(&self, html: &str, url: &str) -> PreviewRecord {
        let fields = {
            let document = Document::parse(html);
            Self::scan(&document)
        };
        self.finish(fields, url).await
    }

    /// Synchronous pass over the document collecting raw candidates.
    pub fn scan(document: &Document) -> ScannedFields {
        ScannedFields {
            title: Self::title(document),
            domain: resolve(document, &DOMAIN_RULES),
            image: resolve(document, &IMAGE_RULES),
            favicon: resolve(document, &FAVICON_RULES),
            description: Self::description(document),
        }
    }

    /// Resolves scanned candidates into a record, probing the network where
    /// a candidate needs confirmation.
    pub async fn finish(&self, fields: ScannedFields, url: &str) -> PreviewRecord {
        let domain = Self::domain(fields.domain.as_deref(), url);
        let image = self
            .image(fields.image.as_deref(), fields.favicon.as_deref(), url)
            .await;

        debug!(
            title = ?fields.title,
            domain = ?domain,
            image = ?image,
            description = ?fields.description,
            "Field extraction finished"
        );

        PreviewRecord {
            url: url.to_string(),
            domain,
            title: fields.title,
            image,
            description: fields.description,
        }
    }

    pub fn title(document: &Document) -> Option<String> {
        document
            .head_title()
            .or_else(|| resolve(document, &TITLE_RULES))
    }

    pub fn description(document: &Document) -> Option<String> {
        resolve(document, &DESCRIPTION_RULES).or_else(|| document.first_body_paragraph())
    }

    /// Host named by the canonical candidate, else the requested URL's host.
    pub fn domain(candidate: Option<&str>, url: &str) -> Option<String> {
        candidate
            .filter(|c| is_well_formed_url(c))
            .and_then(display_host)
            .or_else(|| display_host(url))
    }

    /// Absolute candidates are taken as they are; relative ones must resolve
    /// to a reachable image. Anything else falls back to the favicon.
    pub async fn image(
        &self,
        candidate: Option<&str>,
        favicon_candidate: Option<&str>,
        url: &str,
    ) -> Option<String> {
        if let Some(candidate) = candidate {
            if is_well_formed_url(candidate) {
                return Some(candidate.to_string());
            }
            if let Some(joined) = self.joined_image(candidate, url).await {
                return Some(joined);
            }
            debug!(candidate = %candidate, "Relative image rejected, trying favicon");
        }

        self.favicon(favicon_candidate, url).await
    }

    /// `/favicon.ico` on the page origin first, then the declared icon.
    pub async fn favicon(&self, candidate: Option<&str>, url: &str) -> Option<String> {
        if let Ok(origin) = origin_of(url) {
            let default_icon = format!("{origin}/favicon.ico");
            if self.probe.is_reachable_image(&default_icon).await {
                return Some(default_icon);
            }
        }

        let candidate = candidate?;
        if is_well_formed_url(candidate) {
            return Some(candidate.to_string());
        }
        self.joined_image(candidate, url).await
    }

    async fn joined_image(&self, candidate: &str, url: &str) -> Option<String> {
        let joined = Url::parse(url).and_then(|base| base.join(candidate)).ok()?;
        let joined = joined.to_string();
        self.probe
            .is_reachable_image(&joined)
            .await
            .then_some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Answers from a fixed set of reachable image URLs and records calls.
    #[derive(Default)]
    struct FakeProbe {
        images: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn with_images(images: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                images: images.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResourceProbe for FakeProbe {
        async fn is_reachable_image(&self, url: &str) -> bool {
            self.calls.lock().unwrap().push(url.to_string());
            self.images.contains(url)
        }

        async fn is_reachable_url(&self, url: &str) -> bool {
            self.calls.lock().unwrap().push(url.to_string());
            self.images.contains(url)
        }
    }

    const PAGE: &str = "https://www.example.com/articles/1";

    fn page(head: &str, body: &str) -> String {
        format!("<!DOCTYPE html><html><head>{head}</head><body>{body}</body></html>")
    }

    #[tokio::test]
    async fn title_element_beats_meta() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let html = page(
            r#"<title>Page title</title><meta property="og:title" content="OG">"#,
            "",
        );
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.title.as_deref(), Some("Page title"));
    }

    #[tokio::test]
    async fn title_falls_back_to_meta() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let html = page(r#"<meta property="og:title" content="Example">"#, "");
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.title.as_deref(), Some("Example"));
    }

    #[test]
    fn domain_prefers_canonical_then_request_host() {
        assert_eq!(
            MetadataExtractor::domain(Some("https://www.canonical.example/x"), PAGE).as_deref(),
            Some("canonical.example")
        );
        assert_eq!(MetadataExtractor::domain(None, PAGE).as_deref(), Some("example.com"));
        // itemprop description text is not a URL
        assert_eq!(
            MetadataExtractor::domain(Some("A lovely page"), PAGE).as_deref(),
            Some("example.com")
        );
    }

    #[tokio::test]
    async fn absolute_image_is_not_probed() {
        let probe = FakeProbe::with_images(&[]);
        let extractor = MetadataExtractor::new(probe.clone());
        let html = page(
            r#"<title>t</title><meta property="og:image" content="https://cdn.example/card.png">"#,
            "",
        );
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.image.as_deref(), Some("https://cdn.example/card.png"));
        assert!(probe.calls().is_empty());
    }

    #[tokio::test]
    async fn relative_image_is_joined_and_probed() {
        let probe = FakeProbe::with_images(&["https://www.example.com/img/logo.png"]);
        let extractor = MetadataExtractor::new(probe.clone());
        let html = page("", r#"<img src="/img/logo.png">"#);
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.image.as_deref(), Some("https://www.example.com/img/logo.png"));
        assert_eq!(probe.calls(), vec!["https://www.example.com/img/logo.png"]);
    }

    #[tokio::test]
    async fn unreachable_relative_image_falls_back_to_favicon() {
        let probe = FakeProbe::with_images(&["https://www.example.com/favicon.ico"]);
        let extractor = MetadataExtractor::new(probe.clone());
        let html = page("", r#"<img src="/img/logo.png">"#);
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.image.as_deref(), Some("https://www.example.com/favicon.ico"));
        assert_eq!(
            probe.calls(),
            vec![
                "https://www.example.com/img/logo.png",
                "https://www.example.com/favicon.ico"
            ]
        );
    }

    #[tokio::test]
    async fn favicon_uses_declared_icon_when_default_missing() {
        let probe = FakeProbe::with_images(&["https://www.example.com/static/icon.png"]);
        let extractor = MetadataExtractor::new(probe);
        let favicon = extractor.favicon(Some("static/icon.png"), "https://www.example.com/").await;
        assert_eq!(favicon.as_deref(), Some("https://www.example.com/static/icon.png"));

        let absolute = extractor
            .favicon(Some("https://icons.example/i.png"), "https://www.example.com/")
            .await;
        assert_eq!(absolute.as_deref(), Some("https://icons.example/i.png"));
    }

    #[tokio::test]
    async fn no_image_and_no_favicon() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let record = extractor.extract(&page("<title>x</title>", ""), PAGE).await;
        assert_eq!(record.image, None);
    }

    #[tokio::test]
    async fn description_from_first_paragraph() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let html = page("", "<div><p></p><p>Welcome to our site</p><p>More</p></div>");
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.description.as_deref(), Some("Welcome to our site"));
    }

    #[tokio::test]
    async fn description_meta_wins_over_paragraph() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let html = page(
            r#"<meta name="twitter:description" content="Card text">"#,
            "<p>Body text</p>",
        );
        let record = extractor.extract(&html, PAGE).await;
        assert_eq!(record.description.as_deref(), Some("Card text"));
    }

    #[tokio::test]
    async fn scanning_is_idempotent() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[
            "https://www.example.com/favicon.ico",
        ]));
        let document = Document::parse(&page(
            r#"<title>Stable</title><link rel="canonical" href="https://example.com/a">"#,
            "<p>Body</p>",
        ));

        let first = MetadataExtractor::scan(&document);
        let second = MetadataExtractor::scan(&document);
        assert_eq!(first, second);

        let a = extractor.finish(first, PAGE).await;
        let b = extractor.finish(second, PAGE).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_document_keeps_url_and_host() {
        let extractor = MetadataExtractor::new(FakeProbe::with_images(&[]));
        let record = extractor.extract("", PAGE).await;
        assert_eq!(record.url, PAGE);
        assert_eq!(record.domain.as_deref(), Some("example.com"));
        assert_eq!(record.title, None);
        assert_eq!(record.description, None);
    }
}
