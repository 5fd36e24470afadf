//! URL well-formedness and resource reachability checks.

use crate::{PreviewConfig, PreviewError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};
use std::sync::LazyLock;
use tracing::{debug, instrument};
use url::Url;

#[allow(clippy::expect_used)]
static BASE64_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-zA-Z+/]{4})*(([0-9a-zA-Z+/]{2}==)|([0-9a-zA-Z+/]{3}=))$")
        .expect("valid base64 pattern")
});

#[allow(clippy::expect_used)]
static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s/$.?#].[^\s]*").expect("valid url pattern"));

/// True iff `s` parses as an absolute URL carrying both a scheme and a host.
///
/// The host must be written out as `scheme://host`; forms such as
/// `https:example.com` or `https:///example.com` that WHATWG parsing repairs
/// are rejected.
pub fn is_well_formed_url(s: &str) -> bool {
    let s = s.trim();
    if !has_explicit_authority(s) {
        return false;
    }
    match Url::parse(s) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

fn has_explicit_authority(s: &str) -> bool {
    let Some((_, rest)) = s.split_once(':') else {
        return false;
    };
    let Some(after_slashes) = rest.strip_prefix("//") else {
        return false;
    };
    let authority = after_slashes
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    !host.is_empty() && !host.starts_with(':')
}

/// All `http(s)://` substrings embedded in `text`, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<&str> {
    EMBEDDED_URL.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn is_base64_payload(s: &str) -> bool {
    BASE64_PAYLOAD.is_match(s)
}

/// Splits `data:<mime>;base64,<payload>` and checks the payload grammar.
/// Returns the declared media type on success.
fn base64_data_uri_mime(s: &str) -> Option<&str> {
    let rest = s.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    is_base64_payload(payload.trim()).then_some(mime)
}

/// Reachability checks for candidate resources. Every method answers with a
/// plain bool; failures reject the candidate and are only logged.
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    /// Data URI with a base64 image payload, or an HTTP(S) resource answering
    /// 2xx with an `image/*` content type.
    async fn is_reachable_image(&self, url: &str) -> bool;

    /// Same as [`ResourceProbe::is_reachable_image`] without the media type
    /// requirement.
    async fn is_reachable_url(&self, url: &str) -> bool;
}

/// [`ResourceProbe`] that issues real GET requests.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &PreviewConfig) -> Result<Self, PreviewError> {
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| PreviewError::InvalidConfiguration(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn probe(&self, url: &str, require_image: bool) -> Result<(), PreviewError> {
        let probe_error = |message: String| PreviewError::ResourceProbe {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                probe_error(format!("timed out: {e}"))
            } else {
                probe_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(probe_error(format!("status {status}")));
        }

        if require_image {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(probe_error(format!("content type {content_type:?}")));
            }
        }

        Ok(())
    }

    async fn check(&self, url: &str, require_image: bool) -> bool {
        if let Some(mime) = base64_data_uri_mime(url) {
            return !require_image || mime.to_ascii_lowercase().starts_with("image/");
        }

        let urls = extract_urls(url);
        if urls.iter().any(|u| is_base64_payload(u)) {
            return true;
        }

        for candidate in urls {
            match self.probe(candidate, require_image).await {
                Ok(()) => {
                    debug!(url = %candidate, "Resource reachable");
                    return true;
                }
                Err(e) => e.log(),
            }
        }
        false
    }
}

#[async_trait]
impl ResourceProbe for HttpProbe {
    #[instrument(level = "debug", skip(self))]
    async fn is_reachable_image(&self, url: &str) -> bool {
        self.check(url, true).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn is_reachable_url(&self, url: &str) -> bool {
        self.check(url, false).await
    }
}
