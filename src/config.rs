//! Explicit configuration for the orchestrator, probes and access gate.

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

pub const MAX_CONCURRENT_REQUESTS: usize = 500;
pub const MAX_CONCURRENT_RENDERS: usize = 4;
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024; // 10MB

const DEFAULT_USER_AGENT: &str = "link_preview/0.1.0";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Launch flags handed to the headless browser of the rendered stage
    pub headless_browser_args: Vec<String>,
    /// Subjects permitted by the access gate; empty means unrestricted
    pub allowed_domains: HashSet<String>,
    pub user_agent: String,
    #[serde(with = "secs")]
    pub fetch_timeout: Duration,
    #[serde(with = "secs")]
    pub probe_timeout: Duration,
    #[serde(with = "secs")]
    pub render_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub max_concurrent_renders: usize,
    /// Static fetch bodies above this many bytes fail the fetch
    pub max_content_size: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            headless_browser_args: vec!["--disable-gpu".to_string(), "--headless".to_string()],
            allowed_domains: HashSet::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            render_timeout: Duration::from_secs(30),
            max_concurrent_requests: MAX_CONCURRENT_REQUESTS,
            max_concurrent_renders: MAX_CONCURRENT_RENDERS,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }
}

impl PreviewConfig {
    /// Defaults overridden by `LINK_PREVIEW_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(domains) = std::env::var("LINK_PREVIEW_ALLOWED_DOMAINS") {
            config.allowed_domains = parse_domain_list(&domains);
        }
        if let Ok(args) = std::env::var("LINK_PREVIEW_BROWSER_ARGS") {
            config.headless_browser_args = args.split_whitespace().map(String::from).collect();
        }
        if let Ok(agent) = std::env::var("LINK_PREVIEW_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = agent.trim().to_string();
            }
        }

        config
    }

    pub fn with_headless_browser_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headless_browser_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains
            .into_iter()
            .map(|d| d.into().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.max_concurrent_requests = max_concurrent_requests;
        self
    }

    pub fn with_max_concurrent_renders(mut self, max_concurrent_renders: usize) -> Self {
        self.max_concurrent_renders = max_concurrent_renders;
        self
    }

    pub fn with_max_content_size(mut self, max_content_size: usize) -> Self {
        self.max_content_size = max_content_size;
        self
    }
}

fn parse_domain_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
