use std::collections::HashSet;
use url::Url;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Approves or rejects a preview request before any extraction runs.
///
/// `subject` identifies the caller (typically the client origin carried in
/// its access token); how it was authenticated is not this trait's concern.
pub trait AccessGate: Send + Sync {
    fn check(&self, subject: Option<&str>) -> AccessDecision;
}

/// Admits subjects whose host is, or is a subdomain of, a configured domain.
/// An empty list admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowedDomainsGate {
    allowed_domains: HashSet<String>,
}

impl AllowedDomainsGate {
    pub fn new(allowed_domains: HashSet<String>) -> Self {
        let allowed_domains = allowed_domains
            .into_iter()
            .map(|d| d.trim().trim_end_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed_domains }
    }

    fn is_domain_allowed(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }
}

/// Host part of a subject given either as a URL or as a bare host name.
fn subject_host(subject: &str) -> Option<String> {
    let subject = subject.trim();
    if subject.is_empty() {
        return None;
    }
    match Url::parse(subject) {
        Ok(url) => url.host_str().map(|h| h.to_lowercase()),
        Err(_) => Some(subject.trim_end_matches('/').to_lowercase()),
    }
}

impl AccessGate for AllowedDomainsGate {
    fn check(&self, subject: Option<&str>) -> AccessDecision {
        if self.allowed_domains.is_empty() {
            return AccessDecision::allow();
        }

        let Some(host) = subject.and_then(subject_host) else {
            return AccessDecision::deny("missing subject");
        };

        if self.is_domain_allowed(&host) {
            AccessDecision::allow()
        } else {
            AccessDecision::deny(format!("{host} is not an allowed client domain"))
        }
    }
}
