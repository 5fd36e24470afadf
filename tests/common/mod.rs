#![allow(dead_code)]

use async_trait::async_trait;
use link_preview::{FetchResult, PageSource, PreviewError, ResourceProbe};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Page source that serves one canned document (or error) and counts calls.
pub struct FakeSource {
    label: &'static str,
    response: Result<String, String>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn html(label: &'static str, html: &str) -> Self {
        Self {
            label,
            response: Ok(html.to_string()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(label: &'static str, message: &str) -> Self {
        Self {
            label,
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn fetch(&self, url: &str) -> Result<FetchResult, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        match &self.response {
            Ok(html) => Ok(FetchResult {
                html: html.clone(),
                final_url: format!("{url}?redirected=1"),
            }),
            Err(message) => Err(PreviewError::Browser(message.clone())),
        }
    }
}

/// Probe answering from a fixed set of reachable image URLs.
#[derive(Default)]
pub struct FakeProbe {
    images: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn with_images(images: &[&str]) -> Self {
        Self {
            images: images.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceProbe for FakeProbe {
    async fn is_reachable_image(&self, url: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images.contains(url)
    }

    async fn is_reachable_url(&self, url: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.images.contains(url)
    }
}

pub fn page(head: &str, body: &str) -> String {
    format!("<!DOCTYPE html><html><head>{head}</head><body>{body}</body></html>")
}

pub const COMPLETE_HEAD: &str = r#"<title>Complete page</title>
<meta property="og:image" content="https://cdn.example.com/card.png">
<meta name="description" content="Everything a card needs">"#;
