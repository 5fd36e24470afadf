use crate::utils::non_empty;
use scraper::{ElementRef, Html, Selector};

/// Parsed HTML page. Parsing never fails; malformed markup yields whatever
/// tree html5ever recovers.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// First element matching a CSS selector, `Err` when the selector itself
    /// does not parse.
    pub fn select_first(&self, selector: &str) -> Result<Option<ElementRef<'_>>, String> {
        let selector = Selector::parse(selector).map_err(|e| format!("{selector}: {e:?}"))?;
        Ok(self.html.select(&selector).next())
    }

    /// Text of `<head><title>` with whitespace runs collapsed.
    pub fn head_title(&self) -> Option<String> {
        let title = self.select_first("head > title").ok().flatten()?;
        non_empty(&collapse_whitespace(&title.text().collect::<String>()))
    }

    /// Text of the first `<p>` inside `<body>` that has visible text.
    pub fn first_body_paragraph(&self) -> Option<String> {
        let selector = Selector::parse("body p").ok()?;
        self.html
            .select(&selector)
            .find_map(|p| non_empty(&collapse_whitespace(&p.text().collect::<String>())))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
