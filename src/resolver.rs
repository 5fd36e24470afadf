//! Ordered candidate lookup shared by every field extractor.

use crate::document::Document;
use crate::error::PreviewError;
use crate::utils::non_empty;

/// One place a field's value may live: the first element matching
/// `selector`, read through `attribute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRule {
    pub selector: &'static str,
    pub attribute: &'static str,
}

impl CandidateRule {
    pub const fn new(selector: &'static str, attribute: &'static str) -> Self {
        Self {
            selector,
            attribute,
        }
    }
}

/// Ordered rules for one record field. `field` names the field in logs and
/// extraction errors.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [CandidateRule],
}

impl FieldRules {
    pub const fn new(field: &'static str, rules: &'static [CandidateRule]) -> Self {
        Self { field, rules }
    }
}

pub const DOMAIN_RULES: FieldRules = FieldRules::new(
    "domain",
    &[
        CandidateRule::new("link[rel=canonical]", "href"),
        CandidateRule::new(r#"meta[property="og:url"]"#, "content"),
        CandidateRule::new(r#"meta[itemprop="description"]"#, "content"),
    ],
);

pub const IMAGE_RULES: FieldRules = FieldRules::new(
    "image",
    &[
        CandidateRule::new(r#"meta[property="og:image"]"#, "content"),
        CandidateRule::new(r#"meta[name="twitter:image"]"#, "content"),
        CandidateRule::new(r#"link[rel="image_src"]"#, "href"),
        CandidateRule::new(r#"link[rel="apple-touch-icon"]"#, "href"),
        CandidateRule::new("img", "src"),
    ],
);

pub const FAVICON_RULES: FieldRules = FieldRules::new(
    "favicon",
    &[
        CandidateRule::new("link[rel=icon]", "href"),
        CandidateRule::new(r#"link[rel="shortcut icon"]"#, "href"),
        CandidateRule::new(
            r#"link[rel="apple-touch-icon"],link[rel="apple-touch-icon-precomposed"]"#,
            "href",
        ),
    ],
);

pub const DESCRIPTION_RULES: FieldRules = FieldRules::new(
    "description",
    &[
        CandidateRule::new(r#"meta[name="description"]"#, "content"),
        CandidateRule::new(r#"meta[name="twitter:description"]"#, "content"),
        CandidateRule::new(r#"meta[property="og:description"]"#, "content"),
        CandidateRule::new(r#"meta[itemprop="description"]"#, "content"),
    ],
);

pub const TITLE_RULES: FieldRules = FieldRules::new(
    "title",
    &[
        CandidateRule::new(r#"meta[name="title"]"#, "content"),
        CandidateRule::new(r#"meta[name="twitter:title"]"#, "content"),
        CandidateRule::new(r#"meta[property="og:title"]"#, "content"),
        CandidateRule::new(r#"meta[itemprop="title"]"#, "content"),
    ],
);

/// Walks `rules` in order and answers from the first rule whose selector
/// matches anything.
///
/// The first structurally matching element is authoritative: when its
/// attribute is missing or blank the result is `None`, and later rules are
/// not consulted.
pub fn resolve(document: &Document, rules: &FieldRules) -> Option<String> {
    match try_resolve(document, rules) {
        Ok(value) => value,
        Err(e) => {
            e.log();
            None
        }
    }
}

fn try_resolve(
    document: &Document,
    rules: &FieldRules,
) -> Result<Option<String>, PreviewError> {
    for rule in rules.rules {
        let element = document
            .select_first(rule.selector)
            .map_err(|message| PreviewError::FieldExtraction {
                field: rules.field,
                message,
            })?;

        if let Some(element) = element {
            return Ok(element.value().attr(rule.attribute).and_then(non_empty));
        }
    }
    Ok(None)
}
