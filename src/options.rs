//! Conversion options
//!
//! Options deserialize from camelCase JSON so a calling surface can hand its
//! settings over verbatim; every field has a default.
//!
//! ```rust
//! use web_markdown_extractor::ConversionOptions;
//!
//! let options = ConversionOptions::default();
//! assert!(options.include_images);
//! assert_eq!(options.significance_threshold, None);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default word count a candidate must exceed to count as main content
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: usize = 50;

/// Default nesting depth the rule engine accepts before failing over
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Status banners a clipping surface may leave inline in the page
pub const DEFAULT_STRIP_PATTERNS: &[&str] = &[
    r"(?m)^\s*(?:✓\s*)?(?:Saved|Clipped) to [\w ]+[.!]?\s*$",
    r"(?m)^\s*(?:Saving|Clipping|Extracting content)(?:\.\.\.|…)\s*$",
    r"(?m)^\s*Markdown copied to clipboard[.!]?\s*$",
];

/// Options controlling extraction and Markdown generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Emit image Markdown and collect image assets
    pub include_images: bool,
    /// Render links as Markdown links; plain text otherwise
    pub include_links: bool,
    /// Run baseline boilerplate removal before selecting content
    pub clean_html: bool,
    /// Keep bold/italic/strike/sub/sup/mark inline marks
    pub preserve_formatting: bool,
    /// Build the front matter block
    pub generate_frontmatter: bool,
    /// Populate the metadata fields of the extraction result
    pub include_metadata: bool,
    /// Caller selectors tried before the built-in list, highest priority first
    pub custom_selectors: Vec<String>,
    /// Selectors whose matches are always stripped
    pub exclude_selectors: BTreeSet<String>,
    /// URL the document was retrieved from, used to resolve relative links
    pub base_url: Option<String>,
    /// Word count a candidate must exceed to qualify as main content;
    /// the selector's configured threshold when unset
    pub significance_threshold: Option<usize>,
    /// Maximum element nesting the rule engine converts
    pub max_depth: usize,
    /// Regexes for injected UI artifacts removed from the final Markdown
    pub strip_patterns: Vec<String>,
    /// Fixed capture time; the current time when absent
    pub captured_at: Option<DateTime<Utc>>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_links: true,
            clean_html: true,
            preserve_formatting: true,
            generate_frontmatter: true,
            include_metadata: true,
            custom_selectors: Vec::new(),
            exclude_selectors: BTreeSet::new(),
            base_url: None,
            significance_threshold: None,
            max_depth: DEFAULT_MAX_DEPTH,
            strip_patterns: DEFAULT_STRIP_PATTERNS
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
            captured_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_camel_case() {
        let json = r##"{
            "includeImages": false,
            "customSelectors": [".story", "#body"],
            "excludeSelectors": [".promo"],
            "baseUrl": "https://example.com/a/b"
        }"##;
        let options: ConversionOptions = serde_json::from_str(json).expect("valid options");

        assert!(!options.include_images);
        assert!(options.include_links);
        assert_eq!(options.custom_selectors, vec![".story", "#body"]);
        assert!(options.exclude_selectors.contains(".promo"));
        assert_eq!(options.base_url.as_deref(), Some("https://example.com/a/b"));
        assert_eq!(options.significance_threshold, None);

        let options: ConversionOptions =
            serde_json::from_str(r#"{"significanceThreshold": 50}"#).expect("valid options");
        assert_eq!(options.significance_threshold, Some(DEFAULT_SIGNIFICANCE_THRESHOLD));
        assert_eq!(options.strip_patterns.len(), DEFAULT_STRIP_PATTERNS.len());
    }

    #[test]
    fn test_default_strip_patterns_compile() {
        for pattern in DEFAULT_STRIP_PATTERNS {
            assert!(regex::Regex::new(pattern).is_ok(), "{pattern}");
        }
    }
}
