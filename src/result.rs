//! Value types returned by an extraction
//!
//! All of them are built fresh for each call and never mutated afterwards.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::content::SelectionTier;

/// Image referenced by the extracted content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub src: String,
    pub alt: String,
    pub title: String,
    /// Declared width in pixels, 0 when unknown
    pub width: u32,
    /// Declared height in pixels, 0 when unknown
    pub height: u32,
}

/// Link found in the extracted content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    /// Target resolved against the document base URL
    pub href: String,
    pub text: String,
    pub title: String,
    pub is_external: bool,
}

/// Metadata and statistics of one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Inner HTML of the selected (cleaned) content root
    pub content_html: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub canonical_url: Option<String>,
    pub tags: Vec<String>,
    pub og_tags: BTreeMap<String, String>,
    pub images: Vec<ImageAsset>,
    pub links: Vec<LinkRef>,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    /// Confidence in the extracted subtree, always within [0, 1]
    pub quality_score: f64,
    pub is_paywall_present: bool,
    /// Which selection tier produced the content root
    pub confidence: SelectionTier,
}

/// Markdown produced for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Markdown body without front matter
    pub markdown: String,
    /// Front matter block, empty when not generated
    pub frontmatter: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
}

impl ConversionResult {
    /// Front matter followed by the Markdown body
    pub fn to_document(&self) -> String {
        if self.frontmatter.is_empty() {
            return self.markdown.clone();
        }
        let mut document = String::with_capacity(self.frontmatter.len() + self.markdown.len() + 2);
        document.push_str(&self.frontmatter);
        if !self.markdown.is_empty() {
            document.push('\n');
            document.push_str(&self.markdown);
            document.push('\n');
        }
        document
    }
}

/// How the extraction went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ExtractionOutcome {
    /// Primary conversion succeeded
    Success,
    /// A fallback conversion produced the Markdown
    Degraded { reason: String },
    /// No usable content after cleaning; minimal output returned
    Empty,
    /// Every conversion strategy failed; minimal output returned
    Failed { reason: String },
}

/// Everything an extraction returns to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub outcome: ExtractionOutcome,
    pub result: ExtractionResult,
    pub conversion: ConversionResult,
}
